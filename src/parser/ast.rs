use std::rc::Rc;

use bigdecimal::BigDecimal;
use derivative::Derivative;
use num_bigint::BigInt;
use once_cell::unsync::OnceCell;

use super::locations::Span;
use super::tokenizer::Token;
use crate::analyzer::{Signature, Type};
use crate::error::{Error, ErrorKind, Result};
use crate::scope::{Function as FunctionBinding, Variable};

pub type VariableBinding = Rc<Variable<Type>>;
pub type FunctionSlot = Rc<FunctionBinding<Signature>>;

/// Stores an analysis result. Slots are write-once, so a tree can be analyzed
/// only once; a second write is a `TypeError` and leaves the first annotation.
fn annotate<T>(slot: &OnceCell<T>, value: T) -> Result<()> {
    slot.set(value)
        .map_err(|_| Error::new(ErrorKind::Type, None, "tree has already been analyzed"))
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Source {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Global {
    pub name: String,
    pub mutable: bool,
    pub list: bool,
    pub type_name: Option<String>,
    pub value: Option<Expression>,
    #[derivative(Debug = "ignore")]
    pub span: Span,
    #[derivative(Debug = "ignore")]
    variable: OnceCell<VariableBinding>,
}

impl Global {
    pub(crate) fn new(
        name: String,
        mutable: bool,
        list: bool,
        type_name: Option<String>,
        value: Option<Expression>,
        span: Span,
    ) -> Self {
        Self {
            name,
            mutable,
            list,
            type_name,
            value,
            span,
            variable: OnceCell::new(),
        }
    }
    pub fn variable(&self) -> Option<&VariableBinding> {
        self.variable.get()
    }
    pub(crate) fn set_variable(&self, variable: VariableBinding) -> Result<()> {
        annotate(&self.variable, variable)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type_name: Option<String>,
    pub body: Vec<Statement>,
    #[derivative(Debug = "ignore")]
    pub span: Span,
    #[derivative(Debug = "ignore")]
    function: OnceCell<FunctionSlot>,
}

impl Function {
    pub(crate) fn new(
        name: String,
        parameters: Vec<Parameter>,
        return_type_name: Option<String>,
        body: Vec<Statement>,
        span: Span,
    ) -> Self {
        Self {
            name,
            parameters,
            return_type_name,
            body,
            span,
            function: OnceCell::new(),
        }
    }
    pub fn function(&self) -> Option<&FunctionSlot> {
        self.function.get()
    }
    pub(crate) fn set_function(&self, function: FunctionSlot) -> Result<()> {
        annotate(&self.function, function)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub enum Statement {
    Expression(Expression),
    Declaration(Declaration),
    Assignment {
        receiver: Expression,
        value: Expression,
        #[derivative(Debug = "ignore")]
        span: Span,
    },
    If {
        condition: Expression,
        then_block: Vec<Statement>,
        else_block: Vec<Statement>,
        #[derivative(Debug = "ignore")]
        span: Span,
    },
    Switch {
        condition: Expression,
        cases: Vec<Case>,
        #[derivative(Debug = "ignore")]
        span: Span,
    },
    While {
        condition: Expression,
        block: Vec<Statement>,
        #[derivative(Debug = "ignore")]
        span: Span,
    },
    Return {
        value: Expression,
        #[derivative(Debug = "ignore")]
        span: Span,
    },
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Declaration {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Expression>,
    #[derivative(Debug = "ignore")]
    pub span: Span,
    #[derivative(Debug = "ignore")]
    variable: OnceCell<VariableBinding>,
}

impl Declaration {
    pub(crate) fn new(
        name: String,
        type_name: Option<String>,
        value: Option<Expression>,
        span: Span,
    ) -> Self {
        Self {
            name,
            type_name,
            value,
            span,
            variable: OnceCell::new(),
        }
    }
    pub fn variable(&self) -> Option<&VariableBinding> {
        self.variable.get()
    }
    pub(crate) fn set_variable(&self, variable: VariableBinding) -> Result<()> {
        annotate(&self.variable, variable)
    }
}

/// One arm of a `SWITCH`; the `DEFAULT` arm has no value.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Case {
    pub value: Option<Expression>,
    pub block: Vec<Statement>,
    #[derivative(Debug = "ignore")]
    pub span: Span,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Expression {
    pub kind: ExpressionKind,
    #[derivative(Debug = "ignore")]
    pub span: Span,
    #[derivative(Debug = "ignore")]
    typ: OnceCell<Type>,
}

impl Expression {
    pub(crate) fn new(kind: ExpressionKind, span: Span) -> Self {
        Self {
            kind,
            span,
            typ: OnceCell::new(),
        }
    }
    /// The type resolved by the analyzer, if it has run.
    pub fn typ(&self) -> Option<&Type> {
        self.typ.get()
    }
    pub(crate) fn set_type(&self, typ: Type) -> Result<()> {
        annotate(&self.typ, typ)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub enum ExpressionKind {
    Literal(Literal),
    Group(Box<Expression>),
    Binary(Operator, Box<(Expression, Expression)>),
    Access(Access),
    Call(Call),
    List(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Access {
    pub name: String,
    pub offset: Option<Box<Expression>>,
    #[derivative(Debug = "ignore")]
    variable: OnceCell<VariableBinding>,
}

impl Access {
    pub(crate) fn new(name: String, offset: Option<Box<Expression>>) -> Self {
        Self {
            name,
            offset,
            variable: OnceCell::new(),
        }
    }
    pub fn variable(&self) -> Option<&VariableBinding> {
        self.variable.get()
    }
    pub(crate) fn set_variable(&self, variable: VariableBinding) -> Result<()> {
        annotate(&self.variable, variable)
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Call {
    pub name: String,
    pub arguments: Vec<Expression>,
    #[derivative(Debug = "ignore")]
    function: OnceCell<FunctionSlot>,
}

impl Call {
    pub(crate) fn new(name: String, arguments: Vec<Expression>) -> Self {
        Self {
            name,
            arguments,
            function: OnceCell::new(),
        }
    }
    pub fn function(&self) -> Option<&FunctionSlot> {
        self.function.get()
    }
    pub(crate) fn set_function(&self, function: FunctionSlot) -> Result<()> {
        annotate(&self.function, function)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Less,
    Greater,
    Equal,
    NotEqual,
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    Power,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Times => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Power => "^",
        }
    }
}

impl From<&Token> for Operator {
    fn from(value: &Token) -> Self {
        match value.lexeme.as_str() {
            "&&" => Self::And,
            "||" => Self::Or,
            "<" => Self::Less,
            ">" => Self::Greater,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "+" => Self::Plus,
            "-" => Self::Minus,
            "*" => Self::Times,
            "/" => Self::Divide,
            "%" => Self::Modulo,
            "^" => Self::Power,
            _ => unreachable!(),
        }
    }
}
