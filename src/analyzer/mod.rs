//! Static analysis: resolves every name to a binding and every expression to
//! a type, annotating the tree in place. The first violation aborts.

mod types;

use std::rc::Rc;

use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::parser::{
    Declaration, Expression, ExpressionKind, Function, Global, Literal, Operator, Source, Span,
    Statement,
};
pub use types::{require_assignable, Signature, Type, TypeScope, Types};
use types::{DECIMAL_MAX, INTEGER_MAX, INTEGER_MIN};

pub struct Analyzer {
    types: Types,
    root: Rc<TypeScope>,
}

impl Analyzer {
    pub fn new() -> Self {
        let types = Types::new();
        let root = TypeScope::root();
        root.define_function(
            "print",
            1,
            Signature {
                parameters: vec![types.any.clone()],
                returns: types.nil.clone(),
            },
        );
        Self { types, root }
    }

    pub fn types(&self) -> &Types {
        &self.types
    }

    /// Analyzes all globals, then all functions, both in declaration order.
    /// A tree can be analyzed once; analyzing it again is a `TypeError`.
    pub fn analyze(&self, source: &Source) -> Result<()> {
        for global in &source.globals {
            self.analyze_global(global)?;
        }
        for function in &source.functions {
            self.analyze_function(function)?;
        }
        debug!(
            globals = source.globals.len(),
            functions = source.functions.len(),
            "analysis complete"
        );
        Ok(())
    }

    fn resolve(&self, name: &str, span: Span) -> Result<Type> {
        self.types.lookup(name).map_err(|e| e.or_at(span))
    }

    fn analyze_global(&self, global: &Global) -> Result<()> {
        let declared = match &global.type_name {
            Some(name) if global.list => Some(self.types.list_of(&self.resolve(name, global.span)?)),
            Some(name) => Some(self.resolve(name, global.span)?),
            None => None,
        };
        let typ = match (declared, &global.value) {
            (declared, Some(value)) => {
                let found = self.analyze_initializer(value, declared.as_ref())?;
                if global.list && found.element().is_none() {
                    return Err(Error::type_(
                        value.span,
                        &format!("LIST '{}' requires a list initializer", global.name),
                    ));
                }
                match declared {
                    Some(declared) => {
                        require_assignable(&declared, &found).map_err(|e| e.or_at(value.span))?;
                        declared
                    }
                    None => found,
                }
            }
            (Some(_), None) if !global.mutable => {
                return Err(Error::type_(
                    global.span,
                    &format!("VAL '{}' requires an initializer", global.name),
                ))
            }
            (Some(declared), None) => declared,
            (None, None) => {
                return Err(Error::type_(
                    global.span,
                    &format!("global '{}' requires a type or an initializer", global.name),
                ))
            }
        };
        global
            .set_variable(self.root.define_variable(&global.name, global.mutable, typ))
            .map_err(|e| e.or_at(global.span))?;
        Ok(())
    }

    /// A global initializer; list literals see the declared element type.
    fn analyze_initializer(&self, value: &Expression, declared: Option<&Type>) -> Result<Type> {
        match &value.kind {
            ExpressionKind::List(values) => {
                self.analyze_list(value, values, declared.and_then(Type::element), &self.root)
            }
            _ => self.analyze_expression(value, &self.root),
        }
    }

    #[instrument(skip_all, fields(name = %function.name))]
    fn analyze_function(&self, function: &Function) -> Result<()> {
        let parameters = function
            .parameters
            .iter()
            .map(|p| match &p.type_name {
                Some(name) => self.resolve(name, function.span),
                None => Ok(self.types.any.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        let returns = match &function.return_type_name {
            Some(name) => self.resolve(name, function.span)?,
            None => self.types.nil.clone(),
        };
        let binding = self.root.define_function(
            &function.name,
            parameters.len(),
            Signature {
                parameters: parameters.clone(),
                returns: returns.clone(),
            },
        );
        function
            .set_function(binding)
            .map_err(|e| e.or_at(function.span))?;

        let scope = TypeScope::child(&self.root);
        for (parameter, typ) in function.parameters.iter().zip(parameters) {
            scope.define_variable(&parameter.name, false, typ);
        }
        self.analyze_block(&function.body, &scope, &returns)?;
        debug!(returns = %returns, "analyzed function");
        Ok(())
    }

    fn analyze_block(
        &self,
        block: &[Statement],
        scope: &Rc<TypeScope>,
        returns: &Type,
    ) -> Result<()> {
        for statement in block {
            self.analyze_statement(statement, scope, returns)?;
        }
        Ok(())
    }

    fn analyze_statement(
        &self,
        statement: &Statement,
        scope: &Rc<TypeScope>,
        returns: &Type,
    ) -> Result<()> {
        match statement {
            Statement::Expression(expr) => {
                if !matches!(expr.kind, ExpressionKind::Call(_)) {
                    return Err(Error::type_(expr.span, "expression statement must be a call"));
                }
                self.analyze_expression(expr, scope)?;
            }
            Statement::Declaration(declaration) => self.analyze_declaration(declaration, scope)?,
            Statement::Assignment { receiver, value, .. } => {
                let ExpressionKind::Access(access) = &receiver.kind else {
                    return Err(Error::type_(
                        receiver.span,
                        "assignment receiver must be a variable",
                    ));
                };
                let target = self.analyze_expression(receiver, scope)?;
                if !access.variable().map_or(false, |v| v.mutable) {
                    return Err(Error::type_(
                        receiver.span,
                        &format!("variable '{}' is immutable", access.name),
                    ));
                }
                let found = self.analyze_expression(value, scope)?;
                require_assignable(&target, &found).map_err(|e| e.or_at(value.span))?;
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                span,
            } => {
                self.require_condition(condition, scope)?;
                if then_block.is_empty() {
                    return Err(Error::type_(*span, "IF requires a non-empty block"));
                }
                self.analyze_block(then_block, &TypeScope::child(scope), returns)?;
                self.analyze_block(else_block, &TypeScope::child(scope), returns)?;
            }
            Statement::Switch {
                condition, cases, ..
            } => {
                let typ = self.analyze_expression(condition, scope)?;
                for case in cases {
                    if let Some(value) = &case.value {
                        let found = self.analyze_expression(value, scope)?;
                        require_assignable(&typ, &found).map_err(|e| e.or_at(value.span))?;
                    }
                    self.analyze_block(&case.block, &TypeScope::child(scope), returns)?;
                }
            }
            Statement::While {
                condition, block, ..
            } => {
                self.require_condition(condition, scope)?;
                self.analyze_block(block, &TypeScope::child(scope), returns)?;
            }
            Statement::Return { value, .. } => {
                let found = self.analyze_expression(value, scope)?;
                require_assignable(returns, &found).map_err(|e| e.or_at(value.span))?;
            }
        }
        Ok(())
    }

    fn analyze_declaration(&self, declaration: &Declaration, scope: &Rc<TypeScope>) -> Result<()> {
        let typ = match (&declaration.type_name, &declaration.value) {
            (Some(name), value) => {
                let declared = self.resolve(name, declaration.span)?;
                if let Some(value) = value {
                    let found = self.analyze_expression(value, scope)?;
                    require_assignable(&declared, &found).map_err(|e| e.or_at(value.span))?;
                }
                declared
            }
            (None, Some(value)) => self.analyze_expression(value, scope)?,
            (None, None) => {
                return Err(Error::type_(
                    declaration.span,
                    &format!(
                        "declaration of '{}' requires a type or an initializer",
                        declaration.name
                    ),
                ))
            }
        };
        declaration
            .set_variable(scope.define_variable(&declaration.name, true, typ))
            .map_err(|e| e.or_at(declaration.span))?;
        Ok(())
    }

    fn require_condition(&self, condition: &Expression, scope: &Rc<TypeScope>) -> Result<()> {
        let typ = self.analyze_expression(condition, scope)?;
        require_assignable(&self.types.boolean, &typ).map_err(|e| e.or_at(condition.span))
    }

    fn analyze_expression(&self, expr: &Expression, scope: &Rc<TypeScope>) -> Result<Type> {
        let typ = match &expr.kind {
            ExpressionKind::Literal(literal) => self.analyze_literal(literal, expr.span)?,
            ExpressionKind::Group(inner) => self.analyze_expression(inner, scope)?,
            ExpressionKind::Binary(op, operands) => {
                let left = self.analyze_expression(&operands.0, scope)?;
                let right = self.analyze_expression(&operands.1, scope)?;
                self.analyze_binary(*op, left, right, expr.span)?
            }
            ExpressionKind::Access(access) => {
                if let Some(offset) = &access.offset {
                    let typ = self.analyze_expression(offset, scope)?;
                    require_assignable(&self.types.integer, &typ)
                        .map_err(|e| e.or_at(offset.span))?;
                }
                let variable = scope
                    .lookup_variable(&access.name)
                    .map_err(|e| e.or_at(expr.span))?;
                let held = variable.value().clone();
                access.set_variable(variable).map_err(|e| e.or_at(expr.span))?;
                match (&access.offset, held.element()) {
                    (None, _) => held.clone(),
                    (Some(_), Some(element)) => element.clone(),
                    (Some(_), None) => {
                        return Err(Error::type_(
                            expr.span,
                            &format!("variable '{}' of type {held} is not a list", access.name),
                        ))
                    }
                }
            }
            ExpressionKind::Call(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|arg| self.analyze_expression(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                let function = scope
                    .lookup_function(&call.name, arguments.len())
                    .map_err(|e| e.or_at(expr.span))?;
                for ((argument, found), expected) in call
                    .arguments
                    .iter()
                    .zip(&arguments)
                    .zip(&function.payload.parameters)
                {
                    require_assignable(expected, found).map_err(|e| e.or_at(argument.span))?;
                }
                let returns = function.payload.returns.clone();
                call.set_function(function).map_err(|e| e.or_at(expr.span))?;
                returns
            }
            ExpressionKind::List(values) => return self.analyze_list(expr, values, None, scope),
        };
        expr.set_type(typ.clone()).map_err(|e| e.or_at(expr.span))?;
        Ok(typ)
    }

    /// Element type is `expected` when known, else the first element's type.
    fn analyze_list(
        &self,
        expr: &Expression,
        values: &[Expression],
        expected: Option<&Type>,
        scope: &Rc<TypeScope>,
    ) -> Result<Type> {
        let found = values
            .iter()
            .map(|value| self.analyze_expression(value, scope))
            .collect::<Result<Vec<_>>>()?;
        let element = match (expected, found.first()) {
            (Some(expected), _) => expected.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) => self.types.any.clone(),
        };
        for (value, typ) in values.iter().zip(&found) {
            require_assignable(&element, typ).map_err(|e| e.or_at(value.span))?;
        }
        let typ = self.types.list_of(&element);
        expr.set_type(typ.clone()).map_err(|e| e.or_at(expr.span))?;
        Ok(typ)
    }

    fn analyze_literal(&self, literal: &Literal, span: Span) -> Result<Type> {
        let typ = match literal {
            Literal::Nil => &self.types.nil,
            Literal::Boolean(_) => &self.types.boolean,
            Literal::Character(_) => &self.types.character,
            Literal::String(_) => &self.types.string,
            Literal::Integer(value) => {
                if *value < *INTEGER_MIN || *value > *INTEGER_MAX {
                    return Err(Error::type_(span, &format!("integer {value} out of range")));
                }
                &self.types.integer
            }
            Literal::Decimal(value) => {
                if value.abs() > *DECIMAL_MAX {
                    return Err(Error::type_(span, &format!("decimal {value} out of range")));
                }
                &self.types.decimal
            }
        };
        Ok(typ.clone())
    }

    fn analyze_binary(&self, op: Operator, left: Type, right: Type, span: Span) -> Result<Type> {
        let types = &self.types;
        let mismatch = || {
            Err(Error::type_(
                span,
                &format!("operator {} not defined for {left} and {right}", op.symbol()),
            ))
        };
        match op {
            Operator::And | Operator::Or => {
                if left == types.boolean && right == types.boolean {
                    Ok(types.boolean.clone())
                } else {
                    mismatch()
                }
            }
            Operator::Less | Operator::Greater | Operator::Equal | Operator::NotEqual => {
                if left == right && left.is_assignable_to(&types.comparable) {
                    Ok(types.boolean.clone())
                } else {
                    mismatch()
                }
            }
            Operator::Plus if left == types.string || right == types.string => {
                Ok(types.string.clone())
            }
            Operator::Plus => {
                if left == right && types.is_numeric(&left) {
                    Ok(left.clone())
                } else {
                    mismatch()
                }
            }
            Operator::Minus | Operator::Times | Operator::Divide | Operator::Modulo => {
                if types.is_numeric(&left) && types.is_numeric(&right) {
                    Ok(left.clone())
                } else {
                    mismatch()
                }
            }
            Operator::Power => {
                if left == types.integer && right == types.integer {
                    Ok(types.integer.clone())
                } else {
                    mismatch()
                }
            }
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
