//! Tree-walking evaluation. The interpreter reads only the shape of the
//! tree, so it runs analyzed and unanalyzed programs alike.

mod value;

use std::io::Write;
use std::rc::Rc;

use num_traits::ToPrimitive;
use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::parser::{self as ast, Expression, ExpressionKind, Source, Span, Statement};
use crate::scope::{Function, Scope};
pub use value::Value;

/// Binding table used at run time: variables hold values.
pub type RuntimeScope<'a> = Scope<Value, Callable<'a>>;

type Builtin<'a> = fn(&mut Interpreter<'a>, Vec<Value>) -> Result<Value>;

pub enum Callable<'a> {
    Builtin(Builtin<'a>),
    User(&'a ast::Function),
}

pub enum FlowControl {
    NextStatement,
    Return(Value),
}

pub struct Interpreter<'a> {
    globals: Rc<RuntimeScope<'a>>,
    out: Box<dyn Write + 'a>,
}

fn print<'a>(interpreter: &mut Interpreter<'a>, arguments: Vec<Value>) -> Result<Value> {
    let [argument] = arguments.as_slice() else {
        return Err(Error::new(
            ErrorKind::Name,
            None,
            &format!("function 'print/{}' is not defined", arguments.len()),
        ));
    };
    writeln!(interpreter.out, "{argument}")
        .map_err(|e| Error::new(ErrorKind::Runtime, None, &e.to_string()))?;
    Ok(Value::Nil)
}

impl<'a> Interpreter<'a> {
    /// An interpreter whose `print` writes to stdout.
    pub fn new() -> Self {
        Self::with_output(std::io::stdout())
    }

    pub fn with_output(out: impl Write + 'a) -> Self {
        let globals = RuntimeScope::root();
        globals.define_function("print", 1, Callable::Builtin(print));
        Self {
            globals,
            out: Box::new(out),
        }
    }

    /// Defines all globals and functions, then runs `main/0` and returns its result.
    pub fn evaluate(&mut self, source: &'a Source) -> Result<Value> {
        let globals = Rc::clone(&self.globals);
        for global in &source.globals {
            let value = match &global.value {
                Some(value) => self.evaluate_expression(value, &globals)?,
                None => Value::Nil,
            };
            globals.define_variable(&global.name, global.mutable, value);
        }
        for function in &source.functions {
            globals.define_function(
                &function.name,
                function.parameters.len(),
                Callable::User(function),
            );
        }
        debug!(
            globals = source.globals.len(),
            functions = source.functions.len(),
            "running main"
        );
        let main = globals.lookup_function("main", 0)?;
        let result = self.invoke(&main, vec![])?;
        self.out
            .flush()
            .map_err(|e| Error::new(ErrorKind::Runtime, None, &e.to_string()))?;
        Ok(result)
    }

    fn invoke(&mut self, function: &Function<Callable<'a>>, arguments: Vec<Value>) -> Result<Value> {
        trace!(name = %function.name, arity = function.arity, "invoking function");
        match function.payload {
            Callable::Builtin(builtin) => builtin(self, arguments),
            Callable::User(declaration) => {
                let scope = RuntimeScope::child(&self.globals);
                for (parameter, argument) in declaration.parameters.iter().zip(arguments) {
                    scope.define_variable(&parameter.name, false, argument);
                }
                match self.execute_block(&declaration.body, &scope)? {
                    FlowControl::Return(value) => Ok(value),
                    FlowControl::NextStatement => Ok(Value::Nil),
                }
            }
        }
    }

    fn execute_block(
        &mut self,
        block: &[Statement],
        scope: &Rc<RuntimeScope<'a>>,
    ) -> Result<FlowControl> {
        for statement in block {
            let flow = self.execute(statement, scope)?;
            if !matches!(flow, FlowControl::NextStatement) {
                return Ok(flow);
            }
        }
        Ok(FlowControl::NextStatement)
    }

    fn execute(&mut self, statement: &Statement, scope: &Rc<RuntimeScope<'a>>) -> Result<FlowControl> {
        match statement {
            Statement::Expression(expr) => {
                self.evaluate_expression(expr, scope)?;
            }
            Statement::Declaration(declaration) => {
                let value = match &declaration.value {
                    Some(value) => self.evaluate_expression(value, scope)?,
                    None => Value::Nil,
                };
                scope.define_variable(&declaration.name, true, value);
            }
            Statement::Assignment { receiver, value, .. } => {
                let value = self.evaluate_expression(value, scope)?;
                self.assign(receiver, value, scope)?;
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let block = if self.condition(condition, scope)? {
                    then_block
                } else {
                    else_block
                };
                return self.execute_block(block, &RuntimeScope::child(scope));
            }
            Statement::Switch {
                condition, cases, ..
            } => {
                let value = self.evaluate_expression(condition, scope)?;
                let mut selected = None;
                for case in cases {
                    if let Some(case_value) = &case.value {
                        if self.evaluate_expression(case_value, scope)? == value {
                            selected = Some(case);
                            break;
                        }
                    }
                }
                let selected = selected.or_else(|| cases.iter().find(|case| case.value.is_none()));
                if let Some(case) = selected {
                    return self.execute_block(&case.block, &RuntimeScope::child(scope));
                }
            }
            Statement::While {
                condition, block, ..
            } => {
                while self.condition(condition, scope)? {
                    let flow = self.execute_block(block, &RuntimeScope::child(scope))?;
                    if !matches!(flow, FlowControl::NextStatement) {
                        return Ok(flow);
                    }
                }
            }
            Statement::Return { value, .. } => {
                return Ok(FlowControl::Return(self.evaluate_expression(value, scope)?));
            }
        }
        Ok(FlowControl::NextStatement)
    }

    fn assign(
        &mut self,
        receiver: &Expression,
        value: Value,
        scope: &Rc<RuntimeScope<'a>>,
    ) -> Result<()> {
        let ExpressionKind::Access(access) = &receiver.kind else {
            return Err(Error::runtime(receiver.span, "invalid assignment receiver"));
        };
        let variable = scope.lookup_variable(&access.name).map_err(|_| {
            Error::runtime(
                receiver.span,
                &format!("cannot assign to undefined variable '{}'", access.name),
            )
        })?;
        if !variable.mutable {
            return Err(Error::runtime(
                receiver.span,
                &format!("cannot assign to immutable variable '{}'", access.name),
            ));
        }
        match &access.offset {
            Some(offset) => {
                let offset = self.evaluate_expression(offset, scope)?;
                variable.update(|held| match held {
                    Value::List(values) => {
                        let index = index(&offset, values.len(), receiver.span)?;
                        values[index] = value;
                        Ok(())
                    }
                    other => Err(not_a_list(other, receiver.span)),
                })
            }
            None => {
                variable.set(value);
                Ok(())
            }
        }
    }

    fn condition(&mut self, condition: &Expression, scope: &Rc<RuntimeScope<'a>>) -> Result<bool> {
        match self.evaluate_expression(condition, scope)? {
            Value::Boolean(value) => Ok(value),
            other => Err(Error::runtime(
                condition.span,
                &format!("condition must be a Boolean, found {}", other.type_name()),
            )),
        }
    }

    fn evaluate_expression(
        &mut self,
        expr: &Expression,
        scope: &Rc<RuntimeScope<'a>>,
    ) -> Result<Value> {
        match &expr.kind {
            ExpressionKind::Literal(literal) => Ok(Value::from(literal)),
            ExpressionKind::Group(inner) => self.evaluate_expression(inner, scope),
            ExpressionKind::Binary(op, operands) => {
                let left = self.evaluate_expression(&operands.0, scope)?;
                let right = self.evaluate_expression(&operands.1, scope)?;
                value::apply(*op, left, right, expr.span)
            }
            ExpressionKind::Access(access) => {
                let variable = scope
                    .lookup_variable(&access.name)
                    .map_err(|e| e.or_at(expr.span))?;
                let Some(offset) = &access.offset else {
                    return Ok(variable.value().clone());
                };
                let offset = self.evaluate_expression(offset, scope)?;
                let held = variable.value();
                match &*held {
                    Value::List(values) => {
                        Ok(values[index(&offset, values.len(), expr.span)?].clone())
                    }
                    other => Err(not_a_list(other, expr.span)),
                }
            }
            ExpressionKind::Call(call) => {
                let arguments = call
                    .arguments
                    .iter()
                    .map(|arg| self.evaluate_expression(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                let function = scope
                    .lookup_function(&call.name, arguments.len())
                    .map_err(|e| e.or_at(expr.span))?;
                self.invoke(&function, arguments)
                    .map_err(|e| e.or_at(expr.span))
            }
            ExpressionKind::List(values) => values
                .iter()
                .map(|value| self.evaluate_expression(value, scope))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
        }
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn index(offset: &Value, length: usize, span: Span) -> Result<usize> {
    let Value::Integer(offset) = offset else {
        return Err(Error::runtime(
            span,
            &format!("list index must be an Integer, found {}", offset.type_name()),
        ));
    };
    match offset.to_usize() {
        Some(index) if index < length => Ok(index),
        _ => Err(Error::runtime(
            span,
            &format!("index {offset} out of bounds for list of length {length}"),
        )),
    }
}

fn not_a_list(value: &Value, span: Span) -> Error {
    Error::runtime(span, &format!("cannot index into {}", value.type_name()))
}

#[cfg(test)]
mod test;
