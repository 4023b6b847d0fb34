use std::cmp::Ordering;
use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::parser::{Literal, Operator, Span};

/// A runtime value. Lists are held by value; assignment copies them.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::Boolean(_) => "Boolean",
            Self::Character(_) => "Character",
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Decimal(_) => "Decimal",
            Self::List(_) => "List",
        }
    }

    fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Self::Integer(value) => Some(BigDecimal::new(value.clone(), 0)),
            Self::Decimal(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Self::Nil,
            Literal::Boolean(value) => Self::Boolean(*value),
            Literal::Integer(value) => Self::Integer(value.clone()),
            Literal::Decimal(value) => Self::Decimal(value.clone()),
            Literal::Character(value) => Self::Character(*value),
            Literal::String(value) => Self::String(value.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("NIL"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Character(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Applies a binary operator to two evaluated operands.
pub(crate) fn apply(op: Operator, left: Value, right: Value, span: Span) -> Result<Value> {
    let mismatch = |left: &Value, right: &Value| {
        Error::runtime(
            span,
            &format!(
                "operator {} not defined for {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )
    };
    match op {
        Operator::And | Operator::Or => match (&left, &right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(match op {
                Operator::And => *l && *r,
                _ => *l || *r,
            })),
            _ => Err(mismatch(&left, &right)),
        },
        Operator::Equal => Ok(Value::Boolean(left == right)),
        Operator::NotEqual => Ok(Value::Boolean(left != right)),
        Operator::Less | Operator::Greater => {
            let ordering = compare(&left, &right).ok_or_else(|| mismatch(&left, &right))?;
            let expected = match op {
                Operator::Less => Ordering::Less,
                _ => Ordering::Greater,
            };
            Ok(Value::Boolean(ordering == expected))
        }
        Operator::Plus if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) => {
            Ok(Value::String(format!("{left}{right}")))
        }
        Operator::Power => match (&left, &right) {
            (Value::Integer(base), Value::Integer(exponent)) => {
                let exponent = exponent.to_u32().ok_or_else(|| {
                    Error::runtime(span, &format!("exponent {exponent} out of range"))
                })?;
                Ok(Value::Integer(base.pow(exponent)))
            }
            _ => Err(mismatch(&left, &right)),
        },
        _ => arithmetic(op, &left, &right, span).ok_or_else(|| mismatch(&left, &right))?,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
        (Value::Character(l), Value::Character(r)) => Some(l.cmp(r)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => left.to_decimal()?.partial_cmp(&right.to_decimal()?),
    }
}

/// `+ - * / %` on numbers. `None` when either operand is not a number.
///
/// Two integers stay integral and `/` truncates; any decimal operand promotes
/// both sides and the result takes the kind of the left operand.
fn arithmetic(op: Operator, left: &Value, right: &Value, span: Span) -> Option<Result<Value>> {
    if let (Value::Integer(l), Value::Integer(r)) = (left, right) {
        if matches!(op, Operator::Divide | Operator::Modulo) && r.is_zero() {
            return Some(Err(Error::divide_by_zero(span)));
        }
        return Some(Ok(Value::Integer(match op {
            Operator::Plus => l + r,
            Operator::Minus => l - r,
            Operator::Times => l * r,
            Operator::Divide => l / r,
            _ => l % r,
        })));
    }
    let (l, r) = (left.to_decimal()?, right.to_decimal()?);
    if matches!(op, Operator::Divide | Operator::Modulo) && r.is_zero() {
        return Some(Err(Error::divide_by_zero(span)));
    }
    let result = match op {
        Operator::Plus => l + r,
        Operator::Minus => l - r,
        Operator::Times => l * r,
        Operator::Divide => l / r,
        _ => l % r,
    };
    Some(Ok(match left {
        Value::Integer(_) => Value::Integer(result.with_scale(0).into_bigint_and_exponent().0),
        _ => Value::Decimal(result),
    }))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::error::ErrorKind;

    fn int(value: i64) -> Value {
        Value::Integer(BigInt::from(value))
    }

    fn dec(value: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(value).unwrap())
    }

    fn eval(op: Operator, left: Value, right: Value) -> Result<Value> {
        apply(op, left, right, Span::new(0, 1))
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Nil.to_string(), "NIL");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        assert_eq!(Value::Character('c').to_string(), "c");
        assert_eq!(Value::String("s".into()).to_string(), "s");
        assert_eq!(int(-3).to_string(), "-3");
        assert_eq!(dec("2.5").to_string(), "2.5");
        assert_eq!(
            Value::List(vec![int(1), Value::String("a".into())]).to_string(),
            "[1, a]"
        );
        assert_eq!(Value::List(vec![]).to_string(), "[]");
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval(Operator::Plus, int(1), int(1)).unwrap(), int(2));
        assert_eq!(eval(Operator::Minus, int(1), int(3)).unwrap(), int(-2));
        assert_eq!(eval(Operator::Times, int(4), int(3)).unwrap(), int(12));
        assert_eq!(eval(Operator::Divide, int(7), int(2)).unwrap(), int(3));
        assert_eq!(eval(Operator::Divide, int(-7), int(2)).unwrap(), int(-3));
        assert_eq!(eval(Operator::Modulo, int(7), int(3)).unwrap(), int(1));
        assert_eq!(eval(Operator::Power, int(2), int(10)).unwrap(), int(1024));
    }

    #[test]
    fn test_mixed_arithmetic_takes_left_kind() {
        assert_eq!(eval(Operator::Plus, dec("1.5"), dec("1.25")).unwrap(), dec("2.75"));
        assert_eq!(eval(Operator::Times, dec("1.5"), int(2)).unwrap(), dec("3"));
        assert_eq!(eval(Operator::Times, int(3), dec("1.5")).unwrap(), int(4));
        assert_eq!(eval(Operator::Divide, dec("1"), dec("4")).unwrap(), dec("0.25"));
        assert_eq!(eval(Operator::Minus, int(1), dec("0.5")).unwrap(), int(0));
    }

    #[test]
    fn test_division_by_zero() {
        for (left, right) in [(int(1), int(0)), (dec("1.0"), dec("0.0")), (int(1), dec("0"))] {
            let err = eval(Operator::Divide, left.clone(), right.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DivideByZero);
            let err = eval(Operator::Modulo, left, right).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DivideByZero);
        }
    }

    #[test]
    fn test_string_concatenation() {
        let s = |v: &str| Value::String(v.into());
        assert_eq!(eval(Operator::Plus, s("1"), s("1")).unwrap(), s("11"));
        assert_eq!(eval(Operator::Plus, s("n="), int(4)).unwrap(), s("n=4"));
        assert_eq!(eval(Operator::Plus, Value::Boolean(false), s("!")).unwrap(), s("FALSE!"));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval(Operator::Less, int(1), int(2)).unwrap(), Value::Boolean(true));
        assert_eq!(eval(Operator::Greater, int(1), int(2)).unwrap(), Value::Boolean(false));
        assert_eq!(eval(Operator::Less, int(2), int(2)).unwrap(), Value::Boolean(false));
        assert_eq!(
            eval(Operator::Greater, Value::Character('b'), Value::Character('a')).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(Operator::Less, Value::String("ab".into()), Value::String("b".into())).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval(Operator::Equal, dec("1.0"), dec("1.00")).unwrap(), Value::Boolean(true));
        assert_eq!(eval(Operator::NotEqual, int(1), dec("1")).unwrap(), Value::Boolean(true));
        assert_eq!(
            eval(Operator::Equal, Value::List(vec![int(1)]), Value::List(vec![int(1)])).unwrap(),
            Value::Boolean(true)
        );
        let err = eval(Operator::Less, Value::Nil, int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_operand_errors() {
        let err = eval(Operator::And, Value::Boolean(true), int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.message(), "operator && not defined for Boolean and Integer");
        assert_eq!(
            eval(Operator::Or, Value::Boolean(false), Value::Boolean(true)).unwrap(),
            Value::Boolean(true)
        );
        assert!(eval(Operator::Minus, Value::Nil, int(1)).is_err());
        assert!(eval(Operator::Power, int(2), int(-1)).is_err());
        assert!(eval(Operator::Power, dec("2"), int(1)).is_err());
    }
}
