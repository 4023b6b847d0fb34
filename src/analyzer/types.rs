use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use derivative::Derivative;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use once_cell::sync::Lazy;

use crate::error::{Error, ErrorKind, Result};
use crate::scope::Scope;

/// Binding table used during analysis: variables hold their types.
pub type TypeScope = Scope<Type, Signature>;

/// A nominal type. Its defining scope places it in the "is-a" lattice: a
/// type is assignable to every type whose defining scope encloses its own.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Type {
    name: Rc<str>,
    #[derivative(Debug = "ignore")]
    scope: Rc<TypeScope>,
    #[derivative(Debug = "ignore")]
    element: Option<Box<Type>>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }
}

impl Type {
    fn new(name: &str, parent: Option<&Type>) -> Self {
        let scope = match parent {
            Some(parent) => TypeScope::child(&parent.scope),
            None => TypeScope::root(),
        };
        Self {
            name: name.into(),
            scope,
            element: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element type, if this is a list type.
    pub fn element(&self) -> Option<&Type> {
        self.element.as_deref()
    }

    pub fn is_assignable_to(&self, target: &Type) -> bool {
        self.scope
            .ancestors()
            .any(|scope| Rc::ptr_eq(&scope, &target.scope))
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Succeeds when `source` may be stored where `target` is expected.
pub fn require_assignable(target: &Type, source: &Type) -> Result<()> {
    if source.is_assignable_to(target) {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::Type,
            None,
            &format!("{source} not assignable to {target}"),
        ))
    }
}

/// Parameter and return types of a function binding.
#[derive(Clone, Debug)]
pub struct Signature {
    pub parameters: Vec<Type>,
    pub returns: Type,
}

pub(crate) static INTEGER_MIN: Lazy<BigInt> = Lazy::new(|| BigInt::from(i32::MIN));
pub(crate) static INTEGER_MAX: Lazy<BigInt> = Lazy::new(|| BigInt::from(i32::MAX));
pub(crate) static DECIMAL_MAX: Lazy<BigDecimal> =
    Lazy::new(|| BigDecimal::from_f64(f64::MAX).unwrap_or_default());

/// The built-in types of one analysis run, plus interned list types.
pub struct Types {
    pub any: Type,
    pub nil: Type,
    pub comparable: Type,
    pub boolean: Type,
    pub integer: Type,
    pub decimal: Type,
    pub character: Type,
    pub string: Type,
    lists: RefCell<HashMap<String, Type>>,
}

impl Types {
    pub fn new() -> Self {
        let any = Type::new("Any", None);
        let nil = Type::new("Nil", Some(&any));
        let comparable = Type::new("Comparable", Some(&any));
        let boolean = Type::new("Boolean", Some(&any));
        let integer = Type::new("Integer", Some(&comparable));
        let decimal = Type::new("Decimal", Some(&comparable));
        let character = Type::new("Character", Some(&comparable));
        let string = Type::new("String", Some(&comparable));
        Self {
            any,
            nil,
            comparable,
            boolean,
            integer,
            decimal,
            character,
            string,
            lists: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves a type name as written in source.
    pub fn lookup(&self, name: &str) -> Result<Type> {
        let typ = match name {
            "Any" => &self.any,
            "Nil" => &self.nil,
            "Comparable" => &self.comparable,
            "Boolean" => &self.boolean,
            "Integer" => &self.integer,
            "Decimal" => &self.decimal,
            "Character" => &self.character,
            "String" => &self.string,
            _ => {
                return Err(Error::new(
                    ErrorKind::Name,
                    None,
                    &format!("unknown type '{name}'"),
                ))
            }
        };
        Ok(typ.clone())
    }

    /// The list type over `element`. Repeated requests yield the same nominal type.
    pub fn list_of(&self, element: &Type) -> Type {
        self.lists
            .borrow_mut()
            .entry(element.name().to_string())
            .or_insert_with(|| {
                let mut list = Type::new(&format!("List<{element}>"), Some(&self.any));
                list.element = Some(Box::new(element.clone()));
                list
            })
            .clone()
    }

    pub fn is_numeric(&self, typ: &Type) -> bool {
        *typ == self.integer || *typ == self.decimal
    }
}

impl Default for Types {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignability_is_reflexive() {
        let types = Types::new();
        for typ in [&types.any, &types.nil, &types.integer, &types.string] {
            assert!(require_assignable(typ, typ).is_ok());
        }
    }

    #[test]
    fn assignability_follows_ancestry() {
        let types = Types::new();
        assert!(require_assignable(&types.comparable, &types.integer).is_ok());
        assert!(require_assignable(&types.any, &types.integer).is_ok());
        assert!(require_assignable(&types.any, &types.nil).is_ok());
        let err = require_assignable(&types.integer, &types.comparable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.message(), "Comparable not assignable to Integer");
        assert!(require_assignable(&types.integer, &types.decimal).is_err());
        assert!(require_assignable(&types.comparable, &types.boolean).is_err());
    }

    #[test]
    fn list_types_are_interned() {
        let types = Types::new();
        let ints = types.list_of(&types.integer);
        assert_eq!(ints, types.list_of(&types.integer));
        assert_ne!(ints, types.list_of(&types.string));
        assert_eq!(ints.name(), "List<Integer>");
        assert_eq!(ints.element(), Some(&types.integer));
        assert!(require_assignable(&types.any, &ints).is_ok());
        assert!(require_assignable(&types.comparable, &ints).is_err());
    }

    #[test]
    fn unknown_type_names_do_not_resolve() {
        let types = Types::new();
        assert_eq!(types.lookup("Decimal").unwrap(), types.decimal);
        assert_eq!(types.lookup("Float").unwrap_err().kind(), ErrorKind::Name);
    }

    #[test]
    fn separate_runs_have_separate_types() {
        let (a, b) = (Types::new(), Types::new());
        assert_ne!(a.integer, b.integer);
    }
}
