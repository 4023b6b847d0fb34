//! Nested binding tables shared by the analyzer and the interpreter.
//!
//! A [`Scope`] maps variable names and `(name, arity)` function keys to
//! bindings and delegates failed lookups to its parent. The analyzer stores
//! types in it, the interpreter stores values; the table itself does not care.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use derivative::Derivative;

use crate::error::{Error, ErrorKind, Result};

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Variable<V> {
    pub name: String,
    pub mutable: bool,
    value: RefCell<V>,
}

impl<V> Variable<V> {
    pub fn new(name: &str, mutable: bool, value: V) -> Self {
        Self {
            name: name.to_string(),
            mutable,
            value: RefCell::new(value),
        }
    }

    pub fn value(&self) -> Ref<'_, V> {
        self.value.borrow()
    }

    /// Replaces the held value, ignoring mutability. Callers enforce `mutable`.
    pub fn set(&self, value: V) {
        *self.value.borrow_mut() = value;
    }

    pub fn update<R>(&self, op: impl FnOnce(&mut V) -> R) -> R {
        op(&mut self.value.borrow_mut())
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Function<F> {
    pub name: String,
    pub arity: usize,
    #[derivative(Debug = "ignore")]
    pub payload: F,
}

impl<F> Function<F> {
    pub fn new(name: &str, arity: usize, payload: F) -> Self {
        Self {
            name: name.to_string(),
            arity,
            payload,
        }
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Scope<V, F> {
    #[derivative(Debug = "ignore")]
    parent: Option<Rc<Scope<V, F>>>,
    variables: RefCell<HashMap<String, Rc<Variable<V>>>>,
    functions: RefCell<HashMap<(String, usize), Rc<Function<F>>>>,
}

impl<V, F> Scope<V, F> {
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            variables: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
        })
    }

    /// Opens a scope nested in `parent`. It lives as long as the caller keeps it.
    pub fn child(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            variables: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
        })
    }

    /// Iterates from `self` up to the root, `self` first.
    pub fn ancestors(self: &Rc<Self>) -> impl Iterator<Item = Rc<Self>> {
        std::iter::successors(Some(Rc::clone(self)), |scope| scope.parent.clone())
    }

    pub fn define_variable(&self, name: &str, mutable: bool, value: V) -> Rc<Variable<V>> {
        let variable = Rc::new(Variable::new(name, mutable, value));
        self.variables
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&variable));
        variable
    }

    pub fn define_function(&self, name: &str, arity: usize, payload: F) -> Rc<Function<F>> {
        let function = Rc::new(Function::new(name, arity, payload));
        self.functions
            .borrow_mut()
            .insert((name.to_string(), arity), Rc::clone(&function));
        function
    }

    pub fn lookup_variable(&self, name: &str) -> Result<Rc<Variable<V>>> {
        if let Some(variable) = self.variables.borrow().get(name) {
            return Ok(Rc::clone(variable));
        }
        match &self.parent {
            Some(parent) => parent.lookup_variable(name),
            None => Err(Error::new(
                ErrorKind::Name,
                None,
                &format!("variable '{name}' is not defined"),
            )),
        }
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Result<Rc<Function<F>>> {
        let key = (name.to_string(), arity);
        if let Some(function) = self.functions.borrow().get(&key) {
            return Ok(Rc::clone(function));
        }
        match &self.parent {
            Some(parent) => parent.lookup_function(name, arity),
            None => Err(Error::new(
                ErrorKind::Name,
                None,
                &format!("function '{name}/{arity}' is not defined"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestScope = Scope<i32, &'static str>;

    #[test]
    fn lookup_walks_to_the_root() {
        let root = TestScope::root();
        root.define_variable("x", true, 1);
        let inner = TestScope::child(&TestScope::child(&root));
        assert_eq!(*inner.lookup_variable("x").unwrap().value(), 1);
        assert_eq!(inner.ancestors().count(), 3);
    }

    #[test]
    fn inner_definitions_shadow_and_vanish() {
        let root = TestScope::root();
        root.define_variable("x", true, 1);
        {
            let inner = TestScope::child(&root);
            inner.define_variable("x", false, 2);
            inner.define_variable("y", false, 3);
            assert_eq!(*inner.lookup_variable("x").unwrap().value(), 2);
        }
        assert_eq!(*root.lookup_variable("x").unwrap().value(), 1);
        let err = root.lookup_variable("y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Name);
    }

    #[test]
    fn redefinition_overwrites() {
        let root = TestScope::root();
        root.define_variable("x", true, 1);
        root.define_variable("x", false, 5);
        let x = root.lookup_variable("x").unwrap();
        assert_eq!(*x.value(), 5);
        assert!(!x.mutable);
    }

    #[test]
    fn functions_are_keyed_by_arity() {
        let root = TestScope::root();
        root.define_function("print", 1, "unary");
        let child = TestScope::child(&root);
        assert_eq!(child.lookup_function("print", 1).unwrap().payload, "unary");
        assert_eq!(
            child.lookup_function("print", 0).unwrap_err().kind(),
            ErrorKind::Name
        );
        assert_eq!(
            child.lookup_function("print", 2).unwrap_err().kind(),
            ErrorKind::Name
        );
    }

    #[test]
    fn variables_update_in_place() {
        let root = TestScope::root();
        let x = root.define_variable("x", true, 1);
        root.lookup_variable("x").unwrap().set(7);
        x.update(|v| *v += 1);
        assert_eq!(*x.value(), 8);
    }
}
