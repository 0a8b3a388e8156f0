use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::interner::Symbol;

use super::value::Value;

/// A scope of variable bindings chained to its enclosing scope.
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

// Closures stored in bindings can point back at this very env so only names are dumped.
impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.borrow();
        let mut names = bindings.keys().map(Symbol::name).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("Env")
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Env {
    pub fn new() -> Rc<Env> {
        Rc::new(Env {
            parent: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_parent(parent: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            parent: Some(parent),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind `sym` in this scope, silently replacing any previous binding.
    pub fn define(&self, sym: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), val);
    }

    /// Look `sym` up in this scope then in the enclosing ones.
    pub fn get(&self, sym: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(sym) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(sym)),
        }
    }

    /// Rebind the innermost existing binding of `sym`.  Returns false if there is none.
    pub fn assign(&self, sym: &Symbol, val: Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(sym) {
            *slot = val;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(sym, val),
            None => false,
        }
    }

    /// Look `sym` up exactly `distance` scopes outward, without walking further.
    pub fn get_at(self: &Rc<Self>, distance: usize, sym: &Symbol) -> Option<Value> {
        self.ancestor(distance)?.bindings.borrow().get(sym).cloned()
    }

    pub fn assign_at(self: &Rc<Self>, distance: usize, sym: &Symbol, val: Value) -> bool {
        match self.ancestor(distance) {
            Some(env) => {
                let mut bindings = env.bindings.borrow_mut();
                match bindings.get_mut(sym) {
                    Some(slot) => {
                        *slot = val;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    fn ancestor(self: &Rc<Self>, distance: usize) -> Option<Rc<Env>> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            env = env.parent.clone()?;
        }
        Some(env)
    }
}
