//! String interner
//!
//! Identifiers are interned once by the scanner so that environments, instance fields and the
//! resolver's scopes can compare names by address.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Stores all known symbols.
#[derive(Debug, Default)]
pub struct Interner(HashSet<Symbol>);

impl Interner {
    pub fn new() -> Interner {
        Interner(HashSet::new())
    }

    /// Maps a string to a symbol.
    pub fn symbol(&mut self, name: &str) -> Symbol {
        if let Some(sym) = self.0.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            self.0.insert(sym.clone());
            sym
        }
    }
}

/// An immutable string that is guaranteed to be unique and so can be compared by address rather
/// than content.
#[derive(Debug, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

// Must agree with `str`'s hash so that `HashSet::get(&str)` finds interned symbols.
impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_string() {
        let mut reg = Interner::new();
        let sym = reg.symbol("foo");
        assert_eq!(sym.name(), "foo");
    }

    #[test]
    fn symbols_with_same_name_are_equal() {
        let mut reg = Interner::new();
        let sym1 = reg.symbol("foo");
        let sym2 = reg.symbol("foo");
        assert_eq!(sym1, sym2);
        assert_eq!(reg.0.len(), 1);
    }

    #[test]
    fn symbols_from_different_interners_are_different() {
        let sym1 = Interner::new().symbol("foo");
        let sym2 = Interner::new().symbol("foo");
        assert_ne!(sym1, sym2);
    }
}
