use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::ExprId;
use crate::interner::{Interner, Symbol};
use crate::token::Token;

/// Global mostly read-only state context that persists across interpreter sessions.
///
/// Anchors the string interner, maps keywords to their tokens and hands out expression ids.  Ids
/// must stay unique for the lifetime of an interpreter because the evaluator accumulates the
/// resolver's side tables of successive sessions.
#[derive(Debug)]
pub struct Context {
    interner: RefCell<Interner>,
    keywords: HashMap<Symbol, Token>,
    next_expr_id: Cell<usize>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data structures.
    pub fn new() -> Rc<Self> {
        let mut interner = Interner::new();

        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            keywords.insert(interner.symbol(name), token);
        }

        Rc::new(Context {
            interner: RefCell::new(interner),
            keywords,
            next_expr_id: Cell::new(0),
        })
    }

    /// Intern the given string if needed and return its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.borrow_mut().symbol(name)
    }

    /// Return the token associated with the given symbol if it is a keyword.
    pub fn keyword(&self, id: &Symbol) -> Option<Token> {
        self.keywords.get(id).cloned()
    }

    pub fn fresh_expr_id(&self) -> ExprId {
        let id = self.next_expr_id.get();
        self.next_expr_id.set(id + 1);
        ExprId(id)
    }
}

const KEYWORDS: [(&str, Token); 18] = [
    ("and", Token::And),
    ("break", Token::Break),
    ("class", Token::Class),
    ("continue", Token::Continue),
    ("else", Token::Else),
    ("false", Token::False),
    ("for", Token::For),
    ("fun", Token::Fun),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_recognized() {
        let ctx = Context::new();
        assert_eq!(ctx.keyword(&ctx.symbol("continue")), Some(Token::Continue));
        assert_eq!(ctx.keyword(&ctx.symbol("contin")), None);
    }

    #[test]
    fn expr_ids_are_unique() {
        let ctx = Context::new();
        let a = ctx.fresh_expr_id();
        let b = ctx.fresh_expr_id();
        assert_ne!(a, b);
    }
}
