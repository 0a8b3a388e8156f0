//! A tree-walk interpreter for a Lox dialect.
//!
//! Besides the language of [Crafting Interpreters](https://craftinginterpreters.com/), the dialect
//! supports arrays (`[1, 2]`, `a[i]`, `len`, `push`), the ternary and comma operators,
//! `break`/`continue` and nested block comments.
//!
//! Source text flows through a scanner, a parser and a static resolver before being evaluated.
//! The three static stages report into a shared [`Diagnostics`] sink and keep going after an
//! error, so a single run reports as many problems as possible.  Nothing is evaluated unless the
//! sink is empty.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;
pub mod printer;

mod ast;
mod ctx;
mod diag;
mod eval;
mod interner;
mod parser;
mod resolver;
mod scanner;
mod token;

pub use diag::{Diagnostic, Diagnostics, StaticError};
pub use eval::{RuntimeError, RuntimeErrorKind};
