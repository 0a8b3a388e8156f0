//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::Stmt;
use crate::ctx::Context;
use crate::diag::Diagnostics;
use crate::eval::{Evaluator, RuntimeError};
use crate::parser::Parser;
use crate::printer;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Tree-walk interpreter.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional times to call this
/// function:
///
/// ```
/// # use treelox::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         return x > y ? x : y;
///     }
/// "#;
/// interp.eval(func_def)?;
///
/// interp.eval("print max(10, 20);").expect("interpreter error");
/// interp.eval("print max(5, 4), max(1, 2);").expect("interpreter error");
///
/// assert_eq!(output, b"20\n5 2\n");
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Lexical, syntactic or resolution errors.  Nothing was evaluated.
    #[error("{0}")]
    Static(Diagnostics),

    /// Error occurring during evaluation.  Output printed before it stays printed.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            evaluator: Evaluator::new(output, &ctx),
            ctx,
        }
    }

    /// Run `source` in this session.  Globals defined by earlier calls remain visible.
    pub fn eval(&mut self, source: &str) -> Result<(), LoxError> {
        let mut diags = Diagnostics::new();
        let prg = self.parse(source, &mut diags);
        let locals = Resolver::new(&self.ctx, &mut diags).resolve(&prg);
        if !diags.is_empty() {
            return Err(LoxError::Static(diags));
        }
        self.evaluator.add_locals(locals);
        self.evaluator.interpret(&prg)?;
        Ok(())
    }

    /// Render the syntax tree of `source` in prefix form, one top-level statement per line,
    /// without evaluating it.
    pub fn dump_ast(&self, source: &str) -> Result<String, LoxError> {
        let mut diags = Diagnostics::new();
        let prg = self.parse(source, &mut diags);
        if !diags.is_empty() {
            return Err(LoxError::Static(diags));
        }
        Ok(prg
            .iter()
            .map(|stmt| printer::parenthesize_stmt(stmt) + "\n")
            .collect())
    }

    fn parse(&self, source: &str, diags: &mut Diagnostics) -> Vec<Stmt> {
        let tokens = Scanner::new(source, self.ctx.clone()).scan_tokens(diags);
        Parser::new(tokens, self.ctx.clone(), diags).parse_program()
    }
}
