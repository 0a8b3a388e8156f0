//! Static diagnostics shared by the scanner, the parser and the resolver.

use thiserror::Error;

use crate::token::{Located, Token};

/// Line number (starting at one).
pub type Position = u32;

/// A static error together with where it was found.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("[line {pos}] error{}: {error}", location(.at))]
pub struct Diagnostic {
    pub pos: Position,
    pub at: Option<String>,
    pub error: StaticError,
}

impl Diagnostic {
    /// Error located on a line only.
    pub fn at_line(pos: Position, error: StaticError) -> Diagnostic {
        Diagnostic {
            pos,
            at: None,
            error,
        }
    }

    /// Error located on a token.
    pub fn at_token(token: &Located, error: StaticError) -> Diagnostic {
        let at = match &token.token {
            Token::Eof => "end".to_string(),
            t => format!("'{}'", t),
        };
        Diagnostic {
            pos: token.pos,
            at: Some(at),
            error,
        }
    }
}

fn location(at: &Option<String>) -> String {
    at.as_ref().map(|at| format!(" at {}", at)).unwrap_or_default()
}

#[derive(Debug, PartialEq, Clone, Error)]
pub enum StaticError {
    #[error("unexpected character: {0}")]
    BadChar(char),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("cannot parse floating point literal: {0}")]
    BadFloatLiteral(String),
    #[error("unexpected token '{0}', expected '{1}'")]
    UnexpectedToken(String, String),
    #[error("expected expression")]
    ExpectedExpression,
    #[error("expected identifier")]
    ExpectedIdentifier,
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("'break' outside of a loop")]
    BreakOutsideLoop,
    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop,
    #[error("'return' outside of a function")]
    ReturnOutsideFunction,
    #[error("cannot read local variable '{0}' in its own initializer")]
    OwnInitializer(String),
    #[error("variable '{0}' already declared in this scope")]
    AlreadyDeclared(String),
    #[error("cannot return a value from an initializer")]
    ReturnFromInitializer,
    #[error("'this' cannot be used outside of a class method")]
    ThisOutsideClass,
    #[error("'super' cannot be used outside of a subclass method")]
    SuperOutsideSubclass,
    #[error("a class cannot inherit from itself")]
    InheritFromSelf,
}

/// The reporting sink: collects every static error of a run so that as many as possible are
/// surfaced at once.
#[derive(Debug, Default, PartialEq, Clone, Error)]
#[error("{}", render(.0))]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics(Vec::new())
    }

    pub fn report(&mut self, diag: Diagnostic) {
        tracing::debug!(line = diag.pos, "{}", diag);
        self.0.push(diag);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Kinds of the reported errors, in report order.
    pub fn errors(&self) -> Vec<&StaticError> {
        self.0.iter().map(|d| &d.error).collect()
    }
}

/// One diagnostic per line.
fn render(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
