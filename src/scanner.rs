//! Lexical analyzer

use std::rc::Rc;
use std::str::Chars;

use crate::ctx::Context;
use crate::diag::{Diagnostic, Diagnostics, Position, StaticError};
use crate::token::{Located, Token};

/// Turn source text into sequence of tokens.
#[derive(Debug)]
pub struct Scanner<'a> {
    input: Chars<'a>,
    line: Position,
    ctx: Rc<Context>,

    // Buffer used when scanning longer tokens.  Allocated here to reuse memory.
    buf: String,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner operating on `input`.
    pub fn new(input: &'a str, ctx: Rc<Context>) -> Scanner<'a> {
        Scanner {
            input: input.chars(),
            line: 1,
            ctx,
            buf: String::new(),
        }
    }

    /// Scan the whole input.
    ///
    /// Errors are reported to `diags` and scanning resumes after them.  The returned sequence
    /// always ends with `Token::Eof`.
    pub fn scan_tokens(mut self, diags: &mut Diagnostics) -> Vec<Located> {
        let mut tokens = vec![];
        loop {
            match self.get_token() {
                Ok(located) => {
                    let at_end = located.token == Token::Eof;
                    tokens.push(located);
                    if at_end {
                        break;
                    }
                }
                Err(diag) => diags.report(diag),
            }
        }
        tracing::debug!(count = tokens.len(), "scanned tokens");
        tokens
    }

    /// Scan next token and return it.
    pub fn get_token(&mut self) -> Result<Located, Diagnostic> {
        let token = self.get_raw_token()?;
        Ok(Located {
            token,
            pos: self.line,
        })
    }

    fn get_raw_token(&mut self) -> Result<Token, Diagnostic> {
        loop {
            let ch = match self.input.next() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };
            match ch {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => (),
                '+' => return Ok(Token::Plus),
                '-' => return Ok(Token::Minus),
                '*' => return Ok(Token::Star),
                '/' => match self.peek() {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => {
                        self.input.next();
                        self.skip_block_comment()?;
                    }
                    _ => return Ok(Token::Slash),
                },
                '(' => return Ok(Token::LeftParen),
                ')' => return Ok(Token::RightParen),
                '{' => return Ok(Token::LeftCurly),
                '}' => return Ok(Token::RightCurly),
                '[' => return Ok(Token::LeftSquare),
                ']' => return Ok(Token::RightSquare),
                ';' => return Ok(Token::Semicolon),
                ',' => return Ok(Token::Comma),
                '.' => return Ok(Token::Dot),
                '?' => return Ok(Token::Question),
                ':' => return Ok(Token::Colon),
                '<' => return Ok(self.either('=', Token::LessEqual, Token::Less)),
                '>' => return Ok(self.either('=', Token::GreaterEqual, Token::Greater)),
                '=' => return Ok(self.either('=', Token::EqualEqual, Token::Equal)),
                '!' => return Ok(self.either('=', Token::BangEqual, Token::Bang)),
                '"' => return self.scan_string(),
                '0'..='9' => return self.scan_number(ch),
                'a'..='z' | 'A'..='Z' | '_' => return Ok(self.scan_identifier(ch)),
                _ => return Err(Diagnostic::at_line(self.line, StaticError::BadChar(ch))),
            }
        }
    }

    /// Return `matched` and consume the next character if it is `next`, else `single`.
    fn either(&mut self, next: char, matched: Token, single: Token) -> Token {
        if self.peek() == Some(next) {
            self.input.next();
            matched
        } else {
            single
        }
    }

    fn scan_number(&mut self, first_digit: char) -> Result<Token, Diagnostic> {
        self.buf.clear();
        self.buf.push(first_digit);
        self.take_digits();

        // A trailing dot is not part of the number: `1.` scans as `1` then `.`.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|ch| ch.is_ascii_digit()) {
            self.input.next();
            self.buf.push('.');
            self.take_digits();
        }

        self.buf.parse::<f64>().map(Token::Number).map_err(|_| {
            Diagnostic::at_line(self.line, StaticError::BadFloatLiteral(self.buf.clone()))
        })
    }

    fn take_digits(&mut self) {
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            self.input.next();
            self.buf.push(ch);
        }
    }

    /// Strings are raw: no escape sequences, may span lines.  An unterminated string swallows
    /// the rest of the input.
    fn scan_string(&mut self) -> Result<Token, Diagnostic> {
        self.buf.clear();
        loop {
            match self.input.next() {
                None => {
                    return Err(Diagnostic::at_line(
                        self.line,
                        StaticError::UnterminatedString,
                    ))
                }
                Some('"') => return Ok(Token::Str(Rc::from(self.buf.as_str()))),
                Some(ch) => {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    self.buf.push(ch);
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek().is_some_and(|ch| ch != '\n') {
            self.input.next();
        }
    }

    /// Skip a block comment whose opening `/*` was already consumed.  Block comments nest.
    fn skip_block_comment(&mut self) -> Result<(), Diagnostic> {
        let mut depth = 1;
        while depth > 0 {
            match self.input.next() {
                None => {
                    return Err(Diagnostic::at_line(
                        self.line,
                        StaticError::UnterminatedComment,
                    ))
                }
                Some('\n') => self.line += 1,
                Some('/') if self.peek() == Some('*') => {
                    self.input.next();
                    depth += 1;
                }
                Some('*') if self.peek() == Some('/') => {
                    self.input.next();
                    depth -= 1;
                }
                Some(_) => (),
            }
        }
        Ok(())
    }

    fn scan_identifier(&mut self, first_char: char) -> Token {
        self.buf.clear();
        self.buf.push(first_char);
        while let Some(ch) = self
            .peek()
            .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            self.input.next();
            self.buf.push(ch);
        }

        let sym = self.ctx.symbol(&self.buf);
        self.ctx.keyword(&sym).unwrap_or(Token::Identifier(sym))
    }

    fn peek(&self) -> Option<char> {
        self.input.clone().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.clone().nth(1)
    }
}
