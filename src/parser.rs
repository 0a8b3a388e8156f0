use std::rc::Rc;

use crate::ast::{BinaryOp, ClassDecl, Expr, FunctionDecl, Literal, LogicalOp, Stmt, UnaryOp};
use crate::ctx::Context;
use crate::diag::{Diagnostic, Diagnostics, Position, StaticError};
use crate::interner::Symbol;
use crate::token::{Located, Token};

/// Errors that abort the current declaration.  They are reported and the parser resynchronizes
/// on the next statement boundary.
type ParseResult<T> = Result<T, Diagnostic>;

/// Recursive descent parser with panic-mode error recovery.
#[derive(Debug)]
pub struct Parser<'d> {
    tokens: Vec<Located>,
    current: usize,
    ctx: Rc<Context>,
    diags: &'d mut Diagnostics,

    // Lexical nesting, used to reject misplaced `break`, `continue` and `return`.
    loop_depth: u32,
    function_depth: u32,
}

impl<'d> Parser<'d> {
    pub fn new(mut tokens: Vec<Located>, ctx: Rc<Context>, diags: &'d mut Diagnostics) -> Self {
        if tokens.last().map(|l| &l.token) != Some(&Token::Eof) {
            let pos = tokens.last().map_or(1, |l| l.pos);
            tokens.push(Located {
                token: Token::Eof,
                pos,
            });
        }
        Parser {
            tokens,
            current: 0,
            ctx,
            diags,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    /// Parse all declarations.  Declarations containing errors are reported and dropped.
    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                prg.push(stmt);
            }
        }
        tracing::debug!(count = prg.len(), "parsed statements");
        prg
    }

    #[cfg(test)]
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.expression()
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let res = match self.peek().token {
            Token::Class => {
                self.advance();
                self.class_decl()
            }
            Token::Fun => {
                self.advance();
                self.function().map(Stmt::Function)
            }
            Token::Var => {
                self.advance();
                self.var_decl()
            }
            _ => self.statement(),
        };
        match res {
            Ok(stmt) => Some(stmt),
            Err(diag) => {
                self.diags.report(diag);
                self.synchronize();
                None
            }
        }
    }

    /// Parse class declaration.
    /// `class` was already consumed.
    fn class_decl(&mut self) -> ParseResult<Stmt> {
        let (name, pos) = self.identifier()?;
        let superclass = if self.matches(&Token::Less) || self.matches(&Token::Colon) {
            let (name, pos) = self.identifier()?;
            Some(Expr::Variable {
                id: self.ctx.fresh_expr_id(),
                name,
                pos,
            })
        } else {
            None
        };

        self.consume(Token::LeftCurly)?;
        let mut methods = vec![];
        while !self.check(&Token::RightCurly) && !self.is_at_end() {
            methods.push(self.function()?);
        }
        self.consume(Token::RightCurly)?;

        Ok(Stmt::Class(ClassDecl {
            name,
            pos,
            superclass,
            methods,
        }))
    }

    /// Parse function or method declaration, `fun` excluded.
    fn function(&mut self) -> ParseResult<Rc<FunctionDecl>> {
        let (name, pos) = self.identifier()?;
        self.consume(Token::LeftParen)?;
        let mut params = vec![];
        if !self.check(&Token::RightParen) {
            loop {
                params.push(self.identifier()?.0);
                if !self.matches(&Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RightParen)?;
        let body = self.in_function(|p| p.block())?;
        Ok(Rc::new(FunctionDecl {
            name,
            pos,
            params,
            body,
        }))
    }

    /// Parse variable declaration.
    /// `var` was already consumed.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        let (name, pos) = self.identifier()?;
        let init = if self.matches(&Token::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Token::Semicolon)?;
        Ok(Stmt::Var { name, pos, init })
    }

    fn identifier(&mut self) -> ParseResult<(Symbol, Position)> {
        let located = self.peek();
        if let Token::Identifier(id) = &located.token {
            let res = (id.clone(), located.pos);
            self.advance();
            Ok(res)
        } else {
            Err(Diagnostic::at_token(located, StaticError::ExpectedIdentifier))
        }
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().token {
            Token::Print => {
                let pos = self.advance().pos;
                let mut exprs = vec![self.assignment()?];
                while self.matches(&Token::Comma) {
                    exprs.push(self.assignment()?);
                }
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Print { exprs, pos })
            }
            Token::LeftCurly => Ok(Stmt::Block(self.block()?)),
            Token::If => {
                self.advance();
                self.consume(Token::LeftParen)?;
                let cond = self.expression()?;
                self.consume(Token::RightParen)?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if self.matches(&Token::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            Token::While => {
                self.advance();
                self.consume(Token::LeftParen)?;
                let cond = self.expression()?;
                self.consume(Token::RightParen)?;
                let body = Box::new(self.in_loop(|p| p.statement())?);
                Ok(Stmt::While(cond, body))
            }
            Token::For => {
                self.advance();
                self.for_stmt()
            }
            Token::Break => {
                let keyword = self.advance();
                if self.loop_depth == 0 {
                    self.diags
                        .report(Diagnostic::at_token(&keyword, StaticError::BreakOutsideLoop));
                }
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Break)
            }
            Token::Continue => {
                let keyword = self.advance();
                if self.loop_depth == 0 {
                    self.diags.report(Diagnostic::at_token(
                        &keyword,
                        StaticError::ContinueOutsideLoop,
                    ));
                }
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Continue)
            }
            Token::Return => {
                let keyword = self.advance();
                if self.function_depth == 0 {
                    self.diags.report(Diagnostic::at_token(
                        &keyword,
                        StaticError::ReturnOutsideFunction,
                    ));
                }
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Return {
                    value,
                    pos: keyword.pos,
                })
            }
            _ => {
                let expr = self.expression()?;
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// `for` was already consumed.
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(Token::LeftParen)?;
        let init = if self.matches(&Token::Semicolon) {
            None
        } else if self.matches(&Token::Var) {
            Some(Box::new(self.var_decl()?))
        } else {
            let expr = self.expression()?;
            self.consume(Token::Semicolon)?;
            Some(Box::new(Stmt::Expr(expr)))
        };

        let cond = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::Semicolon)?;

        let incr = if self.check(&Token::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::RightParen)?;

        let body = Box::new(self.in_loop(|p| p.statement())?);
        Ok(Stmt::For {
            init,
            cond,
            incr,
            body,
        })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.consume(Token::LeftCurly)?;
        let mut stmts = vec![];
        while !self.check(&Token::RightCurly) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(Token::RightCurly)?;
        Ok(stmts)
    }

    fn in_loop<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.loop_depth += 1;
        let res = parse(self);
        self.loop_depth -= 1;
        res
    }

    /// Loops enclosing a function do not enclose its body.
    fn in_function<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let res = parse(self);
        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;
        res
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.assignment()?;
        while self.check(&Token::Comma) {
            let pos = self.advance().pos;
            expr = binary(expr, BinaryOp::Comma, self.assignment()?, pos);
        }
        Ok(expr)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.ternary()?;
        if !self.check(&Token::Equal) {
            return Ok(lhs);
        }

        let equal = self.advance();
        let value = Box::new(self.assignment()?);
        match lhs {
            Expr::Variable { id, name, pos } => Ok(Expr::Assign {
                id,
                name,
                value,
                pos,
            }),
            Expr::Get { object, name, pos } => Ok(Expr::Set {
                object,
                name,
                value,
                pos,
            }),
            Expr::ArrayGet { array, index, pos } => Ok(Expr::ArraySet {
                array,
                index,
                value,
                pos,
            }),
            lhs => {
                // Not worth resynchronizing: the right-hand side parsed fine.
                self.diags.report(Diagnostic::at_token(
                    &equal,
                    StaticError::InvalidAssignmentTarget,
                ));
                Ok(lhs)
            }
        }
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.logic_or()?;
        if !self.matches(&Token::Question) {
            return Ok(cond);
        }
        let then_branch = self.assignment()?;
        self.consume(Token::Colon)?;
        let else_branch = self.ternary()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.matches(&Token::Or) {
            expr = Expr::Logical {
                lhs: Box::new(expr),
                op: LogicalOp::Or,
                rhs: Box::new(self.logic_and()?),
            };
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&Token::And) {
            expr = Expr::Logical {
                lhs: Box::new(expr),
                op: LogicalOp::And,
                rhs: Box::new(self.equality()?),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().token {
                Token::EqualEqual => BinaryOp::Equal,
                Token::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let pos = self.advance().pos;
            expr = binary(expr, op, self.comparison()?, pos);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().token {
                Token::Less => BinaryOp::Less,
                Token::LessEqual => BinaryOp::LessEqual,
                Token::Greater => BinaryOp::Greater,
                Token::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let pos = self.advance().pos;
            expr = binary(expr, op, self.term()?, pos);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            let pos = self.advance().pos;
            expr = binary(expr, op, self.factor()?, pos);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            let pos = self.advance().pos;
            expr = binary(expr, op, self.unary()?, pos);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().token {
            Token::Minus => UnaryOp::Minus,
            Token::Bang => UnaryOp::Not,
            _ => return self.call(),
        };
        let pos = self.advance().pos;
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.unary()?),
            pos,
        })
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().token {
                Token::LeftParen => {
                    let pos = self.advance().pos;
                    let args = self.arguments(Token::RightParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        pos,
                    };
                }
                Token::Dot => {
                    self.advance();
                    let (name, pos) = self.identifier()?;
                    expr = Expr::Get {
                        object: Box::new(expr),
                        name,
                        pos,
                    };
                }
                Token::LeftSquare => {
                    let pos = self.advance().pos;
                    let index = self.expression()?;
                    self.consume(Token::RightSquare)?;
                    expr = Expr::ArrayGet {
                        array: Box::new(expr),
                        index: Box::new(index),
                        pos,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma separated assignment expressions up to and including `closing`.  Commas here are
    /// separators, not the comma operator.
    fn arguments(&mut self, closing: Token) -> ParseResult<Vec<Expr>> {
        let mut args = vec![];
        if !self.check(&closing) {
            loop {
                args.push(self.assignment()?);
                if !self.matches(&Token::Comma) {
                    break;
                }
            }
        }
        self.consume(closing)?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let located = self.advance();
        let expr = match located.token {
            Token::Nil => Expr::Literal(Literal::Nil),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::Number(n) => Expr::Literal(Literal::Number(n)),
            Token::Str(s) => Expr::Literal(Literal::Str(s)),
            Token::Identifier(name) => Expr::Variable {
                id: self.ctx.fresh_expr_id(),
                name,
                pos: located.pos,
            },
            Token::This => Expr::This {
                id: self.ctx.fresh_expr_id(),
                pos: located.pos,
            },
            Token::Super => {
                self.consume(Token::Dot)?;
                let (method, _) = self.identifier()?;
                Expr::Super {
                    id: self.ctx.fresh_expr_id(),
                    method,
                    pos: located.pos,
                }
            }
            Token::LeftParen => {
                let expr = self.expression()?;
                self.consume(Token::RightParen)?;
                Expr::Group(Box::new(expr))
            }
            Token::LeftSquare => Expr::Array(self.arguments(Token::RightSquare)?),
            token => {
                let located = Located {
                    token,
                    pos: located.pos,
                };
                // Leave the offending token for synchronization.
                if located.token != Token::Eof {
                    self.current -= 1;
                }
                return Err(Diagnostic::at_token(
                    &located,
                    StaticError::ExpectedExpression,
                ));
            }
        };
        Ok(expr)
    }

    /// Discard tokens until the probable start of the next statement.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token == Token::Semicolon {
                return;
            }
            match self.peek().token {
                Token::Class
                | Token::Fun
                | Token::Var
                | Token::For
                | Token::If
                | Token::While
                | Token::Print
                | Token::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn peek(&self) -> &Located {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Located {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token == Token::Eof
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek().token == *expected
    }

    /// Consume current token and return it.  Never moves past EOF.
    fn advance(&mut self) -> Located {
        let located = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        located
    }

    fn matches(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: Token) -> ParseResult<Located> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            let found = self.peek();
            Err(Diagnostic::at_token(
                found,
                StaticError::UnexpectedToken(found.token.to_string(), expected.to_string()),
            ))
        }
    }
}

fn binary(lhs: Expr, op: BinaryOp, rhs: Expr, pos: Position) -> Expr {
    Expr::Binary {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
        pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::{parenthesize, parenthesize_stmt};
    use crate::scanner::Scanner;

    fn parse_expr(input: &str) -> Result<String, Diagnostic> {
        let ctx = Context::new();
        let mut diags = Diagnostics::new();
        let tokens = Scanner::new(input, ctx.clone()).scan_tokens(&mut diags);
        let mut parser = Parser::new(tokens, ctx, &mut diags);
        let expr = parser.parse_expression()?;
        if let Some(diag) = diags.iter().next() {
            return Err(diag.clone());
        }
        Ok(parenthesize(&expr))
    }

    fn parse_prg_with_diags(input: &str) -> (Vec<String>, Diagnostics) {
        let ctx = Context::new();
        let mut diags = Diagnostics::new();
        let tokens = Scanner::new(input, ctx.clone()).scan_tokens(&mut diags);
        let prg = Parser::new(tokens, ctx, &mut diags).parse_program();
        (prg.iter().map(parenthesize_stmt).collect(), diags)
    }

    fn parse_prg(input: &str) -> Result<Vec<String>, Diagnostics> {
        let (prg, diags) = parse_prg_with_diags(input);
        if diags.is_empty() {
            Ok(prg)
        } else {
            Err(diags)
        }
    }

    fn errors_of(input: &str) -> Vec<StaticError> {
        parse_prg_with_diags(input)
            .1
            .errors()
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn number() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("42")?, "42");
        assert_eq!(parse_expr("4.5")?, "4.5");
        Ok(())
    }

    #[test]
    fn literals() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("true")?, "true");
        assert_eq!(parse_expr("false")?, "false");
        assert_eq!(parse_expr("nil")?, "nil");
        assert_eq!(parse_expr("\"hi\"")?, "\"hi\"");
        Ok(())
    }

    #[test]
    fn unary_operators() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("--42")?, "(- (- 42))");
        assert_eq!(parse_expr("!true")?, "(! true)");
        Ok(())
    }

    #[test]
    fn addition_is_left_associative() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("1 + 2 - 3")?, "(- (+ 1 2) 3)");
        Ok(())
    }

    #[test]
    fn factors_have_precedence_over_terms() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("1 + 2 * 3")?, "(+ 1 (* 2 3))");
        assert_eq!(parse_expr("1 / 2 - 3")?, "(- (/ 1 2) 3)");
        Ok(())
    }

    #[test]
    fn braced_expr_takes_precedence() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("1 * (2 + 3)")?, "(* 1 (group (+ 2 3)))");
        Ok(())
    }

    #[test]
    fn comparison_binds_tighter_than_equality() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("1 < 2 == 3 >= 4")?, "(== (< 1 2) (>= 3 4))");
        assert_eq!(parse_expr("1 == 2 != 3")?, "(!= (== 1 2) 3)");
        Ok(())
    }

    #[test]
    fn logical_operators() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("a or b and c")?, "(or a (and b c))");
        assert_eq!(parse_expr("a == b and c")?, "(and (== a b) c)");
        Ok(())
    }

    #[test]
    fn ternary_is_right_associative() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("a ? b : c ? d : e")?, "(?: a b (?: c d e))");
        assert_eq!(parse_expr("a or b ? 1 : 2")?, "(?: (or a b) 1 2)");
        Ok(())
    }

    #[test]
    fn comma_operator_has_lowest_precedence() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("a = 1, b = 2")?, "(, (= a 1) (= b 2))");
        Ok(())
    }

    #[test]
    fn missing_right_paren() {
        match parse_expr("(1") {
            Err(Diagnostic { pos, at, error })
                if pos == 1
                    && at.as_deref() == Some("end")
                    && error
                        == StaticError::UnexpectedToken("EOF".to_string(), ")".to_string()) => {}
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn assignment_is_right_associative() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("a = b = 1")?, "(= a (= b 1))");
        Ok(())
    }

    #[test]
    fn property_and_index_assignment() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("a.b.c = 1")?, "(.= (. a b) c 1)");
        assert_eq!(parse_expr("a[0][1] = 2")?, "([]= ([] a 0) 1 2)");
        Ok(())
    }

    #[test]
    fn bad_assignment_lhs_is_reported_at_equal() {
        let (prg, diags) = parse_prg_with_diags("1 + a = b; print 2;");
        let diag = diags.iter().next().cloned();
        assert_eq!(
            diag,
            Some(Diagnostic {
                pos: 1,
                at: Some("'='".to_string()),
                error: StaticError::InvalidAssignmentTarget,
            })
        );
        // The parser stays synchronized.
        assert_eq!(prg, vec!["(; (+ 1 a))", "(print 2)"]);
    }

    #[test]
    fn calls_properties_and_indexes_chain() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("f(1)(2)")?, "(call (call f 1) 2)");
        assert_eq!(parse_expr("a.b(c)[d]")?, "([] (call (. a b) c) d)");
        assert_eq!(parse_expr("foo()")?, "(call foo)");
        Ok(())
    }

    #[test]
    fn call_arguments_are_not_comma_expressions() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("f(1, 2)")?, "(call f 1 2)");
        assert_eq!(parse_expr("f((1, 2))")?, "(call f (group (, 1 2)))");
        Ok(())
    }

    #[test]
    fn array_literals() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("[]")?, "(array)");
        assert_eq!(parse_expr("[1, [2], \"x\"]")?, "(array 1 (array 2) \"x\")");
        Ok(())
    }

    #[test]
    fn this_and_super() -> Result<(), Diagnostic> {
        assert_eq!(parse_expr("this.x")?, "(. this x)");
        assert_eq!(parse_expr("super.init(1)")?, "(call (super init) 1)");
        Ok(())
    }

    #[test]
    fn print_takes_a_list() -> Result<(), Diagnostics> {
        assert_eq!(parse_prg("print 1, 2 + 3;")?, vec!["(print 1 (+ 2 3))"]);
        Ok(())
    }

    #[test]
    fn var_decl() -> Result<(), Diagnostics> {
        assert_eq!(
            parse_prg("var foo; var bar = 2 * 3.14;")?,
            vec!["(var foo)", "(var bar (* 2 3.14))"]
        );
        Ok(())
    }

    #[test]
    fn blocks() -> Result<(), Diagnostics> {
        assert_eq!(parse_prg("{ }")?, vec!["(block)"]);
        assert_eq!(parse_prg("{ 1; 2; }")?, vec!["(block (; 1) (; 2))"]);
        Ok(())
    }

    #[test]
    fn if_else_stmt() -> Result<(), Diagnostics> {
        assert_eq!(parse_prg("if (true) 1;")?, vec!["(if true (; 1))"]);
        assert_eq!(
            parse_prg("if (true) 1; else 2;")?,
            vec!["(if true (; 1) (; 2))"]
        );
        Ok(())
    }

    #[test]
    fn loops() -> Result<(), Diagnostics> {
        assert_eq!(
            parse_prg("while (true) break;")?,
            vec!["(while true (break))"]
        );
        assert_eq!(
            parse_prg("for (var i = 0; i < 3; i = i + 1) continue;")?,
            vec!["(for (var i 0) (< i 3) (= i (+ i 1)) (continue))"]
        );
        assert_eq!(parse_prg("for (;;) {}")?, vec!["(for nil nil nil (block))"]);
        Ok(())
    }

    #[test]
    fn functions() -> Result<(), Diagnostics> {
        assert_eq!(
            parse_prg("fun foo(a, b) { return a; }")?,
            vec!["(fun foo (a b) (return a))"]
        );
        assert_eq!(parse_prg("fun f() { return; }")?, vec!["(fun f () (return))"]);
        Ok(())
    }

    #[test]
    fn classes() -> Result<(), Diagnostics> {
        assert_eq!(
            parse_prg("class A { init(x) { this.x = x; } get() { return this.x; } }")?,
            vec!["(class A (fun init (x) (; (.= this x x))) (fun get () (return (. this x))))"]
        );
        assert_eq!(parse_prg("class B < A {}")?, vec!["(class B < A)"]);
        assert_eq!(parse_prg("class B : A {}")?, vec!["(class B < A)"]);
        Ok(())
    }

    #[test]
    fn break_and_continue_outside_loop() {
        assert_eq!(errors_of("break;"), vec![StaticError::BreakOutsideLoop]);
        assert_eq!(errors_of("continue;"), vec![StaticError::ContinueOutsideLoop]);
        assert_eq!(errors_of("while (true) { if (true) break; }"), vec![]);
    }

    #[test]
    fn loop_does_not_extend_into_nested_function() {
        assert_eq!(
            errors_of("while (true) { fun f() { break; } }"),
            vec![StaticError::BreakOutsideLoop]
        );
        // Depth is restored after the function body.
        assert_eq!(errors_of("while (true) { fun f() {} break; }"), vec![]);
    }

    #[test]
    fn return_outside_function() {
        assert_eq!(errors_of("return 1;"), vec![StaticError::ReturnOutsideFunction]);
        assert_eq!(errors_of("fun f() { { return 1; } }"), vec![]);
    }

    #[test]
    fn depth_is_restored_after_error_in_loop_body() {
        assert_eq!(
            errors_of("while (true) print ; break;"),
            vec![
                StaticError::ExpectedExpression,
                StaticError::BreakOutsideLoop
            ]
        );
    }

    #[test]
    fn recovery_reports_one_error_per_statement() {
        let (prg, diags) = parse_prg_with_diags("var = 1; print 2; var x = ; print 3;");
        assert_eq!(
            diags.errors(),
            vec![
                &StaticError::ExpectedIdentifier,
                &StaticError::ExpectedExpression
            ]
        );
        assert_eq!(prg, vec!["(print 2)", "(print 3)"]);
    }

    #[test]
    fn recovery_inside_block() {
        let (prg, diags) = parse_prg_with_diags("{ print ; print 1; }");
        assert_eq!(diags.len(), 1);
        assert_eq!(prg, vec!["(block (print 1))"]);
    }
}
