//! Static resolution of local variables.
//!
//! Computes, for each variable reference, how many scopes separate it from its binding.  The
//! result is a side table keyed by expression id; references absent from it are globals.

use std::collections::HashMap;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::ctx::Context;
use crate::diag::{Diagnostic, Diagnostics, Position, StaticError};
use crate::interner::Symbol;

/// Scope distance of every resolved local reference.
pub type Locals = HashMap<ExprId, usize>;

#[derive(Debug, Copy, Clone, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

#[derive(Debug)]
pub struct Resolver<'d> {
    // `false` while declared but not yet defined.
    scopes: Vec<HashMap<Symbol, bool>>,
    locals: Locals,
    function: FunctionKind,
    class: ClassKind,
    diags: &'d mut Diagnostics,
    this_sym: Symbol,
    super_sym: Symbol,
    init_sym: Symbol,
}

impl<'d> Resolver<'d> {
    pub fn new(ctx: &Context, diags: &'d mut Diagnostics) -> Self {
        Resolver {
            scopes: vec![],
            locals: HashMap::new(),
            function: FunctionKind::None,
            class: ClassKind::None,
            diags,
            this_sym: ctx.symbol("this"),
            super_sym: ctx.symbol("super"),
            init_sym: ctx.symbol("init"),
        }
    }

    /// Resolve a whole program and return the side table.
    pub fn resolve(mut self, stmts: &[Stmt]) -> Locals {
        self.resolve_stmts(stmts);
        tracing::debug!(count = self.locals.len(), "resolved locals");
        self.locals
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.resolve_expr(expr),
            Stmt::Print { exprs, .. } => exprs.iter().for_each(|e| self.resolve_expr(e)),
            Stmt::Var { name, pos, init } => {
                self.declare(name, *pos);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            Stmt::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(cond, body) => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }
            Stmt::For {
                init,
                cond,
                incr,
                body,
            } => {
                // The loop variable lives in its own scope, mirrored by the evaluator.
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                if let Some(incr) = incr {
                    self.resolve_expr(incr);
                }
                self.resolve_stmt(body);
                self.end_scope();
            }
            Stmt::Break | Stmt::Continue => (),
            Stmt::Function(decl) => {
                self.declare(&decl.name, decl.pos);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return { value, pos } => {
                if let Some(value) = value {
                    if self.function == FunctionKind::Initializer {
                        self.error(*pos, StaticError::ReturnFromInitializer);
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(decl) => self.resolve_class(decl),
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.class;
        self.class = ClassKind::Class;

        self.declare(&decl.name, decl.pos);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if let Expr::Variable { name, pos, .. } = superclass {
                if *name == decl.name {
                    self.error(*pos, StaticError::InheritFromSelf);
                }
            }
            self.class = ClassKind::Subclass;
            self.resolve_expr(superclass);
            self.begin_scope();
            self.bind(self.super_sym.clone());
        }

        self.begin_scope();
        self.bind(self.this_sym.clone());
        for method in &decl.methods {
            let kind = if method.name == self.init_sym {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }
        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = self.function;
        self.function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param, decl.pos);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => (),
            Expr::Variable { id, name, pos } => {
                if self.scopes.last().and_then(|s| s.get(name)) == Some(&false) {
                    self.error(*pos, StaticError::OwnInitializer(name.to_string()));
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value, .. } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Unary { operand, .. } => self.resolve_expr(operand),
            Expr::Group(inner) => self.resolve_expr(inner),
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                args.iter().for_each(|a| self.resolve_expr(a));
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::ArrayGet { array, index, .. } => {
                self.resolve_expr(array);
                self.resolve_expr(index);
            }
            Expr::ArraySet {
                array,
                index,
                value,
                ..
            } => {
                self.resolve_expr(value);
                self.resolve_expr(array);
                self.resolve_expr(index);
            }
            Expr::Array(elements) => elements.iter().for_each(|e| self.resolve_expr(e)),
            Expr::This { id, pos } => {
                if self.class == ClassKind::None {
                    self.error(*pos, StaticError::ThisOutsideClass);
                    return;
                }
                let this = self.this_sym.clone();
                self.resolve_local(*id, &this);
            }
            Expr::Super { id, pos, .. } => {
                if self.class != ClassKind::Subclass {
                    self.error(*pos, StaticError::SuperOutsideSubclass);
                    return;
                }
                let sup = self.super_sym.clone();
                self.resolve_local(*id, &sup);
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Symbol) {
        if let Some(distance) = self.scopes.iter().rev().position(|s| s.contains_key(name)) {
            self.locals.insert(id, distance);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Symbol, pos: Position) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.insert(name.clone(), false).is_some() {
            self.error(pos, StaticError::AlreadyDeclared(name.to_string()));
        }
    }

    fn define(&mut self, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), true);
        }
    }

    /// Declare and define an implicit binding (`this`, `super`) in the innermost scope.
    fn bind(&mut self, name: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn error(&mut self, pos: Position, error: StaticError) {
        self.diags.report(Diagnostic::at_line(pos, error));
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(input: &str) -> (Vec<Stmt>, Locals, Diagnostics) {
        resolve_with_ctx(&Context::new(), input)
    }

    fn resolve_with_ctx(ctx: &Rc<Context>, input: &str) -> (Vec<Stmt>, Locals, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tokens = Scanner::new(input, ctx.clone()).scan_tokens(&mut diags);
        let prg = Parser::new(tokens, ctx.clone(), &mut diags).parse_program();
        assert!(diags.is_empty(), "parse errors: {}", diags);
        let locals = Resolver::new(ctx, &mut diags).resolve(&prg);
        (prg, locals, diags)
    }

    fn errors_of(input: &str) -> Vec<StaticError> {
        resolve(input).2.errors().into_iter().cloned().collect()
    }

    /// Distances of variable reads named `name`, in source order.
    fn distances_of(input: &str, name: &str) -> Vec<Option<usize>> {
        let (prg, locals, diags) = resolve(input);
        assert!(diags.is_empty(), "resolve errors: {}", diags);
        let mut out = vec![];
        collect_reads(&prg, name, &locals, &mut out);
        out
    }

    fn collect_reads(stmts: &[Stmt], name: &str, locals: &Locals, out: &mut Vec<Option<usize>>) {
        for stmt in stmts {
            match stmt {
                Stmt::Print { exprs, .. } => {
                    for e in exprs {
                        if let Expr::Variable { id, name: n, .. } = e {
                            if n.name() == name {
                                out.push(locals.get(id).copied());
                            }
                        }
                    }
                }
                Stmt::Block(inner) => collect_reads(inner, name, locals, out),
                Stmt::Function(decl) => collect_reads(&decl.body, name, locals, out),
                _ => (),
            }
        }
    }

    #[test]
    fn globals_are_not_in_side_table() {
        assert_eq!(distances_of("var a = 1; print a;", "a"), vec![None]);
    }

    #[test]
    fn distance_counts_crossed_scopes() {
        let prg = "{ var a = 1; print a; { print a; { print a; } } }";
        assert_eq!(
            distances_of(prg, "a"),
            vec![Some(0), Some(1), Some(2)]
        );
    }

    #[test]
    fn function_parameters_and_closures() {
        let prg = "fun f(a) { print a; fun g() { print a; } }";
        assert_eq!(distances_of(prg, "a"), vec![Some(0), Some(1)]);
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let prg = "{ var a = 1; { var a = 2; print a; } print a; }";
        assert_eq!(distances_of(prg, "a"), vec![Some(0), Some(0)]);
    }

    #[test]
    fn own_initializer_in_local_scope() {
        assert_eq!(
            errors_of("var a = 1; { var a = a; }"),
            vec![StaticError::OwnInitializer("a".to_string())]
        );
    }

    #[test]
    fn own_initializer_is_legal_at_global_scope() {
        assert_eq!(errors_of("var a = a;"), vec![]);
    }

    #[test]
    fn redeclaration_in_same_local_scope() {
        assert_eq!(
            errors_of("{ var a = 1; var a = 2; }"),
            vec![StaticError::AlreadyDeclared("a".to_string())]
        );
        assert_eq!(errors_of("var a = 1; var a = 2;"), vec![]);
        assert_eq!(
            errors_of("fun f(a, a) {}"),
            vec![StaticError::AlreadyDeclared("a".to_string())]
        );
    }

    #[test]
    fn return_value_from_initializer() {
        assert_eq!(
            errors_of("class A { init() { return 1; } }"),
            vec![StaticError::ReturnFromInitializer]
        );
        assert_eq!(errors_of("class A { init() { return; } }"), vec![]);
        assert_eq!(errors_of("class A { m() { return 1; } }"), vec![]);
    }

    #[test]
    fn this_outside_class() {
        assert_eq!(errors_of("print this;"), vec![StaticError::ThisOutsideClass]);
        assert_eq!(
            errors_of("fun f() { return this; }"),
            vec![StaticError::ThisOutsideClass]
        );
        assert_eq!(errors_of("class A { m() { return this; } }"), vec![]);
    }

    #[test]
    fn super_outside_subclass() {
        assert_eq!(
            errors_of("class A { m() { return super.m(); } }"),
            vec![StaticError::SuperOutsideSubclass]
        );
        assert_eq!(
            errors_of("super.m();"),
            vec![StaticError::SuperOutsideSubclass]
        );
        assert_eq!(
            errors_of("class A {} class B < A { m() { return super.m(); } }"),
            vec![]
        );
    }

    #[test]
    fn class_cannot_inherit_from_itself() {
        assert_eq!(errors_of("class A < A {}"), vec![StaticError::InheritFromSelf]);
    }

    #[test]
    fn errors_do_not_stop_resolution() {
        assert_eq!(
            errors_of("print this; { var a = 1; var a = 2; }"),
            vec![
                StaticError::ThisOutsideClass,
                StaticError::AlreadyDeclared("a".to_string())
            ]
        );
    }

    #[test]
    fn super_and_this_distances_in_methods() {
        let (prg, locals, diags) =
            resolve("class A {} class B < A { m() { this; super.m; } }");
        assert!(diags.is_empty());
        let Stmt::Class(decl) = &prg[1] else {
            panic!("expected class");
        };
        let body = &decl.methods[0].body;
        match (&body[0], &body[1]) {
            (
                Stmt::Expr(Expr::This { id: this_id, .. }),
                Stmt::Expr(Expr::Super { id: super_id, .. }),
            ) => {
                // method params scope -> this scope -> super scope
                assert_eq!(locals.get(this_id), Some(&1));
                assert_eq!(locals.get(super_id), Some(&2));
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn this_captured_by_closure_in_method() {
        let (prg, locals, diags) = resolve("class A { m() { fun f() { return this; } } }");
        assert!(diags.is_empty());
        let Stmt::Class(decl) = &prg[0] else {
            panic!("expected class");
        };
        let Stmt::Function(f) = &decl.methods[0].body[0] else {
            panic!("expected function");
        };
        match &f.body[0] {
            Stmt::Return {
                value: Some(Expr::This { id, .. }),
                ..
            } => assert_eq!(locals.get(id), Some(&2)),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let ctx = Context::new();
        let (prg, first, _) = resolve_with_ctx(
            &ctx,
            "fun counter() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }
             class A { init(x) { this.x = x; } } { var a = A(1); print a.x; }",
        );
        let mut diags = Diagnostics::new();
        let second = Resolver::new(&ctx, &mut diags).resolve(&prg);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
