//! Debug renderings of the syntax tree.
//!
//! `parenthesize` produces a Lisp-like prefix form, `rpn` a reverse Polish form.  Neither has any
//! influence on evaluation.

use crate::ast::{Expr, Literal, Stmt, UnaryOp};

/// Render an expression in fully parenthesized prefix form, e.g. `(+ 1 (* 2 3))`.
pub fn parenthesize(expr: &Expr) -> String {
    match expr {
        Expr::Literal(lit) => literal(lit),
        Expr::Variable { name, .. } => name.to_string(),
        Expr::Assign { name, value, .. } => list("=", [name.to_string(), parenthesize(value)]),
        Expr::Binary { lhs, op, rhs, .. } => {
            list(op.lexeme(), [parenthesize(lhs), parenthesize(rhs)])
        }
        Expr::Logical { lhs, op, rhs } => {
            list(op.lexeme(), [parenthesize(lhs), parenthesize(rhs)])
        }
        Expr::Unary { op, operand, .. } => list(op.lexeme(), [parenthesize(operand)]),
        Expr::Group(inner) => list("group", [parenthesize(inner)]),
        Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => list(
            "?:",
            [
                parenthesize(cond),
                parenthesize(then_branch),
                parenthesize(else_branch),
            ],
        ),
        Expr::Call { callee, args, .. } => list(
            "call",
            std::iter::once(parenthesize(callee)).chain(args.iter().map(parenthesize)),
        ),
        Expr::Get { object, name, .. } => list(".", [parenthesize(object), name.to_string()]),
        Expr::Set {
            object,
            name,
            value,
            ..
        } => list(
            ".=",
            [parenthesize(object), name.to_string(), parenthesize(value)],
        ),
        Expr::ArrayGet { array, index, .. } => {
            list("[]", [parenthesize(array), parenthesize(index)])
        }
        Expr::ArraySet {
            array,
            index,
            value,
            ..
        } => list(
            "[]=",
            [parenthesize(array), parenthesize(index), parenthesize(value)],
        ),
        Expr::Array(elements) => list("array", elements.iter().map(parenthesize)),
        Expr::This { .. } => "this".to_string(),
        Expr::Super { method, .. } => list("super", [method.to_string()]),
    }
}

/// Render a statement in the same prefix form as `parenthesize`.
pub fn parenthesize_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr(expr) => list(";", [parenthesize(expr)]),
        Stmt::Print { exprs, .. } => list("print", exprs.iter().map(parenthesize)),
        Stmt::Var { name, init, .. } => list(
            "var",
            std::iter::once(name.to_string()).chain(init.iter().map(parenthesize)),
        ),
        Stmt::Block(stmts) => list("block", stmts.iter().map(parenthesize_stmt)),
        Stmt::If(cond, then_branch, else_branch) => list(
            "if",
            [parenthesize(cond), parenthesize_stmt(then_branch)]
                .into_iter()
                .chain(else_branch.iter().map(|s| parenthesize_stmt(s))),
        ),
        Stmt::While(cond, body) => list("while", [parenthesize(cond), parenthesize_stmt(body)]),
        Stmt::For {
            init,
            cond,
            incr,
            body,
        } => list(
            "for",
            [
                init.as_ref()
                    .map_or_else(|| "nil".to_string(), |s| parenthesize_stmt(s)),
                cond.as_ref().map_or_else(|| "nil".to_string(), parenthesize),
                incr.as_ref().map_or_else(|| "nil".to_string(), parenthesize),
                parenthesize_stmt(body),
            ],
        ),
        Stmt::Break => "(break)".to_string(),
        Stmt::Continue => "(continue)".to_string(),
        Stmt::Function(decl) => function("fun", decl),
        Stmt::Return { value, .. } => list("return", value.iter().map(parenthesize)),
        Stmt::Class(decl) => {
            let mut header = vec![decl.name.to_string()];
            if let Some(superclass) = &decl.superclass {
                header.push("<".to_string());
                header.push(parenthesize(superclass));
            }
            list(
                "class",
                header
                    .into_iter()
                    .chain(decl.methods.iter().map(|m| function("fun", m))),
            )
        }
    }
}

/// Render an expression in reverse Polish notation, e.g. `1 2 3 * +`.  Unary minus is written
/// `~` to tell it apart from subtraction; groupings vanish.
pub fn rpn(expr: &Expr) -> String {
    match expr {
        Expr::Literal(lit) => literal(lit),
        Expr::Variable { name, .. } => name.to_string(),
        Expr::Assign { name, value, .. } => postfix("=", [name.to_string(), rpn(value)]),
        Expr::Binary { lhs, op, rhs, .. } => postfix(op.lexeme(), [rpn(lhs), rpn(rhs)]),
        Expr::Logical { lhs, op, rhs } => postfix(op.lexeme(), [rpn(lhs), rpn(rhs)]),
        Expr::Unary {
            op: UnaryOp::Minus,
            operand,
            ..
        } => postfix("~", [rpn(operand)]),
        Expr::Unary { op, operand, .. } => postfix(op.lexeme(), [rpn(operand)]),
        Expr::Group(inner) => rpn(inner),
        Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => postfix("?", [rpn(cond), rpn(then_branch), rpn(else_branch)]),
        Expr::Call { callee, args, .. } => postfix(
            "call",
            std::iter::once(rpn(callee)).chain(args.iter().map(rpn)),
        ),
        Expr::Get { object, name, .. } => postfix(".", [rpn(object), name.to_string()]),
        Expr::Set {
            object,
            name,
            value,
            ..
        } => postfix(".=", [rpn(object), name.to_string(), rpn(value)]),
        Expr::ArrayGet { array, index, .. } => postfix("[]", [rpn(array), rpn(index)]),
        Expr::ArraySet {
            array,
            index,
            value,
            ..
        } => postfix("[]=", [rpn(array), rpn(index), rpn(value)]),
        Expr::Array(elements) => postfix("array", elements.iter().map(rpn)),
        Expr::This { .. } => "this".to_string(),
        Expr::Super { method, .. } => postfix("super", [method.to_string()]),
    }
}

fn function(head: &str, decl: &crate::ast::FunctionDecl) -> String {
    let params = format!(
        "({})",
        decl.params
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(" ")
    );
    list(
        head,
        [decl.name.to_string(), params]
            .into_iter()
            .chain(decl.body.iter().map(parenthesize_stmt)),
    )
}

fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Nil => "nil".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => n.to_string(),
        Literal::Str(s) => format!("\"{}\"", s),
    }
}

fn list(head: &str, items: impl IntoIterator<Item = String>) -> String {
    let mut out = format!("({}", head);
    for item in items {
        out.push(' ');
        out.push_str(&item);
    }
    out.push(')');
    out
}

fn postfix(head: &str, items: impl IntoIterator<Item = String>) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&item);
        out.push(' ');
    }
    out.push_str(head);
    out
}
