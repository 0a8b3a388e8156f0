use std::rc::Rc;

use crate::diag::Position;
use crate::interner::Symbol;

/// Identity of an expression node, used as key in the resolver's side table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Expr(Expr),
    Print {
        exprs: Vec<Expr>,
        pos: Position,
    },
    Var {
        name: Symbol,
        pos: Position,
        init: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        incr: Option<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Function(Rc<FunctionDecl>),
    Return {
        value: Option<Expr>,
        pos: Position,
    },
    Class(ClassDecl),
}

#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub pos: Position,
    pub params: Vec<Symbol>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassDecl {
    pub name: Symbol,
    pub pos: Position,
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunctionDecl>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Literal),
    Variable {
        id: ExprId,
        name: Symbol,
        pos: Position,
    },
    Assign {
        id: ExprId,
        name: Symbol,
        value: Box<Expr>,
        pos: Position,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
        pos: Position,
    },
    Logical {
        lhs: Box<Expr>,
        op: LogicalOp,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Position,
    },
    Group(Box<Expr>),
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        pos: Position,
    },
    Get {
        object: Box<Expr>,
        name: Symbol,
        pos: Position,
    },
    Set {
        object: Box<Expr>,
        name: Symbol,
        value: Box<Expr>,
        pos: Position,
    },
    ArrayGet {
        array: Box<Expr>,
        index: Box<Expr>,
        pos: Position,
    },
    ArraySet {
        array: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        pos: Position,
    },
    Array(Vec<Expr>),
    This {
        id: ExprId,
        pos: Position,
    },
    Super {
        id: ExprId,
        method: Symbol,
        pos: Position,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Comma,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl BinaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Comma => ",",
        }
    }
}

impl LogicalOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

impl UnaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
        }
    }
}
