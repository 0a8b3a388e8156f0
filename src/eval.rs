//! Tree-walk evaluator.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{BinaryOp, ClassDecl, Expr, ExprId, Literal, LogicalOp, Stmt, UnaryOp};
use crate::ctx::Context;
use crate::diag::Position;
use crate::interner::Symbol;
use crate::resolver::Locals;

mod env;
mod value;

use env::Env;
pub use value::Value;
use value::{Class, Function, Instance, Native, NativeBody};

/// Error raised while executing a program, tagged with the line of the offending token.
#[derive(Debug, Error)]
#[error("[line {line}] {kind}")]
pub struct RuntimeError {
    pub line: Position,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    fn new(line: Position, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError { line, kind }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("operands must be numbers")]
    OperandsNotNumbers,
    #[error("operand must be a number")]
    OperandNotNumber,
    #[error("operands must be two numbers or two strings")]
    OperandsMismatch,
    #[error("division by zero")]
    DivByZero,
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("can only call functions and classes")]
    NotCallable,
    #[error("expected {expected} arguments but got {found}")]
    Arity { expected: usize, found: usize },
    #[error("only instances have properties")]
    PropertyOfNonInstance,
    #[error("only instances have fields")]
    FieldOfNonInstance,
    #[error("undefined property '{0}'")]
    UndefinedProperty(String),
    #[error("superclass must be a class")]
    SuperclassNotClass,
    #[error("only arrays can be indexed")]
    NotAnArray,
    #[error("index must be an integer")]
    IndexNotInteger,
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: f64, len: usize },
    #[error("{function}() expects {expected}")]
    BadArgument {
        function: &'static str,
        expected: &'static str,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How control leaves a statement.
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type EvalResult<T> = Result<T, RuntimeError>;

#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
    locals: Locals,
    this_sym: Symbol,
    super_sym: Symbol,
    init_sym: Symbol,
}

impl<'t, W: Write> Evaluator<'t, W> {
    pub fn new(output: &'t mut W, ctx: &Context) -> Evaluator<'t, W> {
        let globals = Env::new();
        add_native(&globals, ctx.symbol("len"), 1, native_len);
        add_native(&globals, ctx.symbol("push"), 2, native_push);
        Evaluator {
            output,
            globals,
            locals: Locals::new(),
            this_sym: ctx.symbol("this"),
            super_sym: ctx.symbol("super"),
            init_sym: ctx.symbol("init"),
        }
    }

    /// Record the scope distances computed by the resolver.  Tables of successive sessions
    /// accumulate because closures created earlier may still run.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Execute top-level statements in the global environment, stopping at the first runtime
    /// error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        let globals = self.globals.clone();
        for stmt in stmts {
            match self.eval_stmt(stmt, &globals)? {
                Flow::Normal => (),
                flow => tracing::warn!(?flow, "control flow escaped to top level"),
            }
        }
        Ok(())
    }

    fn eval_block(&mut self, stmts: &[Stmt], env: &Rc<Env>) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.eval_stmt(stmt, env)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print { exprs, pos } => {
                let mut words = Vec::with_capacity(exprs.len());
                for e in exprs {
                    words.push(self.eval_expr(e, env)?.to_string());
                }
                writeln!(self.output, "{}", words.join(" "))
                    .map_err(|e| RuntimeError::new(*pos, e.into()))?;
            }
            Stmt::Var { name, init, .. } => {
                let val = match init {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                env.define(name, val);
            }
            Stmt::Block(stmts) => return self.eval_block(stmts, &Env::with_parent(env.clone())),
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    return self.eval_stmt(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.eval_stmt(else_branch, env);
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, env)?.is_truthy() {
                    match self.eval_stmt(body, env)? {
                        Flow::Normal | Flow::Continue => (),
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Stmt::For {
                init,
                cond,
                incr,
                body,
            } => {
                let loop_env = Env::with_parent(env.clone());
                if let Some(init) = init {
                    self.eval_stmt(init, &loop_env)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond, &loop_env)?.is_truthy() {
                            break;
                        }
                    }
                    match self.eval_stmt(body, &loop_env)? {
                        Flow::Normal | Flow::Continue => (),
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if let Some(incr) = incr {
                        self.eval_expr(incr, &loop_env)?;
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Function(decl) => {
                let func = Function {
                    decl: decl.clone(),
                    closure: env.clone(),
                    is_initializer: false,
                };
                env.define(&decl.name, Value::Function(Rc::new(func)));
            }
            Stmt::Return { value, .. } => {
                let val = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(val));
            }
            Stmt::Class(decl) => self.eval_class(decl, env)?,
        }
        Ok(Flow::Normal)
    }

    fn eval_class(&mut self, decl: &ClassDecl, env: &Rc<Env>) -> EvalResult<()> {
        let superclass = match &decl.superclass {
            Some(e) => match self.eval_expr(e, env)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        decl.pos,
                        RuntimeErrorKind::SuperclassNotClass,
                    ))
                }
            },
            None => None,
        };

        env.define(&decl.name, Value::Nil);

        let method_env = match &superclass {
            Some(superclass) => {
                let super_env = Env::with_parent(env.clone());
                super_env.define(&self.super_sym, Value::Class(superclass.clone()));
                super_env
            }
            None => env.clone(),
        };

        let methods = decl
            .methods
            .iter()
            .map(|m| {
                let method = Function {
                    decl: m.clone(),
                    closure: method_env.clone(),
                    is_initializer: m.name == self.init_sym,
                };
                (m.name.clone(), Rc::new(method))
            })
            .collect();

        let class = Class {
            name: decl.name.clone(),
            superclass,
            methods,
        };
        env.define(&decl.name, Value::Class(Rc::new(class)));
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Nil => Value::Nil,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Variable { id, name, pos } => self.look_up(*id, name, *pos, env),
            Expr::Assign {
                id,
                name,
                value,
                pos,
            } => {
                let val = self.eval_expr(value, env)?;
                let assigned = match self.locals.get(id) {
                    Some(distance) => env.assign_at(*distance, name, val.clone()),
                    None => self.globals.assign(name, val.clone()),
                };
                if assigned {
                    Ok(val)
                } else {
                    Err(undefined_variable(name, *pos))
                }
            }
            Expr::Binary { lhs, op, rhs, pos } => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                binary(*op, l, r).map_err(|kind| RuntimeError::new(*pos, kind))
            }
            Expr::Logical { lhs, op, rhs } => {
                let l = self.eval_expr(lhs, env)?;
                let short_circuit = match op {
                    LogicalOp::Or => l.is_truthy(),
                    LogicalOp::And => !l.is_truthy(),
                };
                if short_circuit {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Unary { op, operand, pos } => {
                let val = self.eval_expr(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
                    UnaryOp::Minus => match val {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(
                            *pos,
                            RuntimeErrorKind::OperandNotNumber,
                        )),
                    },
                }
            }
            Expr::Group(e) => self.eval_expr(e, env),
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_expr(then_branch, env)
                } else {
                    self.eval_expr(else_branch, env)
                }
            }
            Expr::Call { callee, args, pos } => {
                let callee = self.eval_expr(callee, env)?;
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(a, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.call(callee, args, *pos)
            }
            Expr::Get { object, name, pos } => match self.eval_expr(object, env)? {
                Value::Instance(instance) => self.property(instance, name, *pos),
                _ => Err(RuntimeError::new(
                    *pos,
                    RuntimeErrorKind::PropertyOfNonInstance,
                )),
            },
            Expr::Set {
                object,
                name,
                value,
                pos,
            } => match self.eval_expr(object, env)? {
                Value::Instance(instance) => {
                    let val = self.eval_expr(value, env)?;
                    instance.set_field(name, val.clone());
                    Ok(val)
                }
                _ => Err(RuntimeError::new(
                    *pos,
                    RuntimeErrorKind::FieldOfNonInstance,
                )),
            },
            Expr::ArrayGet { array, index, pos } => {
                let array = self.eval_expr(array, env)?;
                let index = self.eval_expr(index, env)?;
                let elements = as_array(&array, *pos)?;
                let elements = elements.borrow();
                let i = array_index(&index, elements.len(), *pos)?;
                let val = elements[i].clone();
                Ok(val)
            }
            Expr::ArraySet {
                array,
                index,
                value,
                pos,
            } => {
                let array = self.eval_expr(array, env)?;
                let index = self.eval_expr(index, env)?;
                let val = self.eval_expr(value, env)?;
                let elements = as_array(&array, *pos)?;
                let mut elements = elements.borrow_mut();
                let i = array_index(&index, elements.len(), *pos)?;
                elements[i] = val.clone();
                Ok(val)
            }
            Expr::Array(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.eval_expr(e, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::array(elements))
            }
            Expr::This { id, pos } => self.look_up(*id, &self.this_sym, *pos, env),
            Expr::Super { id, method, pos } => self.super_method(*id, method, *pos, env),
        }
    }

    fn look_up(
        &self,
        id: ExprId,
        name: &Symbol,
        pos: Position,
        env: &Rc<Env>,
    ) -> EvalResult<Value> {
        let val = match self.locals.get(&id) {
            Some(distance) => env.get_at(*distance, name),
            None => self.globals.get(name),
        };
        val.ok_or_else(|| undefined_variable(name, pos))
    }

    fn property(
        &self,
        instance: Rc<Instance>,
        name: &Symbol,
        pos: Position,
    ) -> EvalResult<Value> {
        if let Some(val) = instance.field(name) {
            return Ok(val);
        }
        match instance.class.find_method(name) {
            Some(method) => Ok(Value::Function(Rc::new(
                method.bind(instance.clone(), &self.this_sym),
            ))),
            None => Err(RuntimeError::new(
                pos,
                RuntimeErrorKind::UndefinedProperty(name.name().to_owned()),
            )),
        }
    }

    // The resolver puts the `super` scope right outside the `this` scope of every method.
    fn super_method(
        &self,
        id: ExprId,
        method: &Symbol,
        pos: Position,
        env: &Rc<Env>,
    ) -> EvalResult<Value> {
        let distance = match self.locals.get(&id) {
            Some(distance) if *distance > 0 => *distance,
            _ => return Err(undefined_variable(&self.super_sym, pos)),
        };
        let superclass = match env.get_at(distance, &self.super_sym) {
            Some(Value::Class(class)) => class,
            _ => return Err(undefined_variable(&self.super_sym, pos)),
        };
        let instance = match env.get_at(distance - 1, &self.this_sym) {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(undefined_variable(&self.this_sym, pos)),
        };
        match superclass.find_method(method) {
            Some(m) => Ok(Value::Function(Rc::new(m.bind(instance, &self.this_sym)))),
            None => Err(RuntimeError::new(
                pos,
                RuntimeErrorKind::UndefinedProperty(method.name().to_owned()),
            )),
        }
    }

    fn call(&mut self, callee: Value, args: Vec<Value>, pos: Position) -> EvalResult<Value> {
        let check_arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(RuntimeError::new(
                    pos,
                    RuntimeErrorKind::Arity {
                        expected,
                        found: args.len(),
                    },
                ))
            }
        };

        match callee {
            Value::Function(func) => {
                check_arity(func.arity())?;
                self.call_function(&func, args)
            }
            Value::Native(native) => {
                check_arity(native.arity)?;
                tracing::trace!(native = %native.name, "call");
                (native.body)(&args).map_err(|kind| RuntimeError::new(pos, kind))
            }
            Value::Class(class) => {
                check_arity(class.arity(&self.init_sym))?;
                tracing::trace!(class = %class.name, "instantiate");
                let instance = Rc::new(Instance::new(class.clone()));
                if let Some(init) = class.find_method(&self.init_sym) {
                    let init = init.bind(instance.clone(), &self.this_sym);
                    self.call_function(&init, args)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(RuntimeError::new(pos, RuntimeErrorKind::NotCallable)),
        }
    }

    fn call_function(&mut self, func: &Function, args: Vec<Value>) -> EvalResult<Value> {
        tracing::trace!(function = %func.decl.name, args = args.len(), "call");
        let env = Env::with_parent(func.closure.clone());
        for (param, arg) in func.decl.params.iter().zip(args) {
            env.define(param, arg);
        }
        let flow = self.eval_block(&func.decl.body, &env)?;
        if func.is_initializer {
            return Ok(func.closure.get_at(0, &self.this_sym).unwrap_or(Value::Nil));
        }
        match flow {
            Flow::Return(val) => Ok(val),
            _ => Ok(Value::Nil),
        }
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, RuntimeErrorKind> {
    match op {
        BinaryOp::Add => match (l, r) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(Rc::from(format!("{}{}", l, r)))),
            _ => Err(RuntimeErrorKind::OperandsMismatch),
        },
        BinaryOp::Sub => numbers(l, r).map(|(l, r)| Value::Number(l - r)),
        BinaryOp::Mul => numbers(l, r).map(|(l, r)| Value::Number(l * r)),
        BinaryOp::Div => {
            let (l, r) = numbers(l, r)?;
            if r == 0.0 {
                Err(RuntimeErrorKind::DivByZero)
            } else {
                Ok(Value::Number(l / r))
            }
        }
        BinaryOp::Equal => Ok(Value::Bool(l == r)),
        BinaryOp::NotEqual => Ok(Value::Bool(l != r)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            compare(op, &l, &r).map(Value::Bool)
        }
        BinaryOp::Comma => Ok(r),
    }
}

fn numbers(l: Value, r: Value) -> Result<(f64, f64), RuntimeErrorKind> {
    match (l, r) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(RuntimeErrorKind::OperandsNotNumbers),
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<bool, RuntimeErrorKind> {
    let ord = match (l, r) {
        // Going through `partial_cmp` would lose the IEEE semantics of NaN.
        (Value::Number(l), Value::Number(r)) => {
            return Ok(match op {
                BinaryOp::Less => l < r,
                BinaryOp::LessEqual => l <= r,
                BinaryOp::Greater => l > r,
                _ => l >= r,
            })
        }
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        _ => return Err(RuntimeErrorKind::OperandsMismatch),
    };
    Ok(match op {
        BinaryOp::Less => ord == Ordering::Less,
        BinaryOp::LessEqual => ord != Ordering::Greater,
        BinaryOp::Greater => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    })
}

fn as_array(val: &Value, pos: Position) -> EvalResult<&Rc<RefCell<Vec<Value>>>> {
    match val {
        Value::Array(elements) => Ok(elements),
        _ => Err(RuntimeError::new(pos, RuntimeErrorKind::NotAnArray)),
    }
}

fn array_index(index: &Value, len: usize, pos: Position) -> EvalResult<usize> {
    let n = match index {
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => *n,
        _ => return Err(RuntimeError::new(pos, RuntimeErrorKind::IndexNotInteger)),
    };
    if n < 0.0 || n >= len as f64 {
        return Err(RuntimeError::new(
            pos,
            RuntimeErrorKind::IndexOutOfRange { index: n, len },
        ));
    }
    Ok(n as usize)
}

fn undefined_variable(name: &Symbol, pos: Position) -> RuntimeError {
    RuntimeError::new(
        pos,
        RuntimeErrorKind::UndefinedVariable(name.name().to_owned()),
    )
}

fn add_native(env: &Env, name: Symbol, arity: usize, body: NativeBody) {
    let native = Native {
        name: name.clone(),
        arity,
        body,
    };
    env.define(&name, Value::Native(Rc::new(native)));
}

fn native_len(args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match &args[0] {
        Value::Array(elements) => Ok(Value::Number(elements.borrow().len() as f64)),
        _ => Err(RuntimeErrorKind::BadArgument {
            function: "len",
            expected: "an array",
        }),
    }
}

fn native_push(args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match &args[0] {
        Value::Array(elements) => {
            let mut elements = elements.borrow_mut();
            elements.push(args[1].clone());
            Ok(Value::Number(elements.len() as f64))
        }
        _ => Err(RuntimeErrorKind::BadArgument {
            function: "push",
            expected: "an array as first argument",
        }),
    }
}
