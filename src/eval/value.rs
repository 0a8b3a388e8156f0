use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::interner::Symbol;

use super::env::Env;
use super::RuntimeErrorKind;

/// Run-time value.
///
/// Scalars compare by value, everything else by identity.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<Function>),
    Native(Rc<Native>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    /// `nil` and `false` are falsey, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Native(l), Value::Native(r)) => Rc::ptr_eq(l, r),
            (Value::Class(l), Value::Class(r)) => Rc::ptr_eq(l, r),
            (Value::Instance(l), Value::Instance(r)) => Rc::ptr_eq(l, r),
            (Value::Array(l), Value::Array(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

impl Value {
    /// `open` holds the arrays being rendered by the enclosing calls.  Meeting one of them again
    /// means the array contains itself, which prints as `[...]`.
    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        open: &mut Vec<*const RefCell<Vec<Value>>>,
    ) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "<fun {}>", func.decl.name),
            Value::Native(native) => write!(f, "<native fun {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<instance of {}>", instance.class.name),
            Value::Array(elements) => {
                let ptr = Rc::as_ptr(elements);
                if open.contains(&ptr) {
                    return write!(f, "[...]");
                }
                open.push(ptr);
                write!(f, "[")?;
                for (i, e) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    e.render(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
        }
    }
}

/// User-defined function or method together with the scope it closes over.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Rc<Env>,
    pub is_initializer: bool,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.decl.name)
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl Function {
    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// Produce a copy of this method whose closure binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<Instance>, this: &Symbol) -> Function {
        let env = Env::with_parent(self.closure.clone());
        env.define(this, Value::Instance(instance));
        Function {
            decl: self.decl.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

pub type NativeBody = fn(&[Value]) -> Result<Value, RuntimeErrorKind>;

/// Function implemented by the interpreter itself.
pub struct Native {
    pub name: Symbol,
    pub arity: usize,
    pub body: NativeBody,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: Symbol,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<Symbol, Rc<Function>>,
}

impl Class {
    /// Search this class then its ancestors for the named method.
    pub fn find_method(&self, name: &Symbol) -> Option<Rc<Function>> {
        let mut class = self;
        loop {
            if let Some(method) = class.methods.get(name) {
                return Some(method.clone());
            }
            class = class.superclass.as_deref()?;
        }
    }

    /// Number of arguments a call to the class takes, dictated by its (possibly inherited)
    /// initializer.
    pub fn arity(&self, init: &Symbol) -> usize {
        self.find_method(init).map_or(0, |m| m.arity())
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<Symbol, Value>>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.borrow();
        let mut names = fields.keys().map(Symbol::name).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &names)
            .finish()
    }
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Instance {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn field(&self, name: &Symbol) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &Symbol, val: Value) {
        self.fields.borrow_mut().insert(name.clone(), val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;

    fn method(ctx: &Context, name: &str, arity: usize) -> Rc<Function> {
        let decl = FunctionDecl {
            name: ctx.symbol(name),
            pos: 1,
            params: (0..arity).map(|i| ctx.symbol(&format!("p{}", i))).collect(),
            body: vec![],
        };
        Rc::new(Function {
            decl: Rc::new(decl),
            closure: Env::new(),
            is_initializer: name == "init",
        })
    }

    fn class(
        ctx: &Context,
        name: &str,
        superclass: Option<Rc<Class>>,
        methods: &[Rc<Function>],
    ) -> Rc<Class> {
        Rc::new(Class {
            name: ctx.symbol(name),
            superclass,
            methods: methods
                .iter()
                .map(|m| (m.decl.name.clone(), m.clone()))
                .collect(),
        })
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::Str(Rc::from("")).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn stringify() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.125).to_string(), "-0.125");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Str(Rc::from("hi")).to_string(), "hi");
        let nested = Value::array(vec![
            Value::Number(1.0),
            Value::Str(Rc::from("a")),
            Value::array(vec![Value::Bool(false)]),
        ]);
        assert_eq!(nested.to_string(), "[1, a, [false]]");
    }

    #[test]
    fn self_containing_array_prints_ellipsis() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let Value::Array(elements) = &a else {
            unreachable!()
        };
        elements.borrow_mut().push(a.clone());
        assert_eq!(a.to_string(), "[1, [...]]");

        // The same array twice side by side is not a cycle.
        let shared = Value::array(vec![Value::Nil]);
        let pair = Value::array(vec![shared.clone(), shared]);
        assert_eq!(pair.to_string(), "[[nil], [nil]]");

        // Break the cycle.
        elements.borrow_mut().clear();
    }

    #[test]
    fn equality() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Str(Rc::from("ab")), Value::Str(Rc::from("ab")));
        assert_ne!(Value::Number(1.0), Value::Str(Rc::from("1")));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));

        let a = Value::array(vec![Value::Number(1.0)]);
        assert_eq!(a, a.clone());
        assert_ne!(a, Value::array(vec![Value::Number(1.0)]));
    }

    #[test]
    fn method_lookup_follows_superclass_chain() {
        let ctx = Context::new();
        let base = class(
            &ctx,
            "Base",
            None,
            &[method(&ctx, "init", 2), method(&ctx, "m", 0)],
        );
        let derived = class(&ctx, "Derived", Some(base), &[method(&ctx, "m", 1)]);

        assert_eq!(derived.find_method(&ctx.symbol("m")).map(|m| m.arity()), Some(1));
        assert_eq!(derived.arity(&ctx.symbol("init")), 2);
        assert!(derived.find_method(&ctx.symbol("nope")).is_none());
    }

    #[test]
    fn bound_method_sees_this() {
        let ctx = Context::new();
        let this = ctx.symbol("this");
        let c = class(&ctx, "C", None, &[method(&ctx, "m", 0)]);
        let instance = Rc::new(Instance::new(c.clone()));
        let bound = c
            .find_method(&ctx.symbol("m"))
            .expect("method")
            .bind(instance.clone(), &this);

        match bound.closure.get_at(0, &this) {
            Some(Value::Instance(i)) => assert!(Rc::ptr_eq(&i, &instance)),
            other => panic!("unexpected this: {:?}", other),
        }
        assert_eq!(Value::Instance(instance).to_string(), "<instance of C>");
    }
}
