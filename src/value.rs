use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::natives::NativeFunction;
use crate::object::{LoxArray, LoxClass, LoxFunction, LoxInstance, LoxModule};

/// Anything that can appear after a callee in `callee(args)`.
///
/// Implementors receive an `Rc` to themselves so that a class can hand itself
/// to the instance it creates and a function can hand its closure to a call
/// frame without cloning the declaration.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError>;
}

/// A runtime value.  Reference types share their payload through `Rc`, so
/// cloning a `Value` never copies an array, an instance or a closure.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<LoxArray>),
    Tuple(Rc<[Value]>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<LoxInstance>),
    Native(Rc<NativeFunction>),
    Module(Rc<LoxModule>),
}

impl Value {
    /// Everything except `nil` and `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Number with no fractional part.
    pub fn as_integral(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n % 1.0 == 0.0 => Some(*n),
            _ => None,
        }
    }

    /// A non‑negative integral number, usable as an index or a length.
    pub fn as_index(&self) -> Option<usize> {
        self.as_integral()
            .filter(|n| *n >= 0.0 && *n <= usize::MAX as f64)
            .map(|n| n as usize)
    }

    /// Callable view of the value, if it has one.
    pub fn as_callable(&self) -> Option<Rc<dyn Callable>> {
        match self {
            Value::Function(f) => Some(Rc::clone(f) as Rc<dyn Callable>),
            Value::Class(c) => Some(Rc::clone(c) as Rc<dyn Callable>),
            Value::Native(n) => Some(Rc::clone(n) as Rc<dyn Callable>),
            _ => None,
        }
    }

    /// Name reported by `native.type`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "<Nil>".into(),
            Value::Bool(_) => "<Boolean>".into(),
            Value::Number(_) => "<Number>".into(),
            Value::String(_) => "<String>".into(),
            Value::Array(_) => "<Array>".into(),
            Value::Tuple(_) => "<Tuple>".into(),
            Value::Function(_) => "<Function>".into(),
            Value::Class(_) => "<Class>".into(),
            Value::Native(_) => "<Native>".into(),
            Value::Module(_) => "<Module>".into(),
            Value::Instance(instance) => match instance.class() {
                Some(class) => format!("<{}>", class.name()),
                None => "<NoClass>".into(),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a[..] == b[..],
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The stringify conversion used by `print`, `+` and interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() != 0.0 {
                    write!(f, "{}", n)
                } else if n.abs() < 1e21 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{:e}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Array(array) => {
                write!(f, "[")?;
                for (i, element) in array.elements().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }

            Value::Tuple(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }

            Value::Function(function) => write!(f, "<function: {}>", function.name()),

            Value::Class(class) => write!(f, "<class: {}>", class.name()),

            Value::Instance(instance) => match instance.class() {
                Some(class) => write!(f, "<object: {}>", class.name()),
                None => write!(f, "<object: NoClass>"),
            },

            Value::Native(native) => write!(f, "<native: {}>", native.name()),

            Value::Module(module) => write!(f, "<module: {}>", module.name()),
        }
    }
}

impl fmt::Debug for Value {
    // Strings are quoted so `nil` and `"nil"` differ in logs and assertions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
