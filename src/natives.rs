//! Built‑in callables, reachable only through the `native` keyword
//! (`native.clock()`, `native.len(xs)`, …).

use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::object::LoxInstance;
use crate::value::{Callable, Value};

/// Host function body.  Receives the already arity‑checked arguments and the
/// line of the call for error reporting.
pub type NativeFn = fn(&[Value], usize) -> Result<Value, RuntimeError>;

pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        NativeFunction { name, arity, func }
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling native '{}'", self.name);

        (self.func)(&arguments, line)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native: {}>", self.name)
    }
}

const NATIVES: &[(&str, usize, NativeFn)] = &[
    ("clock", 0, clock),
    ("len", 1, len),
    ("charAt", 2, char_at),
    ("type", 1, type_of),
    ("is", 2, is),
    ("has", 2, has),
    ("panic", 1, panic),
];

/// The classless object the `native` keyword evaluates to.
pub fn native_object() -> Rc<LoxInstance> {
    info!("Registering {} native functions", NATIVES.len());

    let holder: LoxInstance = LoxInstance::new(None);

    for &(name, arity, func) in NATIVES {
        holder.set(name, Value::Native(Rc::new(NativeFunction::new(name, arity, func))));
    }

    Rc::new(holder)
}

fn failure(name: &str, message: impl Into<String>, line: usize) -> RuntimeError {
    RuntimeError::Native {
        name: name.to_string(),
        message: message.into(),
        line,
    }
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| failure("clock", e.to_string(), line))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

/// Length of an array, tuple or string (in characters); `nil` for anything else.
fn len(args: &[Value], _line: usize) -> Result<Value, RuntimeError> {
    Ok(match &args[0] {
        Value::Array(array) => Value::Number(array.len() as f64),
        Value::Tuple(elements) => Value::Number(elements.len() as f64),
        Value::String(s) => Value::Number(s.chars().count() as f64),
        _ => Value::Nil,
    })
}

/// One‑character string at a character index.  A non‑index yields `nil`.
fn char_at(args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    let Value::String(s) = &args[0] else {
        return Err(failure(
            "charAt",
            format!("expected a string, got {}", args[0].type_name()),
            line,
        ));
    };

    let Some(index) = args[1].as_index() else {
        return Ok(Value::Nil);
    };

    match s.chars().nth(index) {
        Some(ch) => Ok(Value::String(ch.to_string())),
        None => Err(RuntimeError::IndexOutOfBounds {
            index,
            length: s.chars().count(),
            line,
        }),
    }
}

fn type_of(args: &[Value], _line: usize) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].type_name()))
}

/// `obj` is an instance of `class` or of one of its subclasses.
fn is(args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    let Value::Class(class) = &args[1] else {
        return Err(failure(
            "is",
            format!("expected a class, got {}", args[1].type_name()),
            line,
        ));
    };

    Ok(Value::Bool(match &args[0] {
        Value::Instance(instance) => instance.is_instance_of(class),
        _ => false,
    }))
}

/// `obj` has a field or method (or, for a class, a static member) named `name`.
fn has(args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    let Value::String(name) = &args[1] else {
        return Err(failure(
            "has",
            format!("expected a property name, got {}", args[1].type_name()),
            line,
        ));
    };

    Ok(Value::Bool(match &args[0] {
        Value::Instance(instance) => instance.has(name),
        Value::Class(class) => class.has_static(name),
        _ => false,
    }))
}

fn panic(args: &[Value], line: usize) -> Result<Value, RuntimeError> {
    Err(RuntimeError::Panic {
        message: args[0].to_string(),
        line,
    })
}
