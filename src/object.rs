//! Heap objects behind the reference variants of [`Value`].
//!
//! Classes, instances and arrays use interior mutability (`RefCell`) for the
//! parts a program may change after creation: static fields, instance fields
//! and array slots.  Everything else is fixed at construction.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, TryReserveError};
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::{Callable, Value};

// ───────────────────────────── functions ─────────────────────────────

/// A closure: a declaration paired with the environment it was created in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure defines `this` as `instance`.
    /// The receiver itself is left untouched.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let environment: Rc<RefCell<Environment>> = Environment::child(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling function '{}' with {} argument(s)", self.name(), arguments.len());

        let environment: Rc<RefCell<Environment>> = Environment::child(&self.closure);

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", line);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function: {}>", self.name())
    }
}

// ────────────────────────────── classes ──────────────────────────────

/// A class value.  Static members live in the class environment (the frame
/// its methods close over), so `A.x` from outside and a free `x` inside a
/// static method name the same slot.
pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
    statics: Rc<RefCell<Environment>>,
}

impl LoxClass {
    pub fn new(
        name: &str,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
        statics: Rc<RefCell<Environment>>,
    ) -> Self {
        LoxClass {
            name: name.to_string(),
            superclass,
            methods,
            statics,
        }
    }

    /// The implicit root of every class hierarchy.
    pub fn origin() -> Self {
        LoxClass::new(
            "Origin",
            None,
            HashMap::new(),
            Rc::new(RefCell::new(Environment::new())),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    /// Looks in this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_method(name)
    }

    /// Static members belong to the class itself and are not inherited.
    pub fn get_static(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if name == SUPER {
            return Err(RuntimeError::UndefinedProperty {
                name: name.to_string(),
                line,
            });
        }

        self.statics
            .borrow()
            .lookup(name)
            .ok_or_else(|| RuntimeError::UndefinedProperty {
                name: name.to_string(),
                line,
            })
    }

    pub fn set_static(&self, name: &str, value: Value) {
        self.statics.borrow_mut().define(name, value);
    }

    pub fn has_static(&self, name: &str) -> bool {
        name != SUPER && self.statics.borrow().lookup(name).is_some()
    }
}

/// Binding the class environment holds for `super.method` lookups; not a
/// static member.
const SUPER: &str = "super";

impl Callable for LoxClass {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating class '{}'", self.name);

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Some(Rc::clone(&self))));

        if let Some(initializer) = self.find_method("init") {
            Rc::new(initializer.bind(Rc::clone(&instance))).call(interpreter, arguments, line)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class: {}>", self.name)
    }
}

// ───────────────────────────── instances ─────────────────────────────

pub struct LoxInstance {
    class: Option<Rc<LoxClass>>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Option<Rc<LoxClass>>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// `None` only for the classless `native` holder.
    pub fn class(&self) -> Option<&Rc<LoxClass>> {
        self.class.as_ref()
    }

    /// Fields shadow methods; a method is returned bound to this instance.
    pub fn get(self: &Rc<Self>, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.as_ref().and_then(|c| c.find_method(name)) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.to_string(),
            line,
        })
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }

    /// A field or a method of that name exists.
    pub fn has(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
            || self
                .class
                .as_ref()
                .is_some_and(|c| c.find_method(name).is_some())
    }

    pub fn is_instance_of(&self, class: &Rc<LoxClass>) -> bool {
        let mut current: Option<&Rc<LoxClass>> = self.class.as_ref();

        while let Some(c) = current {
            if Rc::ptr_eq(c, class) {
                return true;
            }
            current = c.superclass();
        }

        false
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "<object: {}>", class.name()),
            None => write!(f, "<object: NoClass>"),
        }
    }
}

// ────────────────────────────── arrays ───────────────────────────────

/// Fixed‑length mutable sequence.
pub struct LoxArray {
    elements: RefCell<Vec<Value>>,
}

impl LoxArray {
    /// `length` slots, all `nil`.  Fails instead of aborting when the slots
    /// cannot be allocated.
    pub fn new(length: usize) -> Result<Self, TryReserveError> {
        let mut elements: Vec<Value> = Vec::new();
        elements.try_reserve_exact(length)?;
        elements.resize(length, Value::Nil);

        Ok(LoxArray::from_values(elements))
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        LoxArray {
            elements: RefCell::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elements(&self) -> Ref<'_, Vec<Value>> {
        self.elements.borrow()
    }

    pub fn get(&self, index: usize, line: usize) -> Result<Value, RuntimeError> {
        let elements = self.elements.borrow();

        elements
            .get(index)
            .cloned()
            .ok_or(RuntimeError::IndexOutOfBounds {
                index,
                length: elements.len(),
                line,
            })
    }

    pub fn set(&self, index: usize, value: Value, line: usize) -> Result<(), RuntimeError> {
        let mut elements = self.elements.borrow_mut();
        let length: usize = elements.len();

        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::IndexOutOfBounds {
                index,
                length,
                line,
            }),
        }
    }
}

// ────────────────────────────── modules ──────────────────────────────

/// The namespace left behind by running a module.
pub struct LoxModule {
    name: String,
    env: Rc<RefCell<Environment>>,
}

impl LoxModule {
    pub fn new(name: &str, env: Rc<RefCell<Environment>>) -> Self {
        LoxModule {
            name: name.to_string(),
            env,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A top‑level binding of the module.
    pub fn export(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        self.env
            .borrow()
            .lookup(name)
            .ok_or_else(|| RuntimeError::MissingExport {
                module: self.name.clone(),
                name: name.to_string(),
                line,
            })
    }
}
