use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::value::Value;

/// One scope frame.
///
/// Frames are shared through `Rc<RefCell<_>>`: a closure keeps the frame it
/// was created in alive after the block or call that made it has returned.
/// A class environment whose methods close over it, stored in a field of one
/// of its own instances, forms a cycle that reference counting never frees;
/// that leak is accepted.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Shorthand for a shared child frame of `enclosing`.
    pub fn child(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    pub fn enclosing(&self) -> Option<Rc<RefCell<Environment>>> {
        self.enclosing.clone()
    }

    /// Inserts or overwrites in this frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// This frame only; no parent walk.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Names bound in this frame.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UnboundVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndeclaredAssignment {
                name: name.to_string(),
                line,
            })
        }
    }

    /// The frame exactly `distance` parent links above `env`.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let parent: Rc<RefCell<Environment>> = current.borrow().enclosing.clone()?;
            current = parent;
        }

        Some(current)
    }

    /// Reads `name` from the frame `distance` hops up. No scanning: a name
    /// missing from that exact frame is unbound.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("get_at '{}' distance={}", name, distance);

        Self::ancestor(env, distance)
            .and_then(|frame| frame.borrow().lookup(name))
            .ok_or_else(|| RuntimeError::UnboundVariable {
                name: name.to_string(),
                line,
            })
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        debug!("assign_at '{}' distance={}", name, distance);

        let frame: Option<Rc<RefCell<Environment>>> = Self::ancestor(env, distance);
        let mut frame = frame
            .as_ref()
            .map(|f| f.borrow_mut())
            .ok_or_else(|| RuntimeError::UndeclaredAssignment {
                name: name.to_string(),
                line,
            })?;

        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::UndeclaredAssignment {
                name: name.to_string(),
                line,
            }),
        }
    }
}

impl fmt::Debug for Environment {
    // Values can point back at this frame through closures; print names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();

        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}
