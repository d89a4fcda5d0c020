//! Diagnostic sinks.
//!
//! The core never prints errors or picks exit codes itself; it hands every
//! diagnostic to a [`Reporter`] supplied through the interpreter's context.

use log::warn;

use crate::error::{LoxError, RuntimeError};

pub trait Reporter {
    /// Scanner and parser failures.
    fn syntax_error(&mut self, error: &LoxError);

    /// Static errors found by the resolver.
    fn resolve_error(&mut self, line: usize, lexeme: &str, message: &str);

    fn runtime_error(&mut self, error: &RuntimeError);

    /// A variable the resolver could not place in any scope; it is looked up
    /// dynamically at run time.
    fn unresolved(&mut self, line: usize, name: &str);
}

/// Writes diagnostics to standard error.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    warnings: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print unresolved‑variable warnings (they are always logged).
    pub fn with_warnings(mut self, warnings: bool) -> Self {
        self.warnings = warnings;
        self
    }
}

impl Reporter for ConsoleReporter {
    fn syntax_error(&mut self, error: &LoxError) {
        eprintln!("{}", error);
    }

    fn resolve_error(&mut self, line: usize, lexeme: &str, message: &str) {
        eprintln!("[line {}] Error at '{}': {}", line, lexeme, message);
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}", error);
    }

    fn unresolved(&mut self, line: usize, name: &str) {
        warn!("[line {}] '{}' is not declared in any enclosing scope", line, name);

        if self.warnings {
            eprintln!(
                "[line {}] Warning: '{}' is not declared in any enclosing scope",
                line, name
            );
        }
    }
}
