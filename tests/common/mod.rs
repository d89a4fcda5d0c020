#![allow(dead_code)]

use std::cell::{Ref, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use rox as lox;

use lox::error::{LoxError, RuntimeError};
use lox::interpreter::{Context, Interpreter};
use lox::module::MemoryModuleSource;
use lox::report::Reporter;
use lox::runner;

/// `print` sink the test can read back after handing a clone to the
/// interpreter.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveDiagnostic {
    pub line: usize,
    pub lexeme: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub syntax: Vec<String>,
    pub resolve: Vec<ResolveDiagnostic>,
    pub runtime: Vec<RuntimeError>,
    pub unresolved: Vec<String>,
}

#[derive(Clone, Default)]
pub struct CollectingReporter(Rc<RefCell<Diagnostics>>);

impl CollectingReporter {
    pub fn diagnostics(&self) -> Ref<'_, Diagnostics> {
        self.0.borrow()
    }
}

impl Reporter for CollectingReporter {
    fn syntax_error(&mut self, error: &LoxError) {
        self.0.borrow_mut().syntax.push(error.to_string());
    }

    fn resolve_error(&mut self, line: usize, lexeme: &str, message: &str) {
        self.0.borrow_mut().resolve.push(ResolveDiagnostic {
            line,
            lexeme: lexeme.to_string(),
            message: message.to_string(),
        });
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        self.0.borrow_mut().runtime.push(error.clone());
    }

    fn unresolved(&mut self, _line: usize, name: &str) {
        self.0.borrow_mut().unresolved.push(name.to_string());
    }
}

/// An interpreter wired to in‑memory output, diagnostics and modules.
pub struct Session {
    pub interpreter: Interpreter,
    pub out: SharedOutput,
    pub reporter: CollectingReporter,
}

impl Session {
    pub fn new() -> Self {
        Self::build(false, MemoryModuleSource::new())
    }

    pub fn interactive() -> Self {
        Self::build(true, MemoryModuleSource::new())
    }

    pub fn with_modules(modules: MemoryModuleSource) -> Self {
        Self::build(false, modules)
    }

    pub fn build(interactive: bool, modules: MemoryModuleSource) -> Self {
        let out: SharedOutput = SharedOutput::default();
        let reporter: CollectingReporter = CollectingReporter::default();

        let context: Context = Context::new()
            .interactive(interactive)
            .output(out.clone())
            .reporter(reporter.clone())
            .modules(modules);

        Session {
            interpreter: Interpreter::new(context),
            out,
            reporter,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        runner::run(&mut self.interpreter, source)
    }

    pub fn output(&self) -> String {
        self.out.contents()
    }

    pub fn diagnostics(&self) -> Ref<'_, Diagnostics> {
        self.reporter.diagnostics()
    }
}

/// Runs a program that must succeed and returns what it printed.
pub fn run_ok(source: &str) -> String {
    let mut session: Session = Session::new();

    if let Err(e) = session.run(source) {
        panic!("program failed: {}\n{:?}", e, session.diagnostics());
    }

    session.output()
}

/// Runs a program that must fail at run time and returns the error.
pub fn run_err(source: &str) -> RuntimeError {
    let mut session: Session = Session::new();

    match session.run(source) {
        Err(LoxError::Runtime(e)) => e,
        Err(other) => panic!("expected a runtime error, got: {}", other),
        Ok(()) => panic!("expected a runtime error, got output: {}", session.output()),
    }
}

/// Runs a program that must be rejected by the resolver and returns every
/// resolve diagnostic.
pub fn resolve_errors(source: &str) -> Vec<ResolveDiagnostic> {
    let mut session: Session = Session::new();

    match session.run(source) {
        Err(LoxError::Resolve { .. }) => {}
        Err(other) => panic!("expected a resolve error, got: {}", other),
        Ok(()) => panic!("expected a resolve error, program ran"),
    }

    let diagnostics: Vec<ResolveDiagnostic> = session.diagnostics().resolve.clone();
    diagnostics
}
