//! Module loading.
//!
//! `import "path";` runs the source that a [`ModuleSource`] returns for `path`
//! through the whole pipeline in a fresh root environment and exposes that
//! environment as a namespace.  Where the source text comes from is the
//! embedder's business; the binary uses [`FsModuleSource`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{LoxError, RuntimeError};
use crate::interpreter::Interpreter;
use crate::object::LoxModule;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// Maps a module path to its source text.
pub trait ModuleSource {
    fn load(&self, path: &str) -> io::Result<String>;
}

/// Reads `<root>/<path>.lox`.
#[derive(Debug, Clone)]
pub struct FsModuleSource {
    root: PathBuf,
}

impl FsModuleSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsModuleSource { root: root.into() }
    }
}

impl ModuleSource for FsModuleSource {
    fn load(&self, path: &str) -> io::Result<String> {
        let file: PathBuf = self.root.join(format!("{}.lox", path));

        debug!("Reading module file {}", file.display());

        fs::read_to_string(file)
    }
}

/// Sources held in memory, keyed by module path.
#[derive(Debug, Clone, Default)]
pub struct MemoryModuleSource {
    modules: HashMap<String, String>,
}

impl MemoryModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, source: &str) -> Self {
        self.modules.insert(path.to_string(), source.to_string());
        self
    }
}

impl ModuleSource for MemoryModuleSource {
    fn load(&self, path: &str) -> io::Result<String> {
        self.modules.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no module '{}'", path))
        })
    }
}

/// Name a whole‑module import binds when no alias is given: the last
/// `/`‑separated segment of the path.
pub fn namespace_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Load, resolve and run the module at `path`, returning its namespace.
pub(crate) fn load(
    interpreter: &mut Interpreter,
    path: &str,
    at: &Token,
) -> Result<Rc<LoxModule>, RuntimeError> {
    let line: usize = at.line;

    if interpreter.is_loading(path) {
        return Err(RuntimeError::CyclicImport {
            path: path.to_string(),
            line,
        });
    }

    info!("Loading module '{}'", path);

    let source: String =
        interpreter
            .modules()
            .load(path)
            .map_err(|e: io::Error| RuntimeError::ModuleNotFound {
                path: path.to_string(),
                reason: e.to_string(),
                line,
            })?;

    let statements: Rc<[Stmt]> = match interpreter.parsed_module(path, &source) {
        Some(statements) => {
            debug!("Reusing parsed body of module '{}'", path);
            statements
        }
        None => {
            let statements: Rc<[Stmt]> = Rc::from(prepare(interpreter, &source).map_err(
                |message: String| RuntimeError::ModuleFailed {
                    path: path.to_string(),
                    message,
                    line,
                },
            )?);
            interpreter.remember_module(path, source, Rc::clone(&statements));
            statements
        }
    };

    let env: Rc<RefCell<Environment>> = interpreter.fresh_root();

    interpreter.begin_loading(path);
    let outcome = interpreter.execute_module(&statements, Rc::clone(&env));
    interpreter.end_loading();
    outcome?;

    info!("Module '{}' loaded", path);

    Ok(Rc::new(LoxModule::new(namespace_name(path), env)))
}

/// Scans, parses and resolves a module body.  Only the first failure is kept.
fn prepare(interpreter: &mut Interpreter, source: &str) -> Result<Vec<Stmt>, String> {
    let tokens: Vec<Token> = Scanner::new(source)
        .tokenize()
        .map_err(|errors| first_message(&errors))?;

    let statements: Vec<Stmt> = Parser::new(&tokens)
        .parse()
        .map_err(|errors| first_message(&errors))?;

    Resolver::new(interpreter)
        .silent()
        .resolve(&statements)
        .map_err(|e: LoxError| e.to_string())?;

    Ok(statements)
}

fn first_message(errors: &[LoxError]) -> String {
    errors
        .first()
        .map_or_else(|| String::from("unknown error"), ToString::to_string)
}
