//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  Evaluation
//! failures get their own [`RuntimeError`] enum so that every variant can carry
//! the line it was raised on; [`LoxError::Runtime`] wraps it for callers that
//! run the whole pipeline.
//!
//! The module **does not** print diagnostics itself; that is the job of a
//! [`crate::report::Reporter`].

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error at '{lexeme}': {message}")]
    Parse {
        message: String,
        lexeme: String,
        line: usize,
    },

    /// Static‑analysis failure: redeclaration, misplaced `this`/`super`/`return`,
    /// malformed destructuring targets.
    #[error("[line {line}] Error at '{lexeme}': {message}")]
    Resolve {
        message: String,
        lexeme: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Interactive input ended in the middle of a statement.  Not a user error:
    /// the REPL buffers the line and asks for more.
    #[error("incomplete input")]
    Incomplete,

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            lexeme: lexeme.to_string(),
            line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve {
            message,
            lexeme: lexeme.to_string(),
            line,
        }
    }

    /// True for errors detected before any statement ran (exit code 65).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

/// Failures raised while evaluating statements and expressions.
///
/// Every variant except [`RuntimeError::StrayReturn`] and
/// [`RuntimeError::Output`] records the source line of the offending token.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error("Operands of '{operator}' must be numbers. [line {line}]")]
    OperandsMustBeNumbers { operator: String, line: usize },

    #[error("Operand of '{operator}' must be a number. [line {line}]")]
    OperandMustBeNumber { operator: String, line: usize },

    #[error("Operands of '+' must be two numbers, or include a string. [line {line}]")]
    UnsupportedAddition { line: usize },

    #[error("The value {value} is not callable. [line {line}]")]
    NotCallable { value: String, line: usize },

    #[error("{callee} expects {expected} arguments but got {got}. [line {line}]")]
    ArityMismatch {
        callee: String,
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Only objects have properties, got {value}. [line {line}]")]
    NotAnObject { value: String, line: usize },

    #[error("Undefined property '{name}'. [line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Undefined variable '{name}'. [line {line}]")]
    UnboundVariable { name: String, line: usize },

    #[error("Cannot assign to undeclared variable '{name}'. [line {line}]")]
    UndeclaredAssignment { name: String, line: usize },

    #[error("{value} is not a valid array. [line {line}]")]
    NotAnArray { value: String, line: usize },

    #[error("{value} is not a valid index. [line {line}]")]
    InvalidIndex { value: String, line: usize },

    #[error("Index {index} is out of bounds for length {length}. [line {line}]")]
    IndexOutOfBounds {
        index: usize,
        length: usize,
        line: usize,
    },

    #[error("{value} is not a valid array length. [line {line}]")]
    InvalidArrayLength { value: String, line: usize },

    #[error("Module '{module}' cannot be modified from outside. [line {line}]")]
    ReadOnlyModule { module: String, line: usize },

    #[error("Tuples cannot be modified. [line {line}]")]
    ImmutableTuple { line: usize },

    #[error("Only arrays and tuples can be unpacked, got {value}. [line {line}]")]
    UnpackSource { value: String, line: usize },

    #[error("Unbalanced unpacking with left size {left} and right size {right}. [line {line}]")]
    UnbalancedUnpack {
        left: usize,
        right: usize,
        line: usize,
    },

    #[error("Invalid unpacking target. [line {line}]")]
    InvalidUnpackTarget { line: usize },

    #[error("Superclass '{name}' must be a class. [line {line}]")]
    InvalidSuperclass { name: String, line: usize },

    #[error("No module found at '{path}': {reason}. [line {line}]")]
    ModuleNotFound {
        path: String,
        reason: String,
        line: usize,
    },

    #[error("Module '{path}' failed to load: {message} [line {line}]")]
    ModuleFailed {
        path: String,
        message: String,
        line: usize,
    },

    #[error("Module '{path}' is imported while it is still loading. [line {line}]")]
    CyclicImport { path: String, line: usize },

    #[error("Module '{module}' has no binding named '{name}'. [line {line}]")]
    MissingExport {
        module: String,
        name: String,
        line: usize,
    },

    #[error("native.{name}: {message} [line {line}]")]
    Native {
        name: String,
        message: String,
        line: usize,
    },

    #[error("panic: {message} [line {line}]")]
    Panic { message: String, line: usize },

    #[error("'return' escaped to the top level.")]
    StrayReturn,

    #[error("Failed to write output: {message}")]
    Output { message: String },
}

impl RuntimeError {
    /// Source line the error was raised on, when one is known.
    pub fn line(&self) -> Option<usize> {
        use RuntimeError::*;

        match self {
            OperandsMustBeNumbers { line, .. }
            | OperandMustBeNumber { line, .. }
            | UnsupportedAddition { line }
            | NotCallable { line, .. }
            | ArityMismatch { line, .. }
            | NotAnObject { line, .. }
            | UndefinedProperty { line, .. }
            | UnboundVariable { line, .. }
            | UndeclaredAssignment { line, .. }
            | NotAnArray { line, .. }
            | InvalidIndex { line, .. }
            | IndexOutOfBounds { line, .. }
            | InvalidArrayLength { line, .. }
            | ReadOnlyModule { line, .. }
            | ImmutableTuple { line }
            | UnpackSource { line, .. }
            | UnbalancedUnpack { line, .. }
            | InvalidUnpackTarget { line }
            | InvalidSuperclass { line, .. }
            | ModuleNotFound { line, .. }
            | ModuleFailed { line, .. }
            | CyclicImport { line, .. }
            | MissingExport { line, .. }
            | Native { line, .. }
            | Panic { line, .. } => Some(*line),
            StrayReturn | Output { .. } => None,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
