//! One unit of source text through the whole pipeline:
//! scan → parse → resolve → interpret.

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// Runs `source` against `interpreter`, whose state (globals, recorded
/// distances) persists across calls.
///
/// Every diagnostic has already gone to the interpreter's reporter when this
/// returns `Err`; the returned error only tells the caller which stage
/// failed.  [`LoxError::Incomplete`] is never reported: in interactive mode it
/// means the caller should read more input and try again.
pub fn run(interpreter: &mut Interpreter, source: &str) -> Result<()> {
    info!("Running {} byte(s) of source", source.len());

    let interactive: bool = interpreter.is_interactive();

    let tokens: Vec<Token> = match Scanner::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(errors) => {
            if interactive && errors.iter().all(is_unterminated) {
                debug!("Unterminated literal at end of interactive input");
                return Err(LoxError::Incomplete);
            }

            return Err(report_syntax(interpreter, errors));
        }
    };

    let statements: Vec<Stmt> = match Parser::new(&tokens).interactive(interactive).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            if matches!(errors.first(), Some(LoxError::Incomplete)) {
                return Err(LoxError::Incomplete);
            }

            return Err(report_syntax(interpreter, errors));
        }
    };

    Resolver::new(interpreter).resolve(&statements)?;

    interpreter.interpret(&statements)?;

    Ok(())
}

fn report_syntax(interpreter: &mut Interpreter, mut errors: Vec<LoxError>) -> LoxError {
    for e in &errors {
        interpreter.reporter().syntax_error(e);
    }

    if errors.is_empty() {
        LoxError::Incomplete
    } else {
        errors.swap_remove(0)
    }
}

fn is_unterminated(error: &LoxError) -> bool {
    matches!(error, LoxError::Lex { message, .. } if message.starts_with("Unterminated"))
}
