use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::{Context, Interpreter};
use lox::module::FsModuleSource;
use lox::parser::Parser;
use lox::report::ConsoleReporter;
use lox::runner;
use lox::scanner::Scanner;
use lox::stmt::Stmt;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// Directory imported module paths are relative to
    #[arg(long, global = true)]
    module_root: Option<PathBuf>,

    /// Print warnings for variables left to dynamic lookup
    #[arg(long, global = true)]
    warnings: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a program from a file and prints its syntax tree
    Parse {
        filename: PathBuf,

        /// Print the tree as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Rox program
    Run { filename: PathBuf },

    /// Starts an interactive session
    Repl,
}

/// Reads a script through a memory map.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file: File = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let length: u64 = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping a zero‑length file fails on some platforms.
    if length == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once, immediately copied out, and dropped; a
    // concurrent writer can at worst produce garbled source text.
    let map: Mmap = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let source: String = std::str::from_utf8(&map)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file: File = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module: &str = record
                .module_path()
                .map(|m| m.strip_prefix("rox::").unwrap_or(m))
                .unwrap_or("<unnamed>");
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn context_for(args: &Cli, default_root: &Path, interactive: bool) -> Context {
    let root: PathBuf = args
        .module_root
        .clone()
        .unwrap_or_else(|| default_root.to_path_buf());

    debug!("Module root: {:?}", root);

    Context::new()
        .interactive(interactive)
        .reporter(ConsoleReporter::new().with_warnings(args.warnings))
        .modules(FsModuleSource::new(root))
}

fn exit_code(error: &LoxError) -> i32 {
    if error.is_static() {
        65
    } else {
        70
    }
}

fn tokenize(filename: &Path) -> Result<()> {
    let source: String = read_file(filename)?;
    let mut tokenized: bool = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source: String = read_file(filename)?;

    let tokens: Vec<Token> = match Scanner::new(&source).tokenize() {
        Ok(tokens) => tokens,
        Err(errors) => {
            errors.iter().for_each(|e| eprintln!("{}", e));
            std::process::exit(65);
        }
    };

    let statements: Vec<Stmt> = match Parser::new(&tokens).parse() {
        Ok(statements) => statements,
        Err(errors) => {
            errors.iter().for_each(|e| eprintln!("{}", e));
            std::process::exit(65);
        }
    };

    if json {
        let rendered: String =
            serde_json::to_string_pretty(&statements).context("Failed to serialize syntax tree")?;
        println!("{}", rendered);
    } else {
        for stmt in &statements {
            println!("{}", AstPrinter::print_stmt(stmt));
        }
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn run(args: &Cli, filename: &Path) -> Result<()> {
    let source: String = read_file(filename)?;
    let script_dir: &Path = filename.parent().unwrap_or_else(|| Path::new("."));

    let mut interpreter: Interpreter = Interpreter::new(context_for(args, script_dir, false));

    if let Err(e) = runner::run(&mut interpreter, &source) {
        debug!("Run failed: {}", e);
        std::process::exit(exit_code(&e));
    }

    info!("Program executed successfully");
    Ok(())
}

fn repl(args: &Cli) -> Result<()> {
    let mut interpreter: Interpreter = Interpreter::new(context_for(args, Path::new("."), true));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer: String = String::new();

    loop {
        print!("{}", if buffer.is_empty() { "> " } else { "... " });
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line: String = line.context("Failed to read from stdin")?;

        buffer.push_str(&line);
        buffer.push('\n');

        match runner::run(&mut interpreter, &buffer) {
            Err(LoxError::Incomplete) => {
                debug!("Input incomplete, waiting for more");
                continue;
            }
            Err(e) => debug!("Line failed: {}", e),
            Ok(()) => {}
        }

        buffer.clear();
    }

    info!("REPL session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename, json } => parse(filename, *json),
        Commands::Run { filename } => run(&args, filename),
        Commands::Repl => repl(&args),
    }
}
