use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::{Builder, Env};
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::{Interpreter, DEFAULT_MAX_CALL_DEPTH};
use rox::parser::Parser;

/// Stack for the thread that runs commands.  Deep Lox recursion is bounded
/// by the interpreter's stack budget, which is set from this.
const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Room left for frames outside the measured call chain.
const STACK_SLACK: usize = 8 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log (level from RUST_LOG, default debug)
    #[arg(long, global = true)]
    log: bool,

    /// Maximum call depth before a program fails with "Stack overflow."
    #[arg(
        long,
        global = true,
        env = "ROX_MAX_CALL_DEPTH",
        default_value_t = DEFAULT_MAX_CALL_DEPTH
    )]
    max_call_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a Lox program from a file, or an interactive prompt without one
    Run { filename: Option<PathBuf> },
}

/// Reads a source file through a memory map and validates it as UTF‑8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename)
        .with_context(|| format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping an empty file fails on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once and copied out before the file could change.
    let map = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let source = String::from_utf8(map.to_vec())
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::from_env(Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(errors: &[LoxError]) {
    for e in errors {
        debug!("Reporting: {}", e);
        eprintln!("{}", e);
    }
}

/// Exit status for a batch of errors: the first one decides.
fn exit_code(errors: &[LoxError]) -> i32 {
    errors.first().map_or(0, LoxError::exit_code)
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source = read_source(filename)?;
    let (tokens, errors) = rox::scan(&source);

    report(&errors);

    for token in &tokens {
        if json {
            println!("{}", serde_json::to_string(token)?);
        } else {
            println!("{}", token);
        }
    }

    Ok(exit_code(&errors))
}

fn parse(filename: &Path) -> Result<i32> {
    let source = read_source(filename)?;
    let (tokens, mut errors) = rox::scan(&source);
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression();
    errors.extend(parser.take_errors());

    match expr {
        Some(expr) if errors.is_empty() => {
            println!("{}", AstPrinter::print(&expr));
            Ok(0)
        }
        _ => {
            report(&errors);
            Ok(exit_code(&errors))
        }
    }
}

fn evaluate(filename: &Path, max_call_depth: usize) -> Result<i32> {
    let source = read_source(filename)?;
    let (tokens, mut errors) = rox::scan(&source);
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression();
    errors.extend(parser.take_errors());

    let expr = match expr {
        Some(expr) if errors.is_empty() => expr,
        _ => {
            report(&errors);
            return Ok(exit_code(&errors));
        }
    };

    let mut interpreter = interpreter(max_call_depth);

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            println!("{}", value);
            Ok(0)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(e.exit_code())
        }
    }
}

fn interpreter<'a>(max_call_depth: usize) -> Interpreter<'a, io::Stdout> {
    Interpreter::new()
        .with_max_call_depth(max_call_depth)
        .with_max_stack_bytes(INTERPRETER_STACK_SIZE - STACK_SLACK)
}

fn run_file(filename: &Path, max_call_depth: usize) -> Result<i32> {
    let source = read_source(filename)?;
    let mut interpreter = interpreter(max_call_depth);

    match rox::run(&mut interpreter, &source) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(0)
        }
        Err(errors) => {
            report(&errors);
            Ok(exit_code(&errors))
        }
    }
}

fn run_prompt(max_call_depth: usize) -> Result<i32> {
    let mut interpreter: Interpreter<'static, io::Stdout> = interpreter(max_call_depth);
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(0);
        }

        // Closures defined on this line may outlive it, so its text has to
        // live as long as the interpreter.
        let line: &'static str = Box::leak(line.into_boxed_str());

        if let Err(errors) = rox::run(&mut interpreter, line) {
            report(&errors);
        }
    }
}

fn dispatch(args: &Cli) -> Result<i32> {
    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Evaluate { filename } => evaluate(filename, args.max_call_depth),
        Commands::Run {
            filename: Some(filename),
        } => run_file(filename, args.max_call_depth),
        Commands::Run { filename: None } => run_prompt(args.max_call_depth),
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let worker = thread::Builder::new()
        .name("rox".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(&args))
        .context("Failed to start interpreter thread")?;

    let status = match worker.join() {
        Ok(status) => status?,
        Err(_) => anyhow::bail!("Interpreter thread panicked"),
    };

    if status != 0 {
        debug!("Exiting with status {}", status);
        std::process::exit(status);
    }

    Ok(())
}
