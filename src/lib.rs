//! Front end and tree‑walking evaluator for the Lox scripting language.
//!
//! Pipeline: [`scanner`] (text → tokens) → [`parser`] (tokens → AST) →
//! [`resolver`] (AST → scope distances) → [`interpreter`] (AST → effects).

pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

use error::LoxError;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;
use token::Token;

/// Scan `source` completely, returning the tokens and any lexical errors.
pub fn scan(source: &str) -> (Vec<Token<'_>>, Vec<LoxError>) {
    Scanner::new(source).scan_tokens()
}

/// Scan, parse, resolve and run `source` on `interpreter`.
///
/// Lexical, syntax and resolution errors are all reported together and the
/// program is not run.  A runtime error stops the program and is returned
/// alone.  Globals defined by earlier runs stay visible, which is what the
/// interactive prompt relies on.
pub fn run<'a, W: Write>(
    interpreter: &mut Interpreter<'a, W>,
    source: &'a str,
) -> Result<(), Vec<LoxError>> {
    let (tokens, mut errors) = scan(source);

    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    errors.extend(parser.take_errors());

    if !errors.is_empty() {
        info!("Not running: {} syntax error(s)", errors.len());
        return Err(errors);
    }

    Resolver::new(interpreter).resolve(&statements)?;

    interpreter.interpret(&statements).map_err(|e| vec![e])
}
