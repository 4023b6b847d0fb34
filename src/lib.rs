pub mod analyzer;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scope;

use std::io::Write;

pub use analyzer::Analyzer;
pub use error::{Error, ErrorKind, Result};
pub use interpreter::{Interpreter, Value};
pub use parser::{parse, tokenize_string, Source};

/// Lexes, parses and analyzes `input`, returning the annotated tree.
pub fn check(input: &str) -> Result<Source> {
    let tokens = tokenize_string(input)?;
    let source = parse(&tokens)?;
    Analyzer::new().analyze(&source)?;
    Ok(source)
}

/// Checks and runs `input`, printing to stdout.
pub fn run(input: &str) -> Result<Value> {
    run_with_output(input, std::io::stdout())
}

pub fn run_with_output(input: &str, out: impl Write) -> Result<Value> {
    let source = check(input)?;
    let mut interpreter = Interpreter::with_output(out);
    interpreter.evaluate(&source)
}
