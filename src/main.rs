use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as ReplResult};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = if args.len() < 2 {
        run_repl().map_err(|err| format!("Error: {err:?}"))
    } else {
        run_script(&args[1])
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(filename: &str) -> Result<(), String> {
    let input = std::fs::read_to_string(filename).map_err(|err| format!("{filename}: {err}"))?;
    debug!(filename, "running script");
    execute(&input)
}

fn execute(input: &str) -> Result<(), String> {
    match plc::run(input) {
        Ok(value) => {
            println!("=> {value}");
            Ok(())
        }
        Err(err) => Err(err.display_in(input)),
    }
}

/// Collects lines until an empty one, then runs them as a single program.
fn run_repl() -> ReplResult<()> {
    let mut rl = DefaultEditor::new()?;
    let mut program = String::new();
    loop {
        let prompt = if program.is_empty() { ">> " } else { ".. " };
        match rl.readline(prompt) {
            Ok(line) if line.trim().is_empty() => {
                if !program.is_empty() {
                    if let Err(msg) = execute(&program) {
                        println!("{msg}");
                    }
                    program.clear();
                }
            }
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                program.push_str(&line);
                program.push('\n');
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
