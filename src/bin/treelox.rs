//! Lox interpreter command-line.
//!
//! When called without file arguments it drops into an interactive read-evaluate-print loop.
//!
//! When called with files, it interprets them in a single interpreter session (so code and data
//! sharing is possible) and stops at the first error.  The exit status is 65 for a static error
//! and 70 for a runtime error.
//!
//! Logging goes to stderr and is controlled by `TREELOX_LOG` (or `RUST_LOG`), e.g.
//! `TREELOX_LOG=treelox=debug`.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;
use std::process;

use anyhow::{self, Context};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use treelox::interpreter::{Interpreter, LoxError};

/// Tree-walk interpreter for a Lox dialect
#[derive(Parser, Debug)]
#[command(name = "treelox", version)]
struct Args {
    /// Print the parsed syntax tree instead of evaluating
    #[arg(long)]
    print_ast: bool,

    /// Scripts to run in one shared session (interactive prompt if none)
    files: Vec<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_logging();

    if args.files.is_empty() {
        run_prompt(args.print_ast)?;
    } else {
        run_all_files(&args.files, args.print_ast)?;
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TREELOX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_all_files(paths: &[PathBuf], print_ast: bool) -> Result<(), anyhow::Error> {
    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);

    for p in paths {
        let source = fs::read_to_string(p)
            .with_context(|| format!("failed to read {}", p.display()))?;
        tracing::debug!(path = %p.display(), "running file");
        if let Err(e) = run(&mut interp, &source, print_ast) {
            eprintln!("{}", e);
            io::stdout().flush()?;
            process::exit(exit_code(&e));
        }
    }

    Ok(())
}

fn run_prompt(print_ast: bool) -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        if let Err(e) = run(&mut interp, &input, print_ast) {
            eprintln!("{}", e);
        }
    }

    Ok(())
}

fn run<W: Write>(
    interp: &mut Interpreter<'_, W>,
    source: &str,
    print_ast: bool,
) -> Result<(), LoxError> {
    if print_ast {
        print!("{}", interp.dump_ast(source)?);
        Ok(())
    } else {
        interp.eval(source)
    }
}

fn exit_code(e: &LoxError) -> i32 {
    match e {
        LoxError::Static(_) => 65,
        LoxError::Runtime(_) => 70,
    }
}
