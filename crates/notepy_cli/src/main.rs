//! `notepy` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments and dispatch to [`commands::run`].
//! - Map failures to `error: ...` on stderr and exit status 1.

mod args;
mod commands;

use std::process::ExitCode;

fn main() -> ExitCode {
    let invocation = match args::parse(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("{}", args::USAGE.trim_end());
            return ExitCode::FAILURE;
        }
    };

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match commands::run(invocation, &mut input, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=command_failed module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
