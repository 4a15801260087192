//! Portico CLI
//!
//! This binary provides the main entry point for Portico: `show`,
//! `generate` and `backends`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

use std::io;
use std::process::ExitCode;

use clap::Parser;
use portico_cli::{execute, load_config, log_level, Cli, CliError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    logging::init(log_level(cli, &config))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &config, &mut out)
}
