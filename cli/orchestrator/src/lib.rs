#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
//! Command line front end of Portico: argument parsing, configuration
//! overrides and the text printed by each subcommand.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use codegen::registry::DEFAULT_BACKEND;
use config::Config;
use logging::LoggingError;
use pipeline::{GenerationReport, Pipeline, PipelineError, PipelineOptions};
use thiserror::Error;

/// Command-line interface of the `portico` binary.
#[derive(Parser, Debug)]
#[command(
    name = "portico",
    about = "Generate transport layers (models, client, server) for Rust domain services",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to run
    pub cmd: Commands,
    /// Configuration file; defaults to ./portico.toml, then the user config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log level or filter directive; `RUST_LOG` takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// Available portico commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the services, methods and types found under a source
    Show {
        /// Crate directory, source directory, Rust file or JSON manifest
        source: PathBuf,
        /// Print the service IR as JSON
        #[arg(long)]
        json: bool,
        /// Skip modules that fail to load
        #[arg(long)]
        tolerate_load_errors: bool,
    },
    /// Generate the transport layer of a source for one backend
    Generate {
        /// Crate directory, source directory, Rust file or JSON manifest
        source: PathBuf,
        /// Backend name, see `portico backends`
        #[arg(default_value = DEFAULT_BACKEND)]
        backend: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Path replacing `crate` in domain type paths, e.g. `::shop`
        #[arg(long)]
        domain_crate: Option<String>,
        /// Skip modules that fail to load
        #[arg(long)]
        tolerate_load_errors: bool,
        /// Render everything but only list the artifacts
        #[arg(long)]
        dry_run: bool,
    },
    /// List the available backends
    Backends,
}

/// Errors surfaced by the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Any pipeline stage failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The log level could not be parsed.
    #[error(transparent)]
    Logging(#[from] LoggingError),
    /// Writing to stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Stage family name, e.g. `backend`.
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Pipeline(err) => err.kind().name(),
            CliError::Logging(_) => "config",
            CliError::Output(_) => "emission",
        }
    }

    /// Stable code within the kind.
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Pipeline(err) => err.code(),
            CliError::Logging(_) => "config",
            CliError::Output(_) => "io",
        }
    }

    /// `error[<kind>/<code>]: <message>`
    pub fn diagnostic(&self) -> String { format!("error[{}/{}]: {}", self.kind(), self.code(), self) }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self { CliError::Pipeline(err.into()) }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Configuration named by `--config`, else the default lookup.
pub fn load_config(cli: &Cli) -> Result<Config> { Ok(Config::load(cli.config.as_deref())?) }

/// Effective log level: the flag, else the configured level.
pub fn log_level<'a>(cli: &'a Cli, config: &'a Config) -> &'a str {
    cli.log_level.as_deref().unwrap_or(&config.logging.level)
}

/// Run the selected subcommand, printing its output to `out`.
pub fn execute(cli: &Cli, config: &Config, out: &mut dyn Write) -> Result<()> {
    let mut options = PipelineOptions::from_config(config);
    match &cli.cmd {
        Commands::Show { source, json, tolerate_load_errors } => {
            options.tolerate_load_errors |= *tolerate_load_errors;
            let text = Pipeline::new(options).show(source, *json)?;
            out.write_all(text.as_bytes())?;
        }
        Commands::Generate {
            source,
            backend,
            output,
            domain_crate,
            tolerate_load_errors,
            dry_run,
        } => {
            options.tolerate_load_errors |= *tolerate_load_errors;
            if let Some(dir) = output {
                options.output_dir = Some(dir.clone());
            }
            if let Some(path) = domain_crate {
                options.generator.domain_crate = path.clone();
            }
            let report = Pipeline::new(options).generate(source, backend, *dry_run)?;
            print_report(&report, out)?;
        }
        Commands::Backends => {
            let pipeline = Pipeline::new(options);
            for (name, description, streaming) in pipeline.registry().describe() {
                let shapes = if streaming { "all shapes" } else { "unary only" };
                let marker = if name == DEFAULT_BACKEND { " (default)" } else { "" };
                writeln!(out, "{:<10} {:<12} {}{}", name, shapes, description, marker)?;
            }
        }
    }
    Ok(())
}

fn print_report(report: &GenerationReport, out: &mut dyn Write) -> io::Result<()> {
    for warning in &report.warnings {
        writeln!(out, "skipped {}: {}", warning.path.display(), warning.message)?;
    }
    if report.written {
        writeln!(
            out,
            "wrote {} files for backend `{}` to {}",
            report.artifacts.len(),
            report.backend,
            report.output_dir.display()
        )?;
    } else {
        writeln!(
            out,
            "dry run: {} files for backend `{}` would be written to {}",
            report.artifacts.len(),
            report.backend,
            report.output_dir.display()
        )?;
    }
    for (path, size) in &report.artifacts {
        writeln!(out, "  {} ({} bytes)", path, size)?;
    }
    Ok(())
}
