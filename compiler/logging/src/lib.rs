#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Logging setup for the compiler.
//!
//! Diagnostics go to stderr so that stdout stays reserved for `show` and
//! other command output.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// The configured level is not a valid filter directive.
#[derive(Debug, Error)]
#[error("invalid log level `{level}`: {message}")]
pub struct LoggingError {
    /// Rejected level or directive
    pub level: String,
    /// Parser message
    pub message: String,
}

/// Filter from `RUST_LOG` when set, otherwise from `level`.
pub fn filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|err| LoggingError { level: level.to_string(), message: err.to_string() })
}

/// Install the global stderr subscriber. Calling it again is a no-op.
pub fn init(level: &str) -> Result<(), LoggingError> {
    let filter = filter(level)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_levels_and_directives() {
        assert!(filter("debug").is_ok());
        assert!(filter("portico_pipeline=trace,warn").is_ok());
        assert!(init("info").is_ok());
        assert!(init("info").is_ok());
    }
}
