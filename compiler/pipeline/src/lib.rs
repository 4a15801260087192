#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The Portico pipeline: discovery, IR building, generation and emission
//! wired together behind one error vocabulary.
//!
//! ## Module Organization
//!
//! - `orchestration` - [`Pipeline`]: builds the IR and renders or writes artifacts
//! - `emission` - [`EmissionWriter`]: lays an artifact tree out on disk
//! - `inspection` - human readable summary of a service IR (`portico show`)

use std::fmt;

use adapters::AdapterError;
use analysis::IrError;
use codegen::CodegenError;
use config::ConfigError;
use path::PathError;
use thiserror::Error;

pub mod emission;
pub mod inspection;
pub mod orchestration;

pub use emission::{EmissionError, EmissionWriter};
pub use orchestration::{GenerationReport, Pipeline, PipelineOptions};

/// Convenient result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The stage family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Locating, reading or parsing the domain sources
    Discovery,
    /// A domain type has no IR counterpart
    TypeMapping,
    /// The IR would be inconsistent
    IrConsistency,
    /// Backend selection or generation
    Backend,
    /// Writing the artifacts
    Emission,
    /// Loading the configuration
    Config,
}

impl ErrorKind {
    /// Name used in diagnostics, e.g. `ir-consistency`.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Discovery => "discovery",
            ErrorKind::TypeMapping => "type-mapping",
            ErrorKind::IrConsistency => "ir-consistency",
            ErrorKind::Backend => "backend",
            ErrorKind::Emission => "emission",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Error originating from entrypoint discovery.
    #[error(transparent)]
    Discovery(#[from] AdapterError),
    /// Error from building or validating the service IR.
    #[error(transparent)]
    Ir(#[from] IrError),
    /// Error propagated from the codegen crate.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    /// Error while writing the artifacts.
    #[error(transparent)]
    Emission(#[from] EmissionError),
    /// Error while loading the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The IR could not be rendered as JSON.
    #[error("failed to render the service IR as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stage family of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Discovery(_) => ErrorKind::Discovery,
            PipelineError::Ir(err) if err.is_type_mapping() => ErrorKind::TypeMapping,
            PipelineError::Ir(_) => ErrorKind::IrConsistency,
            PipelineError::Codegen(_) => ErrorKind::Backend,
            PipelineError::Emission(_) | PipelineError::Json(_) => ErrorKind::Emission,
            PipelineError::Config(_) => ErrorKind::Config,
        }
    }

    /// Stable machine readable code within the kind.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Discovery(err) => match err {
                AdapterError::Path(PathError::NotFound(_))
                | AdapterError::Path(PathError::UnsupportedSource(_))
                | AdapterError::Path(PathError::InvalidArtifactPath { .. }) => "source-not-found",
                AdapterError::Load { .. } => "load-failed",
                AdapterError::InvalidMarker { .. } => "invalid-marker",
                AdapterError::Manifest { .. } => "manifest",
            },
            PipelineError::Ir(err) => err.code(),
            PipelineError::Codegen(err) => err.code(),
            PipelineError::Emission(err) => err.code(),
            PipelineError::Json(_) => "render",
            PipelineError::Config(_) => "config",
        }
    }
}
