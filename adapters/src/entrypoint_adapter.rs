//! Entrypoint Adapter Trait
//!
//! This module defines the EntrypointAdapter trait that every source of
//! domain services implements to hand the compiler a [`ScanReport`]: the
//! marked entrypoints plus the catalog of named types they can refer to.

use std::path::PathBuf;

use path::{PathError, SourceRoot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::{DomainCatalog, RawEntrypoint};

#[derive(Debug, Error)]
/// Errors that can occur during entrypoint discovery
pub enum AdapterError {
    /// The source argument could not be classified
    #[error(transparent)]
    Path(#[from] PathError),
    /// A module could not be read or parsed and the policy is to abort
    #[error("failed to load `{path}`: {message}")]
    Load {
        /// File that failed to load
        path: PathBuf,
        /// Reader or parser message
        message: String,
    },
    /// An entrypoint marker carries options that cannot be understood
    #[error("invalid entrypoint marker in `{path}`: {message}")]
    InvalidMarker {
        /// File holding the marker
        path: PathBuf,
        /// What is wrong with the marker
        message: String,
    },
    /// A manifest could not be read or decoded
    #[error("invalid manifest `{path}`: {message}")]
    Manifest {
        /// Manifest file
        path: PathBuf,
        /// Reader or decoder message
        message: String,
    },
}

/// Result alias for adapter operations
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// What to do with a module that fails to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Stop discovery with [`AdapterError::Load`]
    #[default]
    Abort,
    /// Skip the module, log a warning and record it in the report
    Tolerate,
}

impl LoadPolicy {
    /// Policy for the `tolerate_load_errors` flag.
    pub fn from_tolerate(tolerate: bool) -> Self {
        if tolerate {
            LoadPolicy::Tolerate
        } else {
            LoadPolicy::Abort
        }
    }
}

/// A module skipped under [`LoadPolicy::Tolerate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Skipped file
    pub path: PathBuf,
    /// Why it failed to load
    pub message: String,
}

/// Everything discovery found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScanReport {
    /// Marked entrypoints in discovery order
    pub entrypoints: Vec<RawEntrypoint>,
    /// Named types and imports visible to the entrypoints
    #[serde(default)]
    pub catalog: DomainCatalog,
    /// Modules skipped because they failed to load
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

/// Entrypoint Adapter trait for turning a source location into a [`ScanReport`]
pub trait EntrypointAdapter {
    /// Short name of this adapter, used in logs
    ///
    /// Examples: "rust-source", "manifest"
    fn name(&self) -> &'static str;

    /// Discover entrypoints under `source`.
    ///
    /// Types that are not explicitly marked never become entrypoints; they
    /// only land in the catalog.
    fn scan(&self, source: &SourceRoot) -> AdapterResult<ScanReport>;
}
