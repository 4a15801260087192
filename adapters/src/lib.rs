#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Entrypoint Adapter Library
//!
//! This module provides the adapters that discover domain service
//! entrypoints and translate them into the raw domain model consumed by the
//! IR builder. Rust sources are scanned syntactically for entrypoint markers;
//! a JSON manifest can register entrypoints explicitly instead.

use std::path::Path;

use path::{classify_source, SourceRoot};

pub mod entrypoint_adapter;
pub mod manifest;
pub mod rust_source;

// Re-export the main adapter types for convenience
pub use entrypoint_adapter::*;
pub use manifest::ManifestAdapter;
pub use rust_source::{RustSourceAdapter, GENERATED_MARKER};

/// Pick the adapter for a classified source.
pub fn adapter_for(source: &SourceRoot, policy: LoadPolicy) -> Box<dyn EntrypointAdapter> {
    match source {
        SourceRoot::Manifest(_) => Box::new(ManifestAdapter),
        _ => Box::new(RustSourceAdapter::new(policy)),
    }
}

/// Classify `input` and scan it with the matching adapter.
pub fn scan_source(input: &Path, policy: LoadPolicy) -> AdapterResult<ScanReport> {
    let source = classify_source(input)?;
    let adapter = adapter_for(&source, policy);
    tracing::info!(source = %input.display(), adapter = adapter.name(), "discovering entrypoints");
    adapter.scan(&source)
}
