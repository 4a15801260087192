//! Manifest adapter: explicit registration instead of scanning.
//!
//! A manifest is the JSON form of a [`ScanReport`]. It lets services be
//! registered from build scripts or other tooling without any marker in the
//! domain sources.

use path::SourceRoot;

use crate::{AdapterError, AdapterResult, EntrypointAdapter, ScanReport};

/// Loads a [`ScanReport`] from a JSON manifest file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestAdapter;

impl EntrypointAdapter for ManifestAdapter {
    fn name(&self) -> &'static str { "manifest" }

    fn scan(&self, source: &SourceRoot) -> AdapterResult<ScanReport> {
        let path = source.scan_root();
        let manifest_error =
            |message: String| AdapterError::Manifest { path: path.to_path_buf(), message };
        let content = std::fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
        let report: ScanReport =
            serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?;
        tracing::debug!(
            path = %path.display(),
            entrypoints = report.entrypoints.len(),
            "loaded entrypoint manifest"
        );
        Ok(report)
    }
}
