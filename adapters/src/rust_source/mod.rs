//! Rust source adapter.
//!
//! Walks a crate's source tree in a stable order, parses every module with
//! `syn` and collects marked entrypoints together with the named types and
//! imports the resolver will need later.

mod collector;
mod syntax;

use std::path::{Path, PathBuf};

use path::{is_skipped_source, module_path_for_file, SourceRoot};
use walkdir::WalkDir;

use self::collector::Collector;
use crate::{AdapterError, AdapterResult, EntrypointAdapter, LoadPolicy, ScanReport, ScanWarning};

/// Marker written at the top of every generated file; such files are never scanned.
pub const GENERATED_MARKER: &str = "@generated";

/// Scans Rust sources for entrypoint markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustSourceAdapter {
    policy: LoadPolicy,
}

impl RustSourceAdapter {
    /// Create an adapter with the given load failure policy.
    pub fn new(policy: LoadPolicy) -> Self { Self { policy } }

    /// The load failure policy in effect.
    pub fn policy(&self) -> LoadPolicy { self.policy }

    fn handle_load_failure(
        &self,
        path: &Path,
        message: String,
        report: &mut ScanReport,
    ) -> AdapterResult<()> {
        match self.policy {
            LoadPolicy::Abort => Err(AdapterError::Load { path: path.to_path_buf(), message }),
            LoadPolicy::Tolerate => {
                tracing::warn!(path = %path.display(), %message, "skipping module that failed to load");
                report.warnings.push(ScanWarning { path: path.to_path_buf(), message });
                Ok(())
            }
        }
    }
}

impl EntrypointAdapter for RustSourceAdapter {
    fn name(&self) -> &'static str { "rust-source" }

    fn scan(&self, source: &SourceRoot) -> AdapterResult<ScanReport> {
        let mut report = ScanReport::default();
        let mut collector = Collector::default();

        let files = source_files(source, &mut |path, message| {
            self.handle_load_failure(path, message, &mut report)
        })?;
        for file in files {
            let module = match source {
                SourceRoot::File(_) => vec![types::source::CRATE_ROOT.to_string()],
                _ => match module_path_for_file(source.scan_root(), &file) {
                    Some(module) => module,
                    None => continue,
                },
            };

            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(err) => {
                    self.handle_load_failure(&file, err.to_string(), &mut report)?;
                    continue;
                }
            };
            if content.lines().next().map(|line| line.contains(GENERATED_MARKER)).unwrap_or(false) {
                tracing::debug!(path = %file.display(), "skipping generated module");
                continue;
            }
            let parsed = match syn::parse_file(&content) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let start = err.span().start();
                    let message = format!("{}:{}: {}", start.line, start.column + 1, err);
                    self.handle_load_failure(&file, message, &mut report)?;
                    continue;
                }
            };
            tracing::trace!(path = %file.display(), module = %module.join("::"), "scanning module");
            collector.visit_items(&file, &module, &parsed.items)?;
        }

        let (entrypoints, catalog) = collector.finish();
        tracing::debug!(
            entrypoints = entrypoints.len(),
            types = catalog.len(),
            skipped = report.warnings.len(),
            "source scan complete"
        );
        report.entrypoints = entrypoints;
        report.catalog = catalog;
        Ok(report)
    }
}

/// Every `.rs` file under the source, sorted by path.
fn source_files(
    source: &SourceRoot,
    on_error: &mut dyn FnMut(&Path, String) -> AdapterResult<()>,
) -> AdapterResult<Vec<PathBuf>> {
    let root = source.scan_root();
    if let SourceRoot::File(file) = source {
        return Ok(vec![file.clone()]);
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_name().to_str().map(|name| name.starts_with('.')).unwrap_or(true)
    });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                on_error(&path, err.to_string())?;
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("rs")
            && !is_skipped_source(root, path)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
