//! Emission Writer
//!
//! Lays an [`ArtifactTree`] out under an output root. Every artifact path is
//! validated before the first byte is written, so a malformed tree leaves the
//! output directory untouched. Existing files are overwritten; nothing is
//! merged. A write that fails halfway leaves the previous files in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use codegen::ArtifactTree;
use path::{validate_artifact_path, PathError};
use thiserror::Error;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// How long a rustfmt pass may run before it is killed.
pub const RUSTFMT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while writing artifacts.
#[derive(Debug, Error)]
pub enum EmissionError {
    /// An artifact path is absolute or climbs out of the output root
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    /// A directory or file could not be created or written
    #[error("failed to write `{path}`: {source}")]
    Io {
        /// Path being created or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl EmissionError {
    /// Stable machine readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EmissionError::InvalidPath(_) => "invalid-path",
            EmissionError::Io { .. } => "io",
        }
    }
}

/// Writes artifact trees to disk.
#[derive(Debug, Clone)]
pub struct EmissionWriter {
    rustfmt: bool,
    rustfmt_timeout: Duration,
}

impl Default for EmissionWriter {
    fn default() -> Self { Self { rustfmt: false, rustfmt_timeout: RUSTFMT_TIMEOUT } }
}

impl EmissionWriter {
    /// Writer without a formatting pass.
    pub fn new() -> Self { Self::default() }

    /// Run rustfmt over the written `.rs` files.
    pub fn with_rustfmt(mut self, enabled: bool) -> Self {
        self.rustfmt = enabled;
        self
    }

    /// Bound of the rustfmt pass.
    pub fn with_rustfmt_timeout(mut self, timeout: Duration) -> Self {
        self.rustfmt_timeout = timeout;
        self
    }

    /// Write every artifact under `output_root` and return the written paths
    /// in tree order.
    ///
    /// Artifacts are first written to a staging directory inside the output
    /// root, then renamed into place. A failure while committing restores
    /// the files that were already replaced, so the tree lands whole or not
    /// at all.
    pub fn write(&self, tree: &ArtifactTree, output_root: &Path) -> Result<Vec<PathBuf>, EmissionError> {
        let planned = tree
            .iter()
            .map(|artifact| {
                validate_artifact_path(&artifact.path)
                    .map(|relative| (relative, artifact.content.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        fs::create_dir_all(output_root)
            .map_err(|source| EmissionError::Io { path: output_root.to_path_buf(), source })?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_root)
            .map_err(|source| EmissionError::Io { path: output_root.to_path_buf(), source })?;

        for (relative, content) in &planned {
            let staged = staging.path().join(STAGED).join(relative);
            create_parent(&staged)?;
            fs::write(&staged, content)
                .map_err(|source| EmissionError::Io { path: staged.clone(), source })?;
        }

        let mut commit = Commit::new(staging.path());
        for (relative, content) in &planned {
            if let Err(err) = commit.place(relative, output_root) {
                commit.roll_back(output_root);
                return Err(err);
            }
            debug!(path = %output_root.join(relative).display(), bytes = content.len(), "wrote artifact");
        }
        let written: Vec<PathBuf> =
            planned.iter().map(|(relative, _)| output_root.join(relative)).collect();
        if let Err(err) = staging.close() {
            debug!(error = %err, "staging directory was not removed");
        }
        info!(root = %output_root.display(), files = written.len(), "emitted artifacts");

        if self.rustfmt {
            let sources: Vec<&Path> = written
                .iter()
                .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
                .map(PathBuf::as_path)
                .collect();
            if let Err(message) = format_with_rustfmt(&sources, self.rustfmt_timeout) {
                warn!(%message, "rustfmt pass failed; generated files are left unformatted");
            }
        }
        Ok(written)
    }
}

const STAGING_PREFIX: &str = ".portico-staging-";
const STAGED: &str = "new";
const REPLACED: &str = "old";

fn create_parent(path: &Path) -> Result<(), EmissionError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|source| EmissionError::Io { path: parent.to_path_buf(), source }),
        None => Ok(()),
    }
}

/// Renames staged artifacts into the output root, keeping whatever they
/// replace until the whole tree is in place.
struct Commit<'a> {
    staging: &'a Path,
    /// `(relative path, whether a previous file was moved aside)`
    placed: Vec<(PathBuf, bool)>,
}

impl<'a> Commit<'a> {
    fn new(staging: &'a Path) -> Self { Self { staging, placed: Vec::new() } }

    fn place(&mut self, relative: &Path, output_root: &Path) -> Result<(), EmissionError> {
        let target = output_root.join(relative);
        create_parent(&target)?;

        let replaced = target.is_file();
        if replaced {
            let aside = self.staging.join(REPLACED).join(relative);
            create_parent(&aside)?;
            fs::rename(&target, &aside)
                .map_err(|source| EmissionError::Io { path: target.clone(), source })?;
        }
        let staged = self.staging.join(STAGED).join(relative);
        if let Err(source) = fs::rename(&staged, &target) {
            if replaced {
                let _ = fs::rename(self.staging.join(REPLACED).join(relative), &target);
            }
            return Err(EmissionError::Io { path: target, source });
        }
        self.placed.push((relative.to_path_buf(), replaced));
        Ok(())
    }

    /// Undo every placement, newest first.
    fn roll_back(self, output_root: &Path) {
        for (relative, replaced) in self.placed.iter().rev() {
            let target = output_root.join(relative);
            let restored = if *replaced {
                fs::rename(self.staging.join(REPLACED).join(relative), &target)
            } else {
                fs::remove_file(&target)
            };
            if let Err(err) = restored {
                warn!(path = %target.display(), error = %err, "could not restore file after a failed write");
            }
        }
    }
}

/// Run rustfmt over `files`, killing it once `timeout` elapses.
fn format_with_rustfmt(files: &[&Path], timeout: Duration) -> Result<(), String> {
    if files.is_empty() {
        return Ok(());
    }
    let mut child = Command::new("rustfmt")
        .arg("--edition=2021")
        .args(files)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("could not start rustfmt: {}", err))?;

    match child.wait_timeout(timeout).map_err(|err| err.to_string())? {
        Some(status) if status.success() => Ok(()),
        Some(status) => Err(format!("rustfmt exited with {}", status)),
        None => {
            // Best effort; the files are already on disk.
            let _ = child.kill();
            let _ = child.wait();
            Err(format!("rustfmt did not finish within {}s", timeout.as_secs()))
        }
    }
}
