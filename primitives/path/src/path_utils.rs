// SPDX-License-Identifier: CC0-1.0

//! Path utility functions for locating domain sources and laying out output.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use types::source::CRATE_ROOT;

/// Directory name used for generated output when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Errors raised while classifying or validating paths.
#[derive(Debug, Error)]
pub enum PathError {
    /// The source argument does not exist
    #[error("source path `{0}` does not exist")]
    NotFound(PathBuf),
    /// The source argument is neither a directory, a `.rs` file nor a `.json` manifest
    #[error("source path `{0}` is not a directory, a Rust file or a JSON manifest")]
    UnsupportedSource(PathBuf),
    /// An artifact path escapes the output root or is otherwise malformed
    #[error("invalid artifact path `{path}`: {reason}")]
    InvalidArtifactPath {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// What the user pointed the compiler at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRoot {
    /// A Cargo package; its `src/` directory is scanned
    Crate {
        /// Directory holding `Cargo.toml`
        manifest_dir: PathBuf,
        /// The package's `src/` directory
        src_dir: PathBuf,
    },
    /// A plain directory of Rust sources, treated as the crate root module
    Directory(PathBuf),
    /// A single Rust file, treated as the crate root module
    File(PathBuf),
    /// A JSON manifest listing entrypoints explicitly
    Manifest(PathBuf),
}

impl SourceRoot {
    /// Directory or file whose contents map onto the `crate` module.
    pub fn scan_root(&self) -> &Path {
        match self {
            SourceRoot::Crate { src_dir, .. } => src_dir,
            SourceRoot::Directory(path) | SourceRoot::File(path) | SourceRoot::Manifest(path) => {
                path
            }
        }
    }

    /// Where output goes when no output directory is configured.
    pub fn default_output_dir(&self) -> PathBuf {
        match self {
            SourceRoot::Crate { src_dir, .. } => src_dir.join(DEFAULT_OUTPUT_DIR),
            SourceRoot::Directory(path) => path.join(DEFAULT_OUTPUT_DIR),
            SourceRoot::File(path) | SourceRoot::Manifest(path) => path
                .parent()
                .map(|parent| parent.join(DEFAULT_OUTPUT_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }
}

/// Classify the source argument.
///
/// A directory containing both `Cargo.toml` and `src/` is a crate; any other
/// directory is scanned as is. Files are accepted by extension.
pub fn classify_source(input: &Path) -> Result<SourceRoot, PathError> {
    if !input.exists() {
        return Err(PathError::NotFound(input.to_path_buf()));
    }
    if input.is_dir() {
        let src_dir = input.join("src");
        if input.join("Cargo.toml").is_file() && src_dir.is_dir() {
            return Ok(SourceRoot::Crate { manifest_dir: input.to_path_buf(), src_dir });
        }
        return Ok(SourceRoot::Directory(input.to_path_buf()));
    }
    match input.extension().and_then(|ext| ext.to_str()) {
        Some("rs") => Ok(SourceRoot::File(input.to_path_buf())),
        Some("json") => Ok(SourceRoot::Manifest(input.to_path_buf())),
        _ => Err(PathError::UnsupportedSource(input.to_path_buf())),
    }
}

/// Module path of `file` relative to the crate `root` directory.
///
/// `lib.rs` and `main.rs` at the root map to `crate`, `a/mod.rs` to
/// `crate::a`, and `a/b.rs` to `crate::a::b`. Returns `None` for files
/// outside the root or with non UTF-8 names.
pub fn module_path_for_file(root: &Path, file: &Path) -> Option<Vec<String>> {
    let relative = file.strip_prefix(root).ok()?;
    let mut module = vec![CRATE_ROOT.to_string()];
    let components: Vec<&str> =
        relative.components().map(|c| c.as_os_str().to_str()).collect::<Option<_>>()?;
    let (file_name, dirs) = components.split_last()?;
    module.extend(dirs.iter().map(|dir| dir.to_string()));

    let stem = file_name.strip_suffix(".rs")?;
    let at_root = dirs.is_empty();
    match stem {
        "mod" => {}
        "lib" | "main" if at_root => {}
        other => module.push(other.to_string()),
    }
    Some(module)
}

/// Whether a source file should be left out of scanning.
///
/// Modules whose name starts with `_` are private by convention, and the
/// `bin/` directory holds separate crates.
pub fn is_skipped_source(root: &Path, file: &Path) -> bool {
    let Ok(relative) = file.strip_prefix(root) else {
        return true;
    };
    let mut components = relative.components();
    if let Some(Component::Normal(first)) = components.next() {
        if first.to_str() == Some("bin") && components.next().is_some() {
            return true;
        }
    }
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_str().map(|name| name.starts_with('_')).unwrap_or(true),
        _ => false,
    })
}

/// Validate an artifact path relative to an output root.
///
/// The path must be non-empty, relative and must not climb out of the root.
pub fn validate_artifact_path(relative: &str) -> Result<PathBuf, PathError> {
    let invalid = |reason| PathError::InvalidArtifactPath { path: relative.to_string(), reason };
    if relative.trim().is_empty() {
        return Err(invalid("empty path"));
    }
    let path = Path::new(relative);
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory components are not allowed")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("path must be relative")),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn module(root: &str, file: &str) -> Option<String> {
        module_path_for_file(Path::new(root), Path::new(file)).map(|m| m.join("::"))
    }

    #[test]
    fn module_paths_follow_rust_layout() {
        assert_eq!(module("/src", "/src/lib.rs").as_deref(), Some("crate"));
        assert_eq!(module("/src", "/src/main.rs").as_deref(), Some("crate"));
        assert_eq!(module("/src", "/src/greeter.rs").as_deref(), Some("crate::greeter"));
        assert_eq!(module("/src", "/src/greeter/mod.rs").as_deref(), Some("crate::greeter"));
        assert_eq!(module("/src", "/src/greeter/model.rs").as_deref(), Some("crate::greeter::model"));
        assert_eq!(module("/src", "/src/a/main.rs").as_deref(), Some("crate::a::main"));
        assert_eq!(module("/src", "/other/lib.rs"), None);
        assert_eq!(module("/src", "/src/notes.txt"), None);
    }

    #[test]
    fn underscore_modules_and_bins_are_skipped() {
        let root = Path::new("/src");
        assert!(is_skipped_source(root, Path::new("/src/_private.rs")));
        assert!(is_skipped_source(root, Path::new("/src/_internal/model.rs")));
        assert!(is_skipped_source(root, Path::new("/src/bin/tool.rs")));
        assert!(!is_skipped_source(root, Path::new("/src/bin.rs")));
        assert!(!is_skipped_source(root, Path::new("/src/greeter.rs")));
    }

    #[test]
    fn artifact_paths_must_stay_inside_the_root() {
        assert_eq!(validate_artifact_path("models.rs").expect("valid"), PathBuf::from("models.rs"));
        assert_eq!(
            validate_artifact_path("./nested/client.rs").expect("valid"),
            PathBuf::from("nested/client.rs")
        );
        assert!(validate_artifact_path("../escape.rs").is_err());
        assert!(validate_artifact_path("/abs.rs").is_err());
        assert!(validate_artifact_path("").is_err());
        assert!(validate_artifact_path(".").is_err());
    }

    #[test]
    fn classify_recognises_crates_directories_and_files() {
        let dir = tempdir().expect("tempdir");
        let crate_dir = dir.path().join("demo");
        std::fs::create_dir_all(crate_dir.join("src")).expect("mkdir");
        std::fs::write(crate_dir.join("Cargo.toml"), "[package]\nname = \"demo\"\n").expect("write");
        std::fs::write(dir.path().join("single.rs"), "").expect("write");
        std::fs::write(dir.path().join("manifest.json"), "{}").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "").expect("write");

        match classify_source(&crate_dir).expect("crate") {
            SourceRoot::Crate { src_dir, .. } => assert_eq!(src_dir, crate_dir.join("src")),
            other => panic!("expected crate, got {:?}", other),
        }
        assert_eq!(
            classify_source(&crate_dir.join("src")).expect("dir"),
            SourceRoot::Directory(crate_dir.join("src"))
        );
        assert!(matches!(classify_source(&dir.path().join("single.rs")), Ok(SourceRoot::File(_))));
        assert!(matches!(
            classify_source(&dir.path().join("manifest.json")),
            Ok(SourceRoot::Manifest(_))
        ));
        assert!(matches!(
            classify_source(&dir.path().join("notes.txt")),
            Err(PathError::UnsupportedSource(_))
        ));
        assert!(matches!(
            classify_source(&dir.path().join("missing")),
            Err(PathError::NotFound(_))
        ));
        assert_eq!(
            SourceRoot::Crate { manifest_dir: crate_dir.clone(), src_dir: crate_dir.join("src") }
                .default_output_dir(),
            crate_dir.join("src").join("generated")
        );
    }
}
