#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Code generation for Portico services.
//!
//! A [`Generator`] turns a [`ServiceIR`] into an [`ArtifactTree`]: the Rust
//! source files of a transport layer (wire models, client and server) for one
//! backend. Generators are pure functions of their inputs; nothing here
//! touches the filesystem. The [`BackendRegistry`] lists every compiled-in
//! generator by name.

use std::fmt;

use ir::{InteractionShape, ServiceIR};
use thiserror::Error;

/// Sub-crate: **`generators`**
///
/// The built-in backends and the pieces they share.
pub mod generators;

/// Sub-crate: **`registry`**
///
/// Static registry of the compiled-in backends.
pub mod registry;

/// Sub-crate: **`utils`**
///
/// Identifier, type and path rendering for generated code.
pub mod utils;

pub use registry::BackendRegistry;

/// Error type for code generation operations in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// No backend is registered under the requested name.
    #[error("unknown backend `{name}`; available backends: {}", available.join(", "))]
    UnknownBackend {
        /// Requested name
        name: String,
        /// Registered names, in registry order
        available: Vec<String>,
    },
    /// The backend cannot express a method's interaction shape.
    #[error("backend `{backend}` cannot generate `{service}.{method}`: {shape} methods are not supported")]
    UnsupportedShape {
        /// Backend name
        backend: String,
        /// Service name
        service: String,
        /// Method name
        method: String,
        /// The unsupported shape
        shape: InteractionShape,
    },
    /// Formatting error when building generated source.
    #[error("failed to render generated source")]
    Fmt,
}

impl From<fmt::Error> for CodegenError {
    fn from(_: fmt::Error) -> Self { CodegenError::Fmt }
}

impl CodegenError {
    /// Stable machine readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CodegenError::UnknownBackend { .. } => "unknown-backend",
            CodegenError::UnsupportedShape { .. } => "unsupported-shape",
            CodegenError::Fmt => "render",
        }
    }
}

/// Convenient result type for codegen functions in this crate.
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Default bound of the queues behind generated stream channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Inputs that shape generated code beyond the IR itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Rust path that replaces the leading `crate` of domain source
    /// identities, e.g. `crate` when the output lives inside the domain
    /// crate or `::my_domain` when it lives elsewhere.
    pub domain_crate: String,
    /// Bound of the client-side stream queues.
    pub channel_capacity: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self { domain_crate: "crate".to_string(), channel_capacity: DEFAULT_CHANNEL_CAPACITY }
    }
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the output root, `/`-separated
    pub path: String,
    /// File contents
    pub content: String,
}

/// The complete output of one generator run, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTree {
    artifacts: Vec<Artifact>,
}

impl ArtifactTree {
    /// Create an empty tree.
    pub fn new() -> Self { Self::default() }

    /// Add or replace the artifact at `path`. Trailing whitespace is trimmed
    /// from every line and the file ends with exactly one newline.
    pub fn insert(&mut self, path: impl Into<String>, content: &str) {
        let artifact = Artifact { path: path.into(), content: clean_generated_source(content) };
        match self.artifacts.binary_search_by(|existing| existing.path.cmp(&artifact.path)) {
            Ok(index) => self.artifacts[index] = artifact,
            Err(index) => self.artifacts.insert(index, artifact),
        }
    }

    /// Artifact at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.path == path)
    }

    /// Artifacts in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> { self.artifacts.iter() }

    /// Artifact paths in order.
    pub fn paths(&self) -> Vec<&str> { self.artifacts.iter().map(|a| a.path.as_str()).collect() }

    /// Number of artifacts.
    pub fn len(&self) -> usize { self.artifacts.len() }

    /// Whether the tree holds no artifacts.
    pub fn is_empty(&self) -> bool { self.artifacts.is_empty() }

    /// Total size of all artifacts in bytes.
    pub fn total_bytes(&self) -> usize { self.artifacts.iter().map(|a| a.content.len()).sum() }
}

impl<'a> IntoIterator for &'a ArtifactTree {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter { self.artifacts.iter() }
}

/// A backend that renders a [`ServiceIR`] into source files.
pub trait Generator: Send + Sync {
    /// Registry name, e.g. `axum`.
    fn name(&self) -> &'static str;

    /// One-line description for help output.
    fn description(&self) -> &'static str;

    /// Whether methods of `shape` can be generated.
    fn supports(&self, shape: InteractionShape) -> bool;

    /// Render every artifact. Fails before producing anything when a method
    /// has an unsupported shape.
    fn generate(&self, ir: &ServiceIR, options: &GeneratorOptions) -> Result<ArtifactTree>;
}

/// Fail with [`CodegenError::UnsupportedShape`] on the first method the
/// generator cannot express.
pub fn ensure_supported(generator: &dyn Generator, ir: &ServiceIR) -> Result<()> {
    match ir.methods().find(|(_, method)| !generator.supports(method.shape)) {
        Some((service, method)) => Err(CodegenError::UnsupportedShape {
            backend: generator.name().to_string(),
            service: service.name.clone(),
            method: method.name.clone(),
            shape: method.shape,
        }),
        None => Ok(()),
    }
}

/// Trim trailing whitespace from each line and drop trailing blank lines.
/// Always ensures the returned string ends with a single newline when not empty.
fn clean_generated_source(src: &str) -> String {
    let mut lines: Vec<&str> = src.lines().map(str::trim_end).collect();

    while matches!(lines.last(), Some(line) if line.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_tree_orders_and_cleans() {
        let mut tree = ArtifactTree::new();
        tree.insert("wire.rs", "a  \n\n\n");
        tree.insert("mod.rs", "b");
        tree.insert("client.rs", "c\t\n");
        tree.insert("mod.rs", "replaced");

        assert_eq!(tree.paths(), vec!["client.rs", "mod.rs", "wire.rs"]);
        assert_eq!(tree.get("wire.rs").map(|a| a.content.as_str()), Some("a\n"));
        assert_eq!(tree.get("mod.rs").map(|a| a.content.as_str()), Some("replaced\n"));
        assert_eq!(tree.total_bytes(), 2 + 9 + 2);
    }

    #[test]
    fn unknown_backend_lists_alternatives() {
        let err = CodegenError::UnknownBackend {
            name: "grpc".into(),
            available: vec!["axum".into(), "jsonrpc".into()],
        };
        assert_eq!(err.to_string(), "unknown backend `grpc`; available backends: axum, jsonrpc");
        assert_eq!(err.code(), "unknown-backend");
    }
}
