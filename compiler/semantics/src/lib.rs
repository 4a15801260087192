#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Semantic analysis for domain services.
//!
//! Maps written Rust types onto the closed set of IR type nodes and derives
//! each method's interaction shape from its resolved signature. Every
//! failure names the exact place in a signature that caused it.

use std::fmt;

use registry::RegistryError;

/// Interaction shape inference
pub mod interaction;
/// Written type to [`ir::TypeNode`] resolution
pub mod resolver;

pub use interaction::classify_shape;
pub use resolver::{Position, ResolvedReturn, TypeResolver};

/// Location inside a service signature, e.g. `Greeter.greet(user).address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePath(String);

impl TypePath {
    /// A method parameter.
    pub fn param(service: &str, method: &str, param: &str) -> Self {
        TypePath(format!("{}.{}({})", service, method, param))
    }

    /// A method's return type.
    pub fn returns(service: &str, method: &str) -> Self {
        TypePath(format!("{}.{} -> return", service, method))
    }

    /// A field below this location.
    pub fn field(&self, name: &str) -> Self { TypePath(format!("{}.{}", self.0, name)) }

    /// The rendered path.
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A written type that has no IR counterpart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeMappingError {
    /// The type cannot cross the wire
    #[error("unsupported type `{ty}` at {path}: {reason}")]
    UnsupportedType {
        /// Where the type was written
        path: TypePath,
        /// Rust spelling of the type
        ty: String,
        /// Why it is not supported
        reason: String,
    },
    /// A record contains itself without an indirection
    #[error(
        "recursive type `{record}` at {path}: it contains itself without a sequence, map, Box or Arc in between"
    )]
    RecursiveType {
        /// Where the recursion was detected
        path: TypePath,
        /// The record (or alias) that contains itself
        record: String,
    },
    /// A stream appears where no interaction shape can be derived from it
    #[error("ambiguous interaction shape at {path}: {reason}")]
    AmbiguousShape {
        /// Where the stream was written
        path: TypePath,
        /// What made the shape ambiguous
        reason: String,
    },
}

impl TypeMappingError {
    /// Stable machine readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TypeMappingError::UnsupportedType { .. } => "unsupported-type",
            TypeMappingError::RecursiveType { .. } => "recursive-type",
            TypeMappingError::AmbiguousShape { .. } => "ambiguous-shape",
        }
    }

    /// Where the problem was found.
    pub fn path(&self) -> &TypePath {
        match self {
            TypeMappingError::UnsupportedType { path, .. }
            | TypeMappingError::RecursiveType { path, .. }
            | TypeMappingError::AmbiguousShape { path, .. } => path,
        }
    }
}

/// Errors that can occur during type resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The written type has no IR counterpart
    #[error(transparent)]
    Mapping(#[from] TypeMappingError),
    /// A named type collides with a different definition of the same name
    #[error(transparent)]
    Conflict(#[from] RegistryError),
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
