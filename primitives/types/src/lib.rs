#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Raw domain model
//!
//! This crate describes domain sources as they were written, before any type
//! resolution happens: entrypoints with their methods, the syntactic form of
//! every type mentioned, and a catalog of the named type definitions and
//! imports found while scanning. The scanner produces these values, the IR
//! builder consumes them.

/// Source identities (`crate::module::Name`).
pub mod source;
/// Syntactic type expressions.
///
/// A [`TypeExpr`] keeps just enough of a written Rust type (paths, generic
/// arguments, associated type bindings, references and trait bounds) for the
/// resolver to recognise containers, streams and named definitions.
pub mod type_expr;
/// Entrypoints and their methods as declared in the domain.
pub mod entrypoint;
/// Named type definitions and per-module imports.
///
/// The catalog answers "which definition does this written path refer to"
/// using the same rules the Rust compiler would apply for the common cases:
/// local definitions, `use` imports, glob imports and qualified paths.
pub mod catalog;

pub use catalog::{
    DomainCatalog, Import, Lookup, RawEnum, RawField, RawRecord, RawTypeDef, RawVariant,
};
pub use entrypoint::{EntrypointKind, RawEntrypoint, RawMethod, RawParam, Receiver};
pub use source::SourceIdentity;
pub use type_expr::TypeExpr;
