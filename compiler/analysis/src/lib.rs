#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Portico Service IR construction
//!
//! Turns scanned entrypoints into a [`ir::ServiceIR`]: every parameter and
//! return type is resolved through the semantic layer, every method gets its
//! interaction shape, and the finished IR is checked for consistency before
//! any generator sees it.

use registry::RegistryError;
use semantics::{ResolveError, TypeMappingError};
use thiserror::Error;

pub mod builder;
pub mod validator;

pub use builder::ServiceIrBuilder;
pub use validator::IrValidator;

/// Errors raised while building or checking the service IR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    /// A parameter, return or field type has no IR counterpart
    #[error(transparent)]
    TypeMapping(#[from] TypeMappingError),
    /// Two methods of one service share a wire name
    #[error(
        "service `{service}` ({source_path}) declares both `{first}` and `{second}`, which map to the same wire name `{wire_name}`"
    )]
    DuplicateMethod {
        /// Service name
        service: String,
        /// Source identity of the service
        source_path: String,
        /// Method declared first
        first: String,
        /// Colliding method
        second: String,
        /// Shared wire name
        wire_name: String,
    },
    /// Two entrypoints produce the same service name
    #[error("service name `{name}` is declared by both {first} and {second}")]
    DuplicateService {
        /// Service name
        name: String,
        /// Source identity of the first service
        first: String,
        /// Source identity of the second service
        second: String,
    },
    /// One record name, two different structures
    #[error("record `{name}` is defined differently by {existing} and {incoming}")]
    RecordNameConflict {
        /// Record name
        name: String,
        /// Source identity registered first
        existing: String,
        /// Conflicting source identity
        incoming: String,
    },
    /// A streamed parameter shares its method with other parameters
    #[error(
        "`{service}.{method}`: streamed parameter `{param}` must be the only parameter of its method"
    )]
    InvalidStreamSignature {
        /// Service name
        service: String,
        /// Method name
        method: String,
        /// The streamed parameter
        param: String,
    },
    /// The method cannot be called on a shared service instance
    #[error(
        "`{service}.{method}` takes `{receiver}`; generated servers share one instance across concurrent calls, use `&self`"
    )]
    UnsupportedReceiver {
        /// Service name
        service: String,
        /// Method name
        method: String,
        /// Receiver as written
        receiver: &'static str,
    },
    /// The returned future or stream is not known to be `Send`
    #[error("`{service}.{method}` returns a {what} that is not known to be `Send`; {hint}")]
    UnsendableReturn {
        /// Service name
        service: String,
        /// Method name
        method: String,
        /// `future` or `stream`
        what: &'static str,
        /// How to declare the method instead
        hint: &'static str,
    },
    /// A domain type is named like a generated envelope
    #[error("type `{name}` ({source_path}) collides with the envelope generated for `{service}.{method}`")]
    ReservedName {
        /// The colliding type name
        name: String,
        /// Source identity of the type
        source_path: String,
        /// Service name
        service: String,
        /// Method name
        method: String,
    },
}

impl IrError {
    /// Stable machine readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IrError::TypeMapping(err) => err.code(),
            IrError::DuplicateMethod { .. } => "duplicate-method",
            IrError::DuplicateService { .. } => "duplicate-service",
            IrError::RecordNameConflict { .. } => "record-name-conflict",
            IrError::InvalidStreamSignature { .. } => "invalid-stream-signature",
            IrError::UnsupportedReceiver { .. } => "unsupported-receiver",
            IrError::UnsendableReturn { .. } => "unsendable-return",
            IrError::ReservedName { .. } => "reserved-name",
        }
    }

    /// Whether the error comes from type mapping rather than IR consistency.
    pub fn is_type_mapping(&self) -> bool { matches!(self, IrError::TypeMapping(_)) }
}

impl From<ResolveError> for IrError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Mapping(err) => IrError::TypeMapping(err),
            ResolveError::Conflict(RegistryError::Conflict { name, existing, incoming }) =>
                IrError::RecordNameConflict { name, existing, incoming },
        }
    }
}

/// Result alias for IR construction.
pub type Result<T> = std::result::Result<T, IrError>;
