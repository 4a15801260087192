#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Portico Intermediate Representation (IR)
//!
//! This crate defines the framework-independent description of domain
//! services that sits between entrypoint discovery and backend code
//! generation. Everything here is plain data: it is built once per run,
//! never mutated afterwards, and can be dumped to JSON for inspection.

pub mod naming;
pub mod service_ir;
pub mod type_node;

pub use service_ir::*;
pub use type_node::*;
