// SPDX-License-Identifier: CC0-1.0

//! Portico umbrella crate.
//!
//! This crate primarily serves as the workspace root.
//!
//! All functional code lives in the workspace member crates: the scanner
//! under `adapters`, the IR and path primitives under `primitives`, the
//! resolver, builder, generators and pipeline under `compiler`, and the
//! `portico` binary under `cli`.

#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Miscellaneous metadata about the Portico workspace.
pub mod portico_meta {
    /// Version string for the umbrella crate, as reported by Cargo.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
