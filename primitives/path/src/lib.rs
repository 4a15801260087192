// SPDX-License-Identifier: CC0-1.0

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Path utility functions for locating domain sources and laying out output.
//!
//! This module provides utilities for classifying the source argument given
//! to the compiler, mapping Rust source files to module paths, and validating
//! the relative paths of generated artifacts.

pub mod path_utils;

// Re-export for convenience
pub use path_utils::*;
