#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Type Registry — the single home of every named record and enum.
//!
//! Records and enums are identified globally by name. Registering a second
//! definition under a known name is fine when both are structurally identical
//! (they collapse into one entry, whatever module or service they came from);
//! anything else is a conflict naming both sources.

use std::collections::{BTreeMap, BTreeSet};

use ir::TypeDef;
use thiserror::Error;

/// Errors raised by the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two structurally different definitions share a name
    #[error("type `{name}` is defined differently in `{existing}` and `{incoming}`")]
    Conflict {
        /// Shared name
        name: String,
        /// Source of the definition registered first
        existing: String,
        /// Source of the rejected definition
        incoming: String,
    },
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First definition under this name
    New,
    /// Structurally identical to an existing entry
    Deduplicated,
}

#[derive(Debug, Clone)]
struct Entry {
    def: TypeDef,
    sources: BTreeSet<String>,
}

/// A registry of named type definitions.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    /// Map from type name to its definition
    types: BTreeMap<String, Entry>,
}

impl TypeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self { Self::default() }

    /// Register a definition, deduplicating structurally identical ones.
    pub fn register(&mut self, def: TypeDef) -> Result<Registration, RegistryError> {
        let name = def.name().to_string();
        match self.types.get_mut(&name) {
            None => {
                let sources = BTreeSet::from([def.source().to_string()]);
                self.types.insert(name, Entry { def, sources });
                Ok(Registration::New)
            }
            Some(entry) if entry.def.same_structure(&def) => {
                if entry.sources.insert(def.source().to_string()) {
                    tracing::debug!(
                        name = %name,
                        source = %def.source(),
                        "deduplicated structurally identical type"
                    );
                }
                Ok(Registration::Deduplicated)
            }
            Some(entry) => Err(RegistryError::Conflict {
                name,
                existing: entry.def.source().to_string(),
                incoming: def.source().to_string(),
            }),
        }
    }

    /// Name registered for a source identity, if any.
    pub fn name_for_source(&self, source: &str) -> Option<&str> {
        self.types
            .iter()
            .find(|(_, entry)| entry.sources.contains(source))
            .map(|(name, _)| name.as_str())
    }

    /// Every source identity merged into the entry for `name`.
    pub fn sources(&self, name: &str) -> Vec<&str> {
        self.types
            .get(name)
            .map(|entry| entry.sources.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Consume the registry, yielding definitions keyed by name. Every
    /// deduplicated source is listed on its definition.
    pub fn into_types(self) -> BTreeMap<String, TypeDef> {
        self.types
            .into_iter()
            .map(|(name, Entry { mut def, sources })| {
                let merged: Vec<String> =
                    sources.into_iter().filter(|source| source != def.source()).collect();
                match &mut def {
                    TypeDef::Record(record) => record.merged_sources = merged,
                    TypeDef::Enum(def) => def.merged_sources = merged,
                }
                (name, def)
            })
            .collect()
    }
}

/// Read-only interface to the `TypeRegistry`.
pub trait TypeRegistryReader {
    /// Get all type names in the registry, sorted.
    fn list_types(&self) -> Vec<&str>;

    /// Get a type definition by name.
    fn get_type(&self, name: &str) -> Option<&TypeDef>;

    /// Get the total number of types in the registry.
    fn type_count(&self) -> usize;
}

impl TypeRegistryReader for TypeRegistry {
    fn list_types(&self) -> Vec<&str> { self.types.keys().map(|s| s.as_str()).collect() }

    fn get_type(&self, name: &str) -> Option<&TypeDef> { self.types.get(name).map(|e| &e.def) }

    fn type_count(&self) -> usize { self.types.len() }
}
