//! Registry of the compiled-in backends.
//!
//! The registry is built once and handed to the pipeline; backends are looked
//! up by name and listed in registration order.

use ir::InteractionShape;

use crate::generators::{AxumGenerator, JsonRpcGenerator};
use crate::{CodegenError, Generator, Result};

/// Name of the backend used when none is requested.
pub const DEFAULT_BACKEND: &str = "axum";

/// Every backend this build of Portico can target.
pub struct BackendRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl BackendRegistry {
    /// Registry holding the built-in backends.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(AxumGenerator));
        registry.register(Box::new(JsonRpcGenerator));
        registry
    }

    /// Registry with no backends.
    pub fn empty() -> Self { Self { generators: Vec::new() } }

    /// Add a backend, replacing any registered under the same name.
    pub fn register(&mut self, generator: Box<dyn Generator>) {
        match self.generators.iter().position(|existing| existing.name() == generator.name()) {
            Some(index) => self.generators[index] = generator,
            None => self.generators.push(generator),
        }
    }

    /// Backend registered as `name`.
    pub fn get(&self, name: &str) -> Result<&dyn Generator> {
        self.generators
            .iter()
            .find(|generator| generator.name() == name)
            .map(|generator| &**generator)
            .ok_or_else(|| CodegenError::UnknownBackend {
                name: name.to_string(),
                available: self.list().into_iter().map(str::to_string).collect(),
            })
    }

    /// Registered names in registration order.
    pub fn list(&self) -> Vec<&'static str> {
        self.generators.iter().map(|generator| generator.name()).collect()
    }

    /// `(name, description, supports streaming)` of every backend.
    pub fn describe(&self) -> Vec<(&'static str, &'static str, bool)> {
        self.generators
            .iter()
            .map(|generator| {
                let streaming = InteractionShape::ALL
                    .iter()
                    .filter(|shape| shape.is_streaming())
                    .all(|shape| generator.supports(*shape));
                (generator.name(), generator.description(), streaming)
            })
            .collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self { Self::builtin() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_builtin_backends() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.list(), vec!["axum", "jsonrpc"]);
        assert!(registry.get(DEFAULT_BACKEND).is_ok());
        let streaming: Vec<bool> = registry.describe().iter().map(|entry| entry.2).collect();
        assert_eq!(streaming, vec![true, false]);
    }

    #[test]
    fn unknown_backend_names_the_alternatives() {
        let registry = BackendRegistry::builtin();
        match registry.get("grpc") {
            Err(CodegenError::UnknownBackend { name, available }) => {
                assert_eq!(name, "grpc");
                assert_eq!(available, vec!["axum".to_string(), "jsonrpc".to_string()]);
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(generator) => panic!("unexpected backend {}", generator.name()),
        }
    }
}
