//! IR Validation
//!
//! Consistency checks over a built [`ServiceIR`]: names that would collide
//! once turned into routes and envelopes in generated code.

use std::collections::HashMap;

use ir::naming::{request_envelope, response_envelope, snake_case, wire_method_name};
use ir::{Service, ServiceIR};

use crate::{IrError, Result};

/// IR Validator
#[derive(Debug, Default, Clone, Copy)]
pub struct IrValidator;

impl IrValidator {
    /// Create a new IR validator
    pub fn new() -> Self { Self }

    /// Check the IR, failing on the first inconsistency.
    pub fn validate(&self, ir: &ServiceIR) -> Result<()> {
        self.check_services(ir)?;
        for service in ir.services() {
            self.check_methods(service)?;
        }
        self.check_reserved_names(ir)
    }

    fn check_services(&self, ir: &ServiceIR) -> Result<()> {
        let mut seen: HashMap<String, &Service> = HashMap::new();
        for service in ir.services() {
            if let Some(first) = seen.insert(snake_case(&service.name), service) {
                return Err(IrError::DuplicateService {
                    name: service.name.clone(),
                    first: first.source.clone(),
                    second: service.source.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_methods(&self, service: &Service) -> Result<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for method in &service.methods {
            let wire_name = wire_method_name(&method.name);
            if let Some(first) = seen.insert(wire_name.clone(), &method.name) {
                return Err(IrError::DuplicateMethod {
                    service: service.name.clone(),
                    source_path: service.source.clone(),
                    first: first.to_string(),
                    second: method.name.clone(),
                    wire_name,
                });
            }
        }
        Ok(())
    }

    fn check_reserved_names(&self, ir: &ServiceIR) -> Result<()> {
        for (service, method) in ir.methods() {
            for envelope in
                [request_envelope(&service.name, &method.name), response_envelope(&service.name, &method.name)]
            {
                if let Some(def) = ir.get_type(&envelope) {
                    return Err(IrError::ReservedName {
                        name: envelope,
                        source_path: def.source().to_string(),
                        service: service.name.clone(),
                        method: method.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
