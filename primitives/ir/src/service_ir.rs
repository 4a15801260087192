//! Services, methods and the named type registry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::TypeNode;

/// How a method exchanges data with its caller. Derived from the signature,
/// never declared by the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionShape {
    /// One request, one response
    Unary,
    /// One request, no response payload
    FireAndForget,
    /// A stream of requests, at most one response
    RequestStream,
    /// One request, a stream of responses
    ResponseStream,
    /// Independent request and response streams
    Duplex,
}

impl InteractionShape {
    /// Every shape, in declaration order.
    pub const ALL: [InteractionShape; 5] = [
        InteractionShape::Unary,
        InteractionShape::FireAndForget,
        InteractionShape::RequestStream,
        InteractionShape::ResponseStream,
        InteractionShape::Duplex,
    ];

    /// Human readable name used in inspection output and diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            InteractionShape::Unary => "unary",
            InteractionShape::FireAndForget => "fire-and-forget",
            InteractionShape::RequestStream => "request-stream",
            InteractionShape::ResponseStream => "response-stream",
            InteractionShape::Duplex => "duplex",
        }
    }

    /// Whether any side of the exchange is a stream.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            InteractionShape::RequestStream
                | InteractionShape::ResponseStream
                | InteractionShape::Duplex
        )
    }

    /// Whether the caller sends a stream of inputs.
    pub fn streams_requests(&self) -> bool {
        matches!(self, InteractionShape::RequestStream | InteractionShape::Duplex)
    }

    /// Whether the caller receives a stream of outputs.
    pub fn streams_responses(&self) -> bool {
        matches!(self, InteractionShape::ResponseStream | InteractionShape::Duplex)
    }
}

impl fmt::Display for InteractionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.display_name()) }
}

/// Whether a service was declared as a concrete type or as a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// A concrete type with inherent methods
    #[default]
    Type,
    /// A trait implemented elsewhere
    Trait,
}

/// Parameter definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Resolved parameter type
    pub ty: TypeNode,
    /// False when the type is optional
    pub required: bool,
    /// The domain method borrows this argument
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub by_ref: bool,
}

/// A callable member of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Method name, unique within its service
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<ParamDef>,
    /// Return type; `None` when the method returns nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeNode>,
    /// Interaction shape derived from the signature
    pub shape: InteractionShape,
    /// The domain method returns `Result<_, E>`
    #[serde(default)]
    pub fallible: bool,
    /// The domain method is `async`
    #[serde(default)]
    pub is_async: bool,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MethodSignature {
    /// The single streamed parameter of a request-streaming method.
    pub fn stream_param(&self) -> Option<&ParamDef> {
        self.params.iter().find(|param| param.ty.is_stream())
    }

    /// The payload type a caller receives, with any stream wrapper removed.
    pub fn response_payload(&self) -> Option<&TypeNode> {
        self.returns.as_ref().map(|ty| ty.stream_item().unwrap_or(ty))
    }
}

/// A domain entrypoint exposed over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service name, unique within the IR
    pub name: String,
    /// Concrete type or trait
    #[serde(default)]
    pub kind: ServiceKind,
    /// Fully-qualified source identity (`crate::module::Type`)
    pub source: String,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Methods in declaration order
    pub methods: Vec<MethodSignature>,
}

impl Service {
    /// Find a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Whether any method of this service streams.
    pub fn has_streaming(&self) -> bool {
        self.methods.iter().any(|method| method.shape.is_streaming())
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Resolved field type
    pub ty: TypeNode,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    /// False when the type is optional.
    pub fn required(&self) -> bool { !self.ty.is_optional() }
}

/// A named structured type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDef {
    /// Record name
    pub name: String,
    /// Fully-qualified source identity of the first definition seen
    pub source: String,
    /// Other source identities with an identical structure merged into this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_sources: Vec<String>,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    /// Structural equality: same name and the same fields in the same order.
    /// Sources and documentation are ignored.
    pub fn same_structure(&self, other: &RecordDef) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| a.name == b.name && a.ty == b.ty)
    }
}

/// One value of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Value name
    pub name: String,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named closed set of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    /// Enum name
    pub name: String,
    /// Fully-qualified source identity of the first definition seen
    pub source: String,
    /// Other source identities with an identical structure merged into this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_sources: Vec<String>,
    /// Documentation text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Values in declaration order
    pub values: Vec<EnumValue>,
}

impl EnumDef {
    /// Structural equality: same name and the same values in the same order.
    pub fn same_structure(&self, other: &EnumDef) -> bool {
        self.name == other.name
            && self.values.len() == other.values.len()
            && self.values.iter().zip(&other.values).all(|(a, b)| a.name == b.name)
    }
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    /// Record definition
    Record(RecordDef),
    /// Enum definition
    Enum(EnumDef),
}

impl TypeDef {
    /// Type name
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Record(record) => &record.name,
            TypeDef::Enum(def) => &def.name,
        }
    }

    /// Source identity of the definition
    pub fn source(&self) -> &str {
        match self {
            TypeDef::Record(record) => &record.source,
            TypeDef::Enum(def) => &def.source,
        }
    }

    /// Every source identity this definition stands for, first one first.
    pub fn all_sources(&self) -> impl Iterator<Item = &str> {
        let merged = match self {
            TypeDef::Record(record) => &record.merged_sources,
            TypeDef::Enum(def) => &def.merged_sources,
        };
        std::iter::once(self.source()).chain(merged.iter().map(String::as_str))
    }

    /// Structural equality, see [`RecordDef::same_structure`].
    pub fn same_structure(&self, other: &TypeDef) -> bool {
        match (self, other) {
            (TypeDef::Record(a), TypeDef::Record(b)) => a.same_structure(b),
            (TypeDef::Enum(a), TypeDef::Enum(b)) => a.same_structure(b),
            _ => false,
        }
    }
}

/// The Portico IR: every service plus the named types they reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceIR {
    /// Services sorted by name
    services: Vec<Service>,
    /// Named records and enums, keyed by name
    types: BTreeMap<String, TypeDef>,
}

impl ServiceIR {
    /// Create an IR; services are sorted by name so output never depends on
    /// discovery order.
    pub fn new(mut services: Vec<Service>, types: BTreeMap<String, TypeDef>) -> Self {
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Self { services, types }
    }

    /// Load a ServiceIR from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let ir: Self = serde_json::from_str(&content)?;
        Ok(ir)
    }

    /// Save the ServiceIR to a JSON file with pretty formatting
    pub fn to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// All services, sorted by name.
    pub fn services(&self) -> &[Service] { &self.services }

    /// Find a service by name.
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.name == name)
    }

    /// The named type registry.
    pub fn types(&self) -> &BTreeMap<String, TypeDef> { &self.types }

    /// Look up a named type.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> { self.types.get(name) }

    /// Records in name order.
    pub fn records(&self) -> impl Iterator<Item = &RecordDef> {
        self.types.values().filter_map(|def| match def {
            TypeDef::Record(record) => Some(record),
            TypeDef::Enum(_) => None,
        })
    }

    /// Enums in name order.
    pub fn enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.types.values().filter_map(|def| match def {
            TypeDef::Enum(def) => Some(def),
            TypeDef::Record(_) => None,
        })
    }

    /// Total number of methods across every service.
    pub fn method_count(&self) -> usize {
        self.services.iter().map(|service| service.methods.len()).sum()
    }

    /// Every `(service, method)` pair in output order.
    pub fn methods(&self) -> impl Iterator<Item = (&Service, &MethodSignature)> {
        self.services
            .iter()
            .flat_map(|service| service.methods.iter().map(move |method| (service, method)))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::PrimitiveKind;

    fn greeter_ir() -> ServiceIR {
        let record = RecordDef {
            name: "UserInfo".into(),
            source: "crate::model::UserInfo".into(),
            merged_sources: Vec::new(),
            description: None,
            fields: vec![FieldDef { name: "name".into(), ty: TypeNode::text(), description: None }],
        };
        let greet = MethodSignature {
            name: "greet".into(),
            params: vec![ParamDef {
                name: "user".into(),
                ty: TypeNode::Record("UserInfo".into()),
                required: true,
                by_ref: false,
            }],
            returns: Some(TypeNode::text()),
            shape: InteractionShape::Unary,
            fallible: false,
            is_async: false,
            description: Some("Make a greeting.".into()),
        };
        let service = Service {
            name: "Greeter".into(),
            kind: ServiceKind::Type,
            source: "crate::greeter::Greeter".into(),
            description: None,
            methods: vec![greet],
        };
        let mut types = BTreeMap::new();
        types.insert("UserInfo".to_string(), TypeDef::Record(record));
        ServiceIR::new(vec![service], types)
    }

    #[test]
    fn services_are_sorted_by_name() {
        let make = |name: &str| Service {
            name: name.into(),
            kind: ServiceKind::Type,
            source: format!("crate::{}", name),
            description: None,
            methods: vec![],
        };
        let ir = ServiceIR::new(vec![make("Zeta"), make("Alpha")], BTreeMap::new());
        let names: Vec<_> = ir.services().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn file_round_trip_preserves_ir() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("ir.json");
        let ir = greeter_ir();

        ir.to_file(&path).expect("write ir");
        let content = std::fs::read_to_string(&path).expect("read ir");
        assert!(content.ends_with("}\n"));

        let loaded = ServiceIR::from_file(&path).expect("load ir");
        assert_eq!(loaded, ir);
    }

    #[test]
    fn same_structure_ignores_source_and_docs() {
        let ir = greeter_ir();
        let original = ir.get_type("UserInfo").expect("record");
        let mut moved = original.clone();
        if let TypeDef::Record(record) = &mut moved {
            record.source = "crate::other::UserInfo".into();
            record.description = Some("Moved".into());
        }
        assert!(original.same_structure(&moved));

        if let TypeDef::Record(record) = &mut moved {
            record.fields[0].ty = TypeNode::Primitive(PrimitiveKind::Integer);
        }
        assert!(!original.same_structure(&moved));
    }

    #[test]
    fn response_payload_unwraps_streams() {
        let mut method = greeter_ir().services()[0].methods[0].clone();
        method.returns = Some(TypeNode::stream(TypeNode::text()));
        assert_eq!(method.response_payload(), Some(&TypeNode::text()));
        assert_eq!(InteractionShape::Duplex.to_string(), "duplex");
        assert!(InteractionShape::RequestStream.streams_requests());
        assert!(!InteractionShape::RequestStream.streams_responses());
    }
}
