use std::collections::BTreeMap;

use ir::{
    EnumDef, EnumValue, FieldDef, InteractionShape, MethodSignature, ParamDef, PrimitiveKind,
    RecordDef, Service, ServiceIR, ServiceKind, TypeDef, TypeNode,
};
use portico_codegen::{BackendRegistry, CodegenError, GeneratorOptions};
use pretty_assertions::assert_eq;

fn param(name: &str, ty: TypeNode) -> ParamDef {
    ParamDef { name: name.into(), required: !ty.is_optional(), ty, by_ref: false }
}

fn method(
    name: &str,
    params: Vec<ParamDef>,
    returns: Option<TypeNode>,
    shape: InteractionShape,
) -> MethodSignature {
    MethodSignature {
        name: name.into(),
        params,
        returns,
        shape,
        fallible: false,
        is_async: false,
        description: None,
    }
}

fn record(name: &str, source: &str, fields: Vec<(&str, TypeNode)>) -> TypeDef {
    TypeDef::Record(RecordDef {
        name: name.into(),
        source: source.into(),
        merged_sources: Vec::new(),
        description: None,
        fields: fields
            .into_iter()
            .map(|(name, ty)| FieldDef { name: name.into(), ty, description: None })
            .collect(),
    })
}

fn greeter_ir() -> ServiceIR {
    let mut greet = method(
        "greet",
        vec![param("user", TypeNode::Record("UserInfo".into()))],
        Some(TypeNode::text()),
        InteractionShape::Unary,
    );
    greet.description = Some("Make a greeting message for a user.".into());
    let service = Service {
        name: "Greeter".into(),
        kind: ServiceKind::Type,
        source: "crate::Greeter".into(),
        description: None,
        methods: vec![greet],
    };
    let mut types = BTreeMap::new();
    types.insert(
        "UserInfo".to_string(),
        record("UserInfo", "crate::UserInfo", vec![("name", TypeNode::text())]),
    );
    ServiceIR::new(vec![service], types)
}

fn telemetry_ir() -> ServiceIR {
    let reading = TypeNode::Record("Reading".into());
    let float = TypeNode::primitive(PrimitiveKind::Float);
    let methods = vec![
        method(
            "upload",
            vec![param("readings", TypeNode::stream(reading.clone()))],
            Some(TypeNode::primitive(PrimitiveKind::Integer)),
            InteractionShape::RequestStream,
        ),
        method(
            "watch",
            vec![param("sensor", TypeNode::text())],
            Some(TypeNode::stream(float.clone())),
            InteractionShape::ResponseStream,
        ),
        method(
            "echo",
            vec![param("lines", TypeNode::stream(TypeNode::text()))],
            Some(TypeNode::stream(TypeNode::text())),
            InteractionShape::Duplex,
        ),
        method(
            "notify",
            vec![param("level", TypeNode::Enum("Level".into()))],
            None,
            InteractionShape::FireAndForget,
        ),
        method(
            "latest",
            vec![param("sensor", TypeNode::optional(TypeNode::text()))],
            Some(TypeNode::optional(reading)),
            InteractionShape::Unary,
        ),
    ];
    let service = Service {
        name: "Telemetry".into(),
        kind: ServiceKind::Trait,
        source: "crate::telemetry::Telemetry".into(),
        description: Some("Sensor readings.".into()),
        methods,
    };
    let mut types = BTreeMap::new();
    types.insert(
        "Reading".to_string(),
        record(
            "Reading",
            "crate::telemetry::Reading",
            vec![
                ("sensor", TypeNode::text()),
                ("value", float),
                ("at", TypeNode::primitive(PrimitiveKind::DateTime)),
                ("tags", TypeNode::mapping(TypeNode::text(), TypeNode::text())),
            ],
        ),
    );
    types.insert(
        "Level".to_string(),
        TypeDef::Enum(EnumDef {
            name: "Level".into(),
            source: "crate::telemetry::Level".into(),
            merged_sources: Vec::new(),
            description: None,
            values: vec![
                EnumValue { name: "Info".into(), description: None },
                EnumValue { name: "Alert".into(), description: None },
            ],
        }),
    );
    ServiceIR::new(vec![service], types)
}

fn assert_parses(tree: &portico_codegen::ArtifactTree) {
    for artifact in tree {
        if let Err(err) = syn::parse_file(&artifact.content) {
            panic!("{} does not parse: {}\n{}", artifact.path, err, artifact.content);
        }
    }
}

#[test]
fn axum_renders_the_greeter_transport() {
    let registry = BackendRegistry::builtin();
    let tree = registry
        .get("axum")
        .expect("axum")
        .generate(&greeter_ir(), &GeneratorOptions::default())
        .expect("generate");

    assert_eq!(tree.paths(), vec!["client.rs", "mod.rs", "models.rs", "server.rs", "wire.rs"]);
    for artifact in &tree {
        assert!(artifact.content.starts_with("// @generated by portico (axum backend)"));
    }
    assert_parses(&tree);

    let models = &tree.get("models.rs").expect("models").content;
    assert!(models.contains("pub struct UserInfo {\n    pub name: String,\n}"));
    assert!(models.contains("impl FromWire<UserInfo> for crate::UserInfo {"));
    assert!(models.contains("pub struct GreeterGreetRequest {\n    pub user: UserInfo,\n}"));
    assert!(models.contains("pub struct GreeterGreetResponse {\n    pub payload: String,\n}"));

    let server = &tree.get("server.rs").expect("server").content;
    assert!(server.contains(".route(\"/greeter/greet\", post(greeter_greet))"));
    assert!(server.contains("pub fn router(greeter: Arc<crate::Greeter>) -> Router {"));

    let client = &tree.get("client.rs").expect("client").content;
    assert!(client.contains("    /// Make a greeting message for a user.\n    pub async fn greet(&self, user: models::UserInfo) -> Result<String, ClientError> {"));
    assert!(client.contains("format!(\"{}/greeter/greet\", self.base_url)"));
}

#[test]
fn every_shape_renders_parseable_axum_code() {
    let options = GeneratorOptions { domain_crate: "::sensors".into(), channel_capacity: 4 };
    let tree = BackendRegistry::builtin()
        .get("axum")
        .expect("axum")
        .generate(&telemetry_ir(), &options)
        .expect("generate");
    assert_parses(&tree);

    let server = &tree.get("server.rs").expect("server").content;
    let client = &tree.get("client.rs").expect("client").content;
    for route in ["/telemetry/upload", "/telemetry/watch", "/telemetry/echo"] {
        assert!(server.contains(&format!(".route(\"{}\", get(", route)), "{}", route);
        assert!(client.contains(&format!("ws_url(&self.base_url, \"{}\")", route)), "{}", route);
    }
    for route in ["/telemetry/notify", "/telemetry/latest"] {
        assert!(server.contains(&format!(".route(\"{}\", post(", route)), "{}", route);
        assert!(client.contains(&format!("format!(\"{{}}{}\", self.base_url)", route)), "{}", route);
    }
    assert!(client.contains("-> Result<RequestStreamCall<models::Reading, i64>, ClientError>"));
    assert!(client.contains("-> Result<DuplexChannel<String, String>, ClientError>"));
    assert!(server.contains("Ok(StatusCode::NO_CONTENT)"));

    let models = &tree.get("models.rs").expect("models").content;
    assert!(models.contains("impl IntoWire<Level> for ::sensors::telemetry::Level {"));
    assert!(models.contains("pub struct TelemetryUploadRequest {}"));
    assert!(!models.contains("TelemetryWatchResponse"));
    assert!(models.contains(
        "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub sensor: Option<String>,"
    ));
}

#[test]
fn generation_is_deterministic() {
    let registry = BackendRegistry::builtin();
    for name in registry.list() {
        let generator = registry.get(name).expect("backend");
        let ir = greeter_ir();
        let first = generator.generate(&ir, &GeneratorOptions::default()).expect("first");
        let second = generator.generate(&ir, &GeneratorOptions::default()).expect("second");
        assert_eq!(first, second, "{}", name);
    }
}

#[test]
fn jsonrpc_rejects_streaming_methods() {
    let registry = BackendRegistry::builtin();
    let err = registry
        .get("jsonrpc")
        .expect("jsonrpc")
        .generate(&telemetry_ir(), &GeneratorOptions::default())
        .expect_err("streaming is unsupported");
    assert_eq!(
        err,
        CodegenError::UnsupportedShape {
            backend: "jsonrpc".into(),
            service: "Telemetry".into(),
            method: "upload".into(),
            shape: InteractionShape::RequestStream,
        }
    );
    assert_eq!(err.code(), "unsupported-shape");
}

#[test]
fn jsonrpc_renders_the_greeter_transport() {
    let tree = BackendRegistry::builtin()
        .get("jsonrpc")
        .expect("jsonrpc")
        .generate(&greeter_ir(), &GeneratorOptions::default())
        .expect("generate");
    assert_parses(&tree);

    let server = &tree.get("server.rs").expect("server").content;
    let client = &tree.get("client.rs").expect("client").content;
    assert!(server.contains("\"greeter.greet\" => {"));
    assert!(client.contains("self.transport.call(\"greeter.greet\", &request)"));
}

#[test]
fn merged_records_convert_from_every_source() {
    let mut ir = greeter_ir();
    let mut types = ir.types().clone();
    if let Some(TypeDef::Record(record)) = types.get_mut("UserInfo") {
        record.merged_sources.push("crate::legacy::UserInfo".into());
    }
    ir = ServiceIR::new(ir.services().to_vec(), types);

    let tree = BackendRegistry::builtin()
        .get("axum")
        .expect("axum")
        .generate(&ir, &GeneratorOptions::default())
        .expect("generate");
    let models = &tree.get("models.rs").expect("models").content;
    assert!(models.contains("impl FromWire<UserInfo> for crate::UserInfo {"));
    assert!(models.contains("impl FromWire<UserInfo> for crate::legacy::UserInfo {"));
    assert_eq!(models.matches("pub struct UserInfo {").count(), 1);
}

#[test]
fn recursive_records_are_boxed_on_the_wire() {
    let node = TypeNode::Record("Node".into());
    let mut types = BTreeMap::new();
    types.insert(
        "Node".to_string(),
        record(
            "Node",
            "crate::Node",
            vec![
                ("label", TypeNode::text()),
                ("parent", TypeNode::optional(node.clone())),
                ("children", TypeNode::sequence(node.clone())),
            ],
        ),
    );
    let service = Service {
        name: "Tree".into(),
        kind: ServiceKind::Type,
        source: "crate::Tree".into(),
        description: None,
        methods: vec![method("root", Vec::new(), Some(node), InteractionShape::Unary)],
    };
    let ir = ServiceIR::new(vec![service], types);

    let tree = BackendRegistry::builtin()
        .get("axum")
        .expect("axum")
        .generate(&ir, &GeneratorOptions::default())
        .expect("generate");
    assert_parses(&tree);
    let models = &tree.get("models.rs").expect("models").content;
    assert!(models.contains("pub parent: Option<Box<Node>>,"));
    assert!(models.contains("pub children: Vec<Node>,"));
}
