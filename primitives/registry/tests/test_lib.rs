use ir::{EnumDef, EnumValue, FieldDef, PrimitiveKind, RecordDef, TypeDef, TypeNode};
use registry::{Registration, RegistryError, TypeRegistry, TypeRegistryReader};

/// Helper function to create a record with the given source and `(name, type)` fields
fn record(source: &str, fields: &[(&str, TypeNode)]) -> TypeDef {
    let name = source.rsplit("::").next().unwrap_or(source).to_string();
    TypeDef::Record(RecordDef {
        name,
        source: source.to_string(),
        merged_sources: Vec::new(),
        description: None,
        fields: fields
            .iter()
            .map(|(name, ty)| FieldDef { name: name.to_string(), ty: ty.clone(), description: None })
            .collect(),
    })
}

fn color(source: &str, values: &[&str]) -> TypeDef {
    TypeDef::Enum(EnumDef {
        name: "Color".to_string(),
        source: source.to_string(),
        merged_sources: Vec::new(),
        description: None,
        values: values
            .iter()
            .map(|value| EnumValue { name: value.to_string(), description: None })
            .collect(),
    })
}

#[test]
fn test_type_registry_new() {
    let registry = TypeRegistry::new();

    assert_eq!(registry.type_count(), 0);
    assert!(registry.list_types().is_empty());
    assert!(registry.get_type("UserInfo").is_none());
}

#[test]
fn test_register_and_lookup() {
    let mut registry = TypeRegistry::new();

    let outcome = registry
        .register(record("crate::model::UserInfo", &[("name", TypeNode::text())]))
        .expect("register");
    assert_eq!(outcome, Registration::New);
    registry.register(color("crate::model::Color", &["Red", "Green"])).expect("register enum");

    assert_eq!(registry.list_types(), vec!["Color", "UserInfo"]);
    assert_eq!(registry.name_for_source("crate::model::UserInfo"), Some("UserInfo"));
    assert!(registry.name_for_source("crate::other::UserInfo").is_none());
}

#[test]
fn test_identical_definitions_are_deduplicated() {
    let mut registry = TypeRegistry::new();
    let fields = [("name", TypeNode::text()), ("age", TypeNode::Primitive(PrimitiveKind::Integer))];

    registry.register(record("crate::a::UserInfo", &fields)).expect("first");
    let outcome = registry.register(record("crate::b::UserInfo", &fields)).expect("second");

    assert_eq!(outcome, Registration::Deduplicated);
    assert_eq!(registry.type_count(), 1);
    assert_eq!(registry.sources("UserInfo"), vec!["crate::a::UserInfo", "crate::b::UserInfo"]);
    assert_eq!(registry.name_for_source("crate::b::UserInfo"), Some("UserInfo"));

    let types = registry.into_types();
    assert_eq!(types["UserInfo"].source(), "crate::a::UserInfo");
    assert_eq!(
        types["UserInfo"].all_sources().collect::<Vec<_>>(),
        vec!["crate::a::UserInfo", "crate::b::UserInfo"]
    );
}

#[test]
fn test_conflicting_definitions_name_both_sources() {
    let mut registry = TypeRegistry::new();

    registry.register(record("crate::a::UserInfo", &[("name", TypeNode::text())])).expect("first");
    let err = registry
        .register(record(
            "crate::b::UserInfo",
            &[("name", TypeNode::optional(TypeNode::text()))],
        ))
        .expect_err("conflict");

    assert_eq!(
        err,
        RegistryError::Conflict {
            name: "UserInfo".into(),
            existing: "crate::a::UserInfo".into(),
            incoming: "crate::b::UserInfo".into(),
        }
    );
    assert!(err.to_string().contains("crate::a::UserInfo"));
    assert!(err.to_string().contains("crate::b::UserInfo"));
}

#[test]
fn test_enum_value_order_matters() {
    let mut registry = TypeRegistry::new();

    registry.register(color("crate::a::Color", &["Red", "Green"])).expect("first");
    assert!(registry.register(color("crate::b::Color", &["Red", "Green"])).is_ok());
    assert!(registry.register(color("crate::c::Color", &["Green", "Red"])).is_err());
}

#[test]
fn test_record_and_enum_with_same_name_conflict() {
    let mut registry = TypeRegistry::new();

    registry.register(color("crate::a::Color", &["Red"])).expect("enum");
    let err = registry.register(record("crate::b::Color", &[])).expect_err("conflict");
    assert!(matches!(err, RegistryError::Conflict { .. }));
}
