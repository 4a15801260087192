// codegen/src/utils.rs

use std::collections::{BTreeMap, BTreeSet};

use ir::naming::snake_case;
use ir::{PrimitiveKind, RecordDef, ServiceIR, TypeDef, TypeNode};
use types::SourceIdentity;

/// First line of every generated file. The scanner skips files starting
/// with this marker, so generated output never feeds back into discovery.
pub fn generated_header(backend: &str) -> String {
    format!("// @generated by portico ({} backend). Do not edit.\n", backend)
}

/// Inner attributes placed after the header of every generated module.
pub const GENERATED_ALLOWS: &str =
    "#![allow(unused_imports, unused_variables, dead_code, clippy::all)]\n";

const STRICT_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "gen", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

/// Identifier usable in generated code: keywords become raw identifiers,
/// the few names that cannot be raw get a trailing underscore.
pub fn sanitize_identifier(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{}_", name),
        _ if STRICT_KEYWORDS.contains(&name) => format!("r#{}", name),
        _ => name.replace('-', "_").chars().filter(|c| c.is_alphanumeric() || *c == '_').collect(),
    }
}

/// A sanitized identifier with any `r#` prefix removed, for use inside
/// composite names such as `arg_type`.
pub fn bare_identifier(name: &str) -> String {
    let sanitized = sanitize_identifier(name);
    sanitized.strip_prefix("r#").map(str::to_string).unwrap_or(sanitized)
}

/// Rust spelling of the wire representation of `ty`. Streams render as their
/// item type; records and enums as the generated model of the same name.
pub fn wire_type(ty: &TypeNode) -> String { wire_type_in(ty, "") }

/// [`wire_type`] with generated model names prefixed by `models`, e.g.
/// `models::` from a sibling module.
pub fn wire_type_in(ty: &TypeNode, models: &str) -> String {
    match ty {
        TypeNode::Primitive(kind) => match kind {
            PrimitiveKind::Integer => "i64".to_string(),
            PrimitiveKind::Float => "f64".to_string(),
            PrimitiveKind::Boolean => "bool".to_string(),
            PrimitiveKind::Text => "String".to_string(),
            PrimitiveKind::Binary => "Vec<u8>".to_string(),
            PrimitiveKind::DateTime => "chrono::DateTime<chrono::Utc>".to_string(),
            PrimitiveKind::Unit => "()".to_string(),
        },
        TypeNode::Optional(inner) => format!("Option<{}>", wire_type_in(inner, models)),
        TypeNode::Sequence(inner) => format!("Vec<{}>", wire_type_in(inner, models)),
        TypeNode::Mapping(key, value) => format!(
            "std::collections::BTreeMap<{}, {}>",
            wire_type_in(key, models),
            wire_type_in(value, models)
        ),
        TypeNode::Record(name) | TypeNode::Enum(name) => format!("{}{}", models, name),
        TypeNode::Stream(inner) => wire_type_in(inner, models),
    }
}

/// Name of a generated client method. Names taken by the client's own
/// constructors get a `call_` prefix.
pub fn client_method_name(method: &str) -> String {
    let snake = snake_case(method);
    match snake.as_str() {
        "new" | "with_client" | "with_channel_capacity" => format!("call_{}", snake),
        _ => sanitize_identifier(&snake),
    }
}

/// Rust path of a domain item in the generated code, with the leading
/// `crate` replaced by `domain_crate`. Unparseable identities are used as is.
pub fn domain_path(source: &str, domain_crate: &str) -> String {
    source
        .parse::<SourceIdentity>()
        .map(|identity| identity.rust_path(domain_crate))
        .unwrap_or_else(|_| source.to_string())
}

/// Route segment of a service: its snake_case name.
pub fn service_segment(service: &str) -> String { snake_case(service) }

/// Record fields that must be boxed in the wire model: direct (not behind a
/// sequence or map) references to a record on a cycle back to the owner.
///
/// Returns `(record name, field name)` pairs.
pub fn boxed_fields(ir: &ServiceIR) -> BTreeSet<(String, String)> {
    let records: BTreeMap<&str, &RecordDef> = ir
        .types()
        .values()
        .filter_map(|def| match def {
            TypeDef::Record(record) => Some((record.name.as_str(), record)),
            TypeDef::Enum(_) => None,
        })
        .collect();

    let mut boxed = BTreeSet::new();
    for record in records.values().copied() {
        for field in &record.fields {
            if let Some(target) = direct_record(&field.ty) {
                if reaches(&records, target, &record.name, &mut BTreeSet::new()) {
                    boxed.insert((record.name.clone(), field.name.clone()));
                }
            }
        }
    }
    boxed
}

/// The record named by `ty` itself or through optionals only.
pub fn direct_record(ty: &TypeNode) -> Option<&str> {
    match ty {
        TypeNode::Record(name) => Some(name),
        TypeNode::Optional(inner) => direct_record(inner),
        _ => None,
    }
}

fn reaches<'a>(
    records: &BTreeMap<&'a str, &'a RecordDef>,
    from: &'a str,
    to: &str,
    visited: &mut BTreeSet<&'a str>,
) -> bool {
    if from == to {
        return true;
    }
    if !visited.insert(from) {
        return false;
    }
    match records.get(from).copied() {
        Some(record) => record
            .fields
            .iter()
            .filter_map(|field| direct_record(&field.ty))
            .any(|next| reaches(records, next, to, visited)),
        None => false,
    }
}
