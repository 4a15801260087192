//! `models.rs`: wire structs and enums, method envelopes, and the
//! conversions between wire models and the domain types they mirror.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use ir::naming::{request_envelope, response_envelope};
use ir::{EnumDef, MethodSignature, RecordDef, Service, ServiceIR, TypeDef, TypeNode};

use super::doc_comment::format_doc_comment;
use super::with_header;
use crate::utils::{boxed_fields, domain_path, sanitize_identifier, wire_type};
use crate::{GeneratorOptions, Result};

/// Whether the method sends a response envelope: it returns a payload that
/// is not a stream.
pub fn has_response_envelope(method: &MethodSignature) -> bool {
    method.returns.as_ref().map(|ty| !ty.is_stream()).unwrap_or(false)
}

/// Parameters carried by the request envelope: every non-stream parameter.
pub fn envelope_params(method: &MethodSignature) -> impl Iterator<Item = &ir::ParamDef> {
    method.params.iter().filter(|param| !param.ty.is_stream())
}

/// Render `models.rs`.
pub fn render(backend: &str, ir: &ServiceIR, options: &GeneratorOptions) -> Result<String> {
    let boxed = boxed_fields(ir);
    let mut out = String::new();
    writeln!(out, "//! Wire models of the domain types and the envelopes of every method.\n")?;
    writeln!(out, "use serde::{{Deserialize, Serialize}};\n")?;
    writeln!(out, "use super::wire::{{ConversionError, FromWire, IntoWire}};\n")?;

    for def in ir.types().values() {
        match def {
            TypeDef::Record(record) => render_record(&mut out, record, &boxed)?,
            TypeDef::Enum(def) => render_enum(&mut out, def)?,
        }
        for source in def.all_sources() {
            let path = domain_path(source, &options.domain_crate);
            match def {
                TypeDef::Record(record) => render_record_conversions(&mut out, record, &path, &boxed)?,
                TypeDef::Enum(def) => render_enum_conversions(&mut out, def, &path)?,
            }
        }
    }

    for service in ir.services() {
        for method in &service.methods {
            render_envelopes(&mut out, service, method)?;
        }
    }
    Ok(with_header(backend, &out))
}

fn render_record(
    out: &mut String,
    record: &RecordDef,
    boxed: &BTreeSet<(String, String)>,
) -> Result<()> {
    out.push_str(&format_doc_comment(record.description.as_deref(), 0));
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")?;
    writeln!(out, "pub struct {} {{", record.name)?;
    for field in &record.fields {
        out.push_str(&format_doc_comment(field.description.as_deref(), 4));
        if field.ty.is_optional() {
            writeln!(out, "    #[serde(default, skip_serializing_if = \"Option::is_none\")]")?;
        }
        let ty = if is_boxed(boxed, record, &field.name) {
            boxed_wire_type(&field.ty)
        } else {
            wire_type(&field.ty)
        };
        writeln!(out, "    pub {}: {},", sanitize_identifier(&field.name), ty)?;
    }
    writeln!(out, "}}\n")?;
    Ok(())
}

fn render_record_conversions(
    out: &mut String,
    record: &RecordDef,
    path: &str,
    boxed: &BTreeSet<(String, String)>,
) -> Result<()> {
    let name = &record.name;
    writeln!(out, "impl FromWire<{}> for {} {{", name, path)?;
    writeln!(out, "    fn from_wire(wire: {}) -> Result<Self, ConversionError> {{", name)?;
    writeln!(out, "        Ok(Self {{")?;
    for field in &record.fields {
        let ident = sanitize_identifier(&field.name);
        let access = format!("wire.{}", ident);
        let value = if is_boxed(boxed, record, &field.name) {
            unbox_from_wire(&field.ty, &access)
        } else {
            format!("FromWire::from_wire({})", access)
        };
        writeln!(out, "            {}: {}?,", ident, value)?;
    }
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "impl IntoWire<{}> for {} {{", name, path)?;
    writeln!(out, "    fn into_wire(self) -> Result<{}, ConversionError> {{", name)?;
    writeln!(out, "        Ok({} {{", name)?;
    for field in &record.fields {
        let ident = sanitize_identifier(&field.name);
        let access = format!("self.{}", ident);
        let value = if is_boxed(boxed, record, &field.name) {
            box_into_wire(&field.ty, &access)
        } else {
            format!("IntoWire::into_wire({})", access)
        };
        writeln!(out, "            {}: {}?,", ident, value)?;
    }
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}\n")?;
    Ok(())
}

fn render_enum(out: &mut String, def: &EnumDef) -> Result<()> {
    out.push_str(&format_doc_comment(def.description.as_deref(), 0));
    writeln!(
        out,
        "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]"
    )?;
    writeln!(out, "pub enum {} {{", def.name)?;
    for value in &def.values {
        out.push_str(&format_doc_comment(value.description.as_deref(), 4));
        writeln!(out, "    {},", sanitize_identifier(&value.name))?;
    }
    writeln!(out, "}}\n")?;
    Ok(())
}

fn render_enum_conversions(out: &mut String, def: &EnumDef, path: &str) -> Result<()> {
    let name = &def.name;
    let arms = |from: &str, to: &str| -> String {
        def.values
            .iter()
            .map(|value| {
                let variant = sanitize_identifier(&value.name);
                format!("            {}::{} => {}::{},\n", from, variant, to, variant)
            })
            .collect()
    };

    writeln!(out, "impl FromWire<{}> for {} {{", name, path)?;
    writeln!(out, "    fn from_wire(wire: {}) -> Result<Self, ConversionError> {{", name)?;
    writeln!(out, "        Ok(match wire {{")?;
    out.push_str(&arms(name, "Self"));
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}\n")?;

    writeln!(out, "impl IntoWire<{}> for {} {{", name, path)?;
    writeln!(out, "    fn into_wire(self) -> Result<{}, ConversionError> {{", name)?;
    writeln!(out, "        Ok(match self {{")?;
    out.push_str(&arms("Self", name));
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}\n")?;
    Ok(())
}

fn render_envelopes(out: &mut String, service: &Service, method: &MethodSignature) -> Result<()> {
    let request = request_envelope(&service.name, &method.name);
    writeln!(out, "/// Request envelope of `{}.{}`.", service.name, method.name)?;
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")?;
    let params: Vec<_> = envelope_params(method).collect();
    if params.is_empty() {
        writeln!(out, "pub struct {} {{}}\n", request)?;
    } else {
        writeln!(out, "pub struct {} {{", request)?;
        for param in params {
            if !param.required {
                writeln!(out, "    #[serde(default, skip_serializing_if = \"Option::is_none\")]")?;
            }
            writeln!(out, "    pub {}: {},", sanitize_identifier(&param.name), wire_type(&param.ty))?;
        }
        writeln!(out, "}}\n")?;
    }

    if has_response_envelope(method) {
        let response = response_envelope(&service.name, &method.name);
        let payload = method.returns.as_ref().map(wire_type).unwrap_or_else(|| "()".to_string());
        writeln!(out, "/// Response envelope of `{}.{}`.", service.name, method.name)?;
        writeln!(out, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")?;
        writeln!(out, "pub struct {} {{", response)?;
        writeln!(out, "    pub payload: {},", payload)?;
        writeln!(out, "}}\n")?;
    }
    Ok(())
}

fn is_boxed(boxed: &BTreeSet<(String, String)>, record: &RecordDef, field: &str) -> bool {
    boxed.contains(&(record.name.clone(), field.to_string()))
}

/// Wire type of a boxed field: the record itself goes behind a `Box`.
fn boxed_wire_type(ty: &TypeNode) -> String {
    match ty {
        TypeNode::Optional(inner) => format!("Option<{}>", boxed_wire_type(inner)),
        TypeNode::Record(name) => format!("Box<{}>", name),
        other => wire_type(other),
    }
}

/// Conversion of a boxed wire field into its domain value, as an expression
/// of type `Result<_, ConversionError>`.
fn unbox_from_wire(ty: &TypeNode, expr: &str) -> String {
    match ty {
        TypeNode::Optional(inner) =>
            format!("{}.map(|v| {}).transpose()", expr, unbox_from_wire(inner, "v")),
        TypeNode::Record(name) => format!("<_ as FromWire<{}>>::from_wire(*{})", name, expr),
        _ => format!("FromWire::from_wire({})", expr),
    }
}

/// Conversion of a domain value into a boxed wire field, as an expression of
/// type `Result<_, ConversionError>`.
fn box_into_wire(ty: &TypeNode, expr: &str) -> String {
    match ty {
        TypeNode::Optional(inner) =>
            format!("{}.map(|v| {}).transpose()", expr, box_into_wire(inner, "v")),
        TypeNode::Record(name) =>
            format!("<_ as IntoWire<{}>>::into_wire({}).map(Box::new)", name, expr),
        _ => format!("IntoWire::into_wire({})", expr),
    }
}
