//! Human readable summary of a [`ServiceIR`], printed by `portico show`.

use std::fmt::Write as _;

use ir::{MethodSignature, Service, ServiceIR, TypeDef};

/// Render every service, then the named type registry.
///
/// ```text
/// * Greeter (crate::Greeter) Says hello.
///    * greet(user: UserInfo) -> text [unary]
///
/// * record UserInfo (crate::UserInfo)
///    * name: text
/// ```
pub fn render(ir: &ServiceIR) -> String {
    let mut out = String::new();
    for service in ir.services() {
        render_service(&mut out, service);
        out.push('\n');
    }
    for def in ir.types().values() {
        render_type(&mut out, def);
        out.push('\n');
    }
    out
}

fn render_service(out: &mut String, service: &Service) {
    let _ = writeln!(
        out,
        "* {} ({}){}",
        service.name,
        service.source,
        suffix(" ", service.description.as_deref())
    );
    for method in &service.methods {
        let _ = writeln!(out, "   * {}", method_line(method));
    }
}

/// `name(param: type, ..) -> type [shape]: description`
pub fn method_line(method: &MethodSignature) -> String {
    let params: Vec<String> =
        method.params.iter().map(|param| format!("{}: {}", param.name, param.ty)).collect();
    let returns = method.returns.as_ref().map(|ty| format!(" -> {}", ty)).unwrap_or_default();
    format!(
        "{}({}){} [{}]{}",
        method.name,
        params.join(", "),
        returns,
        method.shape,
        suffix(": ", method.description.as_deref())
    )
}

fn render_type(out: &mut String, def: &TypeDef) {
    let sources: Vec<&str> = def.all_sources().collect();
    match def {
        TypeDef::Record(record) => {
            let _ = writeln!(
                out,
                "* record {} ({}){}",
                record.name,
                sources.join(", "),
                suffix(" ", record.description.as_deref())
            );
            for field in &record.fields {
                let _ = writeln!(
                    out,
                    "   * {}: {}{}",
                    field.name,
                    field.ty,
                    suffix(": ", field.description.as_deref())
                );
            }
        }
        TypeDef::Enum(def) => {
            let _ = writeln!(
                out,
                "* enum {} ({}){}",
                def.name,
                sources.join(", "),
                suffix(" ", def.description.as_deref())
            );
            for value in &def.values {
                let _ =
                    writeln!(out, "   * {}{}", value.name, suffix(": ", value.description.as_deref()));
            }
        }
    }
}

/// Documentation folded onto one line behind `separator`, or nothing.
fn suffix(separator: &str, description: Option<&str>) -> String {
    let folded = description
        .map(|text| text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .join(" ");
    if folded.is_empty() {
        String::new()
    } else {
        format!("{}{}", separator, folded)
    }
}
