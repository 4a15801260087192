//! The built-in backends.
//!
//! Every backend emits the same four modules: `wire` (conversion traits and
//! the stream frame), `models` (wire structs, envelopes and conversions),
//! `server` and `client`, plus a `mod.rs` tying them together. Only the
//! transport in `server` and `client` differs between backends.

/// Sub-crate generates: **`doc_comment`**
///
/// Turns IR descriptions into triple-slash doc comments.
pub mod doc_comment;

/// Sub-crate generates: **`models`**
///
/// Wire models, envelopes and domain conversions shared by every backend.
pub mod models;

/// HTTP and WebSocket backend on axum and reqwest.
pub mod axum;
pub use self::axum::AxumGenerator;

/// JSON-RPC 2.0 backend on warp and reqwest.
pub mod jsonrpc;
pub use jsonrpc::JsonRpcGenerator;

use ir::naming::wire_method_name;
use ir::{MethodSignature, Service, ServiceIR, ServiceKind, TypeNode};

use crate::utils::{
    bare_identifier, domain_path, generated_header, sanitize_identifier, service_segment,
    GENERATED_ALLOWS,
};
use crate::{ArtifactTree, GeneratorOptions, Result};

const WIRE_TEMPLATE: &str = include_str!("../../templates/wire.rs");

/// Artifacts every backend shares: `mod.rs`, `wire.rs` and `models.rs`.
pub(crate) fn common_artifacts(
    backend: &str,
    ir: &ServiceIR,
    options: &GeneratorOptions,
) -> Result<ArtifactTree> {
    let mut tree = ArtifactTree::new();
    tree.insert("mod.rs", &render_mod(backend, ir));
    tree.insert("wire.rs", &with_header(backend, WIRE_TEMPLATE));
    tree.insert("models.rs", &models::render(backend, ir, options)?);
    Ok(tree)
}

/// Prefix `body` with the generated-file header and lint allowances.
pub(crate) fn with_header(backend: &str, body: &str) -> String {
    format!("{}{}\n{}", generated_header(backend), GENERATED_ALLOWS, body)
}

fn render_mod(backend: &str, ir: &ServiceIR) -> String {
    let mut out = generated_header(backend);
    out.push_str("//! Transport layer for ");
    let names: Vec<&str> = ir.services().iter().map(|service| service.name.as_str()).collect();
    out.push_str(&if names.is_empty() { "no services".to_string() } else { names.join(", ") });
    out.push_str(".\n\n");
    out.push_str("pub mod client;\npub mod models;\npub mod server;\npub mod wire;\n\n");
    out.push_str("pub use self::client::ClientError;\n");
    out.push_str("pub use self::server::{router, ServerError};\n");
    out.push_str("pub use self::wire::{ConversionError, Frame, FromWire, IntoWire};\n");
    out
}

/// How generated server code names and reaches one service.
pub(crate) struct ServiceBinding<'a> {
    pub service: &'a Service,
    /// snake_case route segment and item prefix
    pub segment: String,
    /// Rust path of the domain type or trait
    pub domain: String,
}

impl<'a> ServiceBinding<'a> {
    pub fn new(service: &'a Service, options: &GeneratorOptions) -> Self {
        Self {
            service,
            segment: service_segment(&service.name),
            domain: domain_path(&service.source, &options.domain_crate),
        }
    }

    fn is_trait(&self) -> bool { self.service.kind == ServiceKind::Trait }

    /// Generic parameter list of handlers: trait services are served for any
    /// implementor `S`.
    pub fn generics(&self) -> String {
        if self.is_trait() {
            format!("<S: {} + Send + Sync + 'static>", self.domain)
        } else {
            String::new()
        }
    }

    /// The type handlers receive the service as.
    pub fn state_type(&self) -> String {
        if self.is_trait() {
            "Arc<S>".to_string()
        } else {
            format!("Arc<{}>", self.domain)
        }
    }

    /// Turbofish naming a handler from the service router.
    pub fn turbofish(&self) -> &'static str { if self.is_trait() { "::<S>" } else { "" } }

    /// `/{service}/{method}`
    pub fn route(&self, method: &MethodSignature) -> String {
        format!("/{}/{}", self.segment, wire_method_name(&method.name))
    }

    /// Item name for a method, e.g. `greeter_greet_session`.
    pub fn item(&self, method: &MethodSignature, suffix: &str) -> String {
        format!("{}_{}{}", self.segment, wire_method_name(&method.name), suffix)
    }
}

/// `let` bindings converting every non-stream parameter out of the request
/// envelope bound to `request`. Borrowed text and slices get a type hint so
/// the owned value can be inferred through the deref.
pub(crate) fn decode_params(method: &MethodSignature, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();
    for param in method.params.iter().filter(|param| !param.ty.is_stream()) {
        let hint = match &param.ty {
            TypeNode::Primitive(ir::PrimitiveKind::Text) if param.by_ref => ": String",
            TypeNode::Primitive(ir::PrimitiveKind::Binary) | TypeNode::Sequence(_)
                if param.by_ref =>
                ": Vec<_>",
            _ => "",
        };
        out.push_str(&format!(
            "{}let arg_{}{} = FromWire::from_wire(request.{})?;\n",
            pad,
            bare_identifier(&param.name),
            hint,
            sanitize_identifier(&param.name)
        ));
    }
    out
}

/// Expression calling the domain method on `service`. `stream_arg` is passed
/// for the stream parameter; `domain_error` builds the backend error from a
/// domain error bound to `err`.
pub(crate) fn domain_call(method: &MethodSignature, stream_arg: &str, domain_error: &str) -> String {
    let args: Vec<String> = method
        .params
        .iter()
        .map(|param| {
            if param.ty.is_stream() {
                stream_arg.to_string()
            } else if param.by_ref {
                format!("&arg_{}", bare_identifier(&param.name))
            } else {
                format!("arg_{}", bare_identifier(&param.name))
            }
        })
        .collect();
    let mut call = format!("service.{}({})", sanitize_identifier(&method.name), args.join(", "));
    if method.is_async {
        call.push_str(".await");
    }
    if method.fallible {
        call.push_str(&format!(".map_err(|err| {})?", domain_error));
    }
    call
}

/// Client method parameters (`name: Type` pairs over wire models) and the
/// shorthand field list that builds the request envelope from them.
pub(crate) fn client_params(method: &MethodSignature) -> (String, String) {
    let params: Vec<&ir::ParamDef> = models::envelope_params(method).collect();
    let declared = params
        .iter()
        .map(|param| {
            format!(
                ", {}: {}",
                sanitize_identifier(&param.name),
                crate::utils::wire_type_in(&param.ty, "models::")
            )
        })
        .collect();
    let fields =
        params.iter().map(|param| sanitize_identifier(&param.name)).collect::<Vec<_>>().join(", ");
    (declared, fields)
}
