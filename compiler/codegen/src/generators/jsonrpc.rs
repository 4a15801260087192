//! The `jsonrpc` backend: JSON-RPC 2.0 over a single HTTP endpoint, served
//! by warp. Request/response only, so any streaming method is rejected
//! before a single file is rendered.

use std::fmt::Write as _;

use ir::naming::{pascal_case, request_envelope, response_envelope, wire_method_name};
use ir::{InteractionShape, MethodSignature, ServiceIR};
use tracing::debug;

use super::doc_comment::format_doc_comment;
use super::{
    client_params, common_artifacts, decode_params, domain_call, with_header, ServiceBinding,
};
use crate::utils::{client_method_name, sanitize_identifier, wire_type_in};
use crate::{ensure_supported, ArtifactTree, Generator, GeneratorOptions, Result};

const SERVER_TEMPLATE: &str = include_str!("../../templates/jsonrpc_server.rs");
const CLIENT_TEMPLATE: &str = include_str!("../../templates/jsonrpc_client.rs");

const BACKEND: &str = "jsonrpc";
const DOMAIN_ERROR: &str = "ServerError::Domain(err.to_string())";

/// JSON-RPC 2.0 transport on warp, with a reqwest client. Supports unary
/// and fire-and-forget methods only.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRpcGenerator;

impl Generator for JsonRpcGenerator {
    fn name(&self) -> &'static str { BACKEND }

    fn description(&self) -> &'static str {
        "JSON-RPC 2.0 over HTTP on warp (no streaming methods)"
    }

    fn supports(&self, shape: InteractionShape) -> bool {
        matches!(shape, InteractionShape::Unary | InteractionShape::FireAndForget)
    }

    fn generate(&self, ir: &ServiceIR, options: &GeneratorOptions) -> Result<ArtifactTree> {
        ensure_supported(self, ir)?;
        let mut tree = common_artifacts(BACKEND, ir, options)?;
        tree.insert("server.rs", &render_server(ir, options)?);
        tree.insert("client.rs", &render_client(ir));
        debug!(services = ir.services().len(), files = tree.len(), "rendered jsonrpc backend");
        Ok(tree)
    }
}

/// `{service}.{method}`
fn rpc_method(binding: &ServiceBinding, method: &MethodSignature) -> String {
    format!("{}.{}", binding.segment, wire_method_name(&method.name))
}

/// Name of the generic parameter standing for a trait service implementor.
fn implementor(binding: &ServiceBinding) -> String {
    format!("{}Impl", pascal_case(&binding.service.name))
}

fn render_server(ir: &ServiceIR, options: &GeneratorOptions) -> Result<String> {
    let bindings: Vec<ServiceBinding> =
        ir.services().iter().map(|service| ServiceBinding::new(service, options)).collect();

    let bounds: Vec<String> = bindings
        .iter()
        .filter(|binding| !binding.generics().is_empty())
        .map(|binding| format!("{}: {} + Send + Sync + 'static", implementor(binding), binding.domain))
        .collect();
    let generics = if bounds.is_empty() { String::new() } else { format!("<{}>", bounds.join(", ")) };
    let service_type = |binding: &ServiceBinding| {
        if binding.generics().is_empty() {
            binding.state_type()
        } else {
            format!("Arc<{}>", implementor(binding))
        }
    };
    let names: Vec<String> =
        bindings.iter().map(|binding| sanitize_identifier(&binding.segment)).collect();
    let owned: Vec<String> = bindings
        .iter()
        .zip(&names)
        .map(|(binding, name)| format!("{}: {}", name, service_type(binding)))
        .collect();
    let borrowed: Vec<String> = bindings
        .iter()
        .zip(&names)
        .map(|(binding, name)| format!("{}: &{}", name, service_type(binding)))
        .collect();

    let mut out = String::from(SERVER_TEMPLATE);
    writeln!(out, "\n/// The `POST /rpc` endpoint dispatching to every service.")?;
    writeln!(
        out,
        "pub fn router{}({}) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {{",
        generics,
        owned.join(", ")
    )?;
    writeln!(out, "    warp::path(\"rpc\")")?;
    writeln!(out, "        .and(warp::path::end())")?;
    writeln!(out, "        .and(warp::post())")?;
    writeln!(out, "        .and(warp::body::json())")?;
    writeln!(out, "        .then(move |body: Value| {{")?;
    for name in &names {
        writeln!(out, "            let {} = {}.clone();", name, name)?;
    }
    let refs: Vec<String> = names.iter().map(|name| format!("&{}", name)).collect();
    writeln!(out, "            async move {{")?;
    writeln!(out, "                let call = match parse_call(body) {{")?;
    writeln!(out, "                    Ok(call) => call,")?;
    writeln!(out, "                    Err((id, err)) => return reply(Some(id), Err(err)),")?;
    writeln!(out, "                }};")?;
    let mut dispatch_args = vec!["&call.method".to_string(), "call.params".to_string()];
    dispatch_args.extend(refs);
    writeln!(out, "                let outcome = dispatch({}).await;", dispatch_args.join(", "))?;
    writeln!(out, "                reply(call.id, outcome)")?;
    writeln!(out, "            }}")?;
    writeln!(out, "        }})")?;
    writeln!(out, "}}")?;

    let mut params = vec!["method: &str".to_string(), "params: Value".to_string()];
    params.extend(borrowed);
    writeln!(out, "\nasync fn dispatch{}({}) -> Result<Value, ServerError> {{", generics, params.join(", "))?;
    writeln!(out, "    match method {{")?;
    for (binding, name) in bindings.iter().zip(&names) {
        for method in &binding.service.methods {
            render_arm(&mut out, binding, name, method)?;
        }
    }
    writeln!(out, "        other => Err(ServerError::MethodNotFound(other.to_string())),")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(with_header(BACKEND, &out))
}

fn render_arm(
    out: &mut String,
    binding: &ServiceBinding,
    service: &str,
    method: &MethodSignature,
) -> Result<()> {
    let request = request_envelope(&binding.service.name, &method.name);
    writeln!(out, "        \"{}\" => {{", rpc_method(binding, method))?;
    writeln!(out, "            let service = {};", service)?;
    writeln!(out, "            let request: models::{} = decode_params(params)?;", request)?;
    out.push_str(&decode_params(method, 12));
    let call = domain_call(method, "input", DOMAIN_ERROR);
    if method.shape == InteractionShape::FireAndForget {
        writeln!(out, "            {};", call)?;
        writeln!(out, "            Ok(Value::Null)")?;
    } else {
        let response = response_envelope(&binding.service.name, &method.name);
        writeln!(out, "            let result = {};", call)?;
        writeln!(
            out,
            "            encode_result(&models::{} {{ payload: IntoWire::into_wire(result).map_err(ServerError::encode)? }})",
            response
        )?;
    }
    writeln!(out, "        }}")?;
    Ok(())
}

fn render_client(ir: &ServiceIR) -> String {
    let mut out = String::from(CLIENT_TEMPLATE);
    for service in ir.services() {
        let client = format!("{}Client", pascal_case(&service.name));
        out.push_str(&format!("\n/// Client of `{}`.\n", service.name));
        if service.description.is_some() {
            out.push_str("///\n");
            out.push_str(&format_doc_comment(service.description.as_deref(), 0));
        }
        out.push_str(&format!(
            "#[derive(Debug, Clone)]\npub struct {} {{\n    transport: Transport,\n}}\n\nimpl {} {{\n",
            client, client
        ));
        out.push_str(CLIENT_CONSTRUCTORS);
        let segment = crate::utils::service_segment(&service.name);
        for method in &service.methods {
            out.push('\n');
            out.push_str(&render_client_method(&service.name, &segment, method));
        }
        out.push_str("}\n");
    }
    with_header(BACKEND, &out)
}

const CLIENT_CONSTRUCTORS: &str = r#"    /// Client of the server at `base_url`; calls go to `{base_url}/rpc`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Client sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { transport: Transport::new(http, base_url.into()) }
    }
"#;

fn render_client_method(service: &str, segment: &str, method: &MethodSignature) -> String {
    let (declared, fields) = client_params(method);
    let name = client_method_name(&method.name);
    let rpc = format!("{}.{}", segment, wire_method_name(&method.name));
    let mut out = format_doc_comment(method.description.as_deref(), 4);
    let request = format!("models::{} {{ {} }}", request_envelope(service, &method.name), fields);
    if method.shape == InteractionShape::FireAndForget {
        out.push_str(&format!(
            "    pub async fn {}(&self{}) -> Result<(), ClientError> {{\n        let request = {};\n        self.transport.notify(\"{}\", &request).await\n    }}\n",
            name, declared, request, rpc
        ));
    } else {
        let payload = method
            .response_payload()
            .map(|ty| wire_type_in(ty, "models::"))
            .unwrap_or_else(|| "()".to_string());
        out.push_str(&format!(
            "    pub async fn {}(&self{}) -> Result<{}, ClientError> {{\n        let request = {};\n        let response: models::{} = self.transport.call(\"{}\", &request).await?;\n        Ok(response.payload)\n    }}\n",
            name,
            declared,
            payload,
            request,
            response_envelope(service, &method.name),
            rpc
        ));
    }
    out
}
