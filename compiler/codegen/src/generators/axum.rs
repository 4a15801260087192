//! The `axum` backend: JSON over HTTP for unary and fire-and-forget methods,
//! JSON frames over a WebSocket for every streaming shape.

use std::fmt::Write as _;

use ir::naming::{pascal_case, request_envelope, response_envelope};
use ir::{InteractionShape, MethodSignature, ServiceIR};
use tracing::debug;

use super::doc_comment::format_doc_comment;
use super::{
    client_params, common_artifacts, decode_params, domain_call, with_header, ServiceBinding,
};
use crate::utils::{client_method_name, sanitize_identifier, wire_type_in};
use crate::{ensure_supported, ArtifactTree, Generator, GeneratorOptions, Result};

const SERVER_TEMPLATE: &str = include_str!("../../templates/axum_server.rs");
const CLIENT_TEMPLATE: &str = include_str!("../../templates/axum_client.rs");

const BACKEND: &str = "axum";
const DOMAIN_ERROR: &str = "ServerError::Domain(err.to_string())";

/// HTTP and WebSocket transport on axum, with a reqwest and
/// tokio-tungstenite client. Supports every interaction shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxumGenerator;

impl Generator for AxumGenerator {
    fn name(&self) -> &'static str { BACKEND }

    fn description(&self) -> &'static str {
        "HTTP routes and WebSocket streams on axum, with a reqwest client"
    }

    fn supports(&self, _shape: InteractionShape) -> bool { true }

    fn generate(&self, ir: &ServiceIR, options: &GeneratorOptions) -> Result<ArtifactTree> {
        ensure_supported(self, ir)?;
        let mut tree = common_artifacts(BACKEND, ir, options)?;
        tree.insert("server.rs", &render_server(ir, options)?);
        tree.insert("client.rs", &render_client(ir, options));
        debug!(services = ir.services().len(), files = tree.len(), "rendered axum backend");
        Ok(tree)
    }
}

fn render_server(ir: &ServiceIR, options: &GeneratorOptions) -> Result<String> {
    let mut out = String::from(SERVER_TEMPLATE);
    let bindings: Vec<ServiceBinding> =
        ir.services().iter().map(|service| ServiceBinding::new(service, options)).collect();

    for binding in &bindings {
        for method in &binding.service.methods {
            writeln!(out)?;
            match method.shape {
                InteractionShape::Unary => render_unary_handler(&mut out, binding, method)?,
                InteractionShape::FireAndForget =>
                    render_notification_handler(&mut out, binding, method)?,
                _ => render_stream_handler(&mut out, binding, method)?,
            }
        }
        render_service_router(&mut out, binding)?;
    }
    render_router(&mut out, &bindings)?;
    Ok(with_header(BACKEND, &out))
}

fn render_unary_handler(
    out: &mut String,
    binding: &ServiceBinding,
    method: &MethodSignature,
) -> Result<()> {
    let request = request_envelope(&binding.service.name, &method.name);
    let response = response_envelope(&binding.service.name, &method.name);
    writeln!(out, "async fn {}{}(", binding.item(method, ""), binding.generics())?;
    writeln!(out, "    State(service): State<{}>,", binding.state_type())?;
    writeln!(out, "    Json(request): Json<models::{}>,", request)?;
    writeln!(out, ") -> Result<Json<models::{}>, ServerError> {{", response)?;
    out.push_str(&decode_params(method, 4));
    writeln!(out, "    let result = {};", domain_call(method, "input", DOMAIN_ERROR))?;
    writeln!(
        out,
        "    Ok(Json(models::{} {{ payload: IntoWire::into_wire(result).map_err(ServerError::encode)? }}))",
        response
    )?;
    writeln!(out, "}}")?;
    Ok(())
}

fn render_notification_handler(
    out: &mut String,
    binding: &ServiceBinding,
    method: &MethodSignature,
) -> Result<()> {
    let request = request_envelope(&binding.service.name, &method.name);
    writeln!(out, "async fn {}{}(", binding.item(method, ""), binding.generics())?;
    writeln!(out, "    State(service): State<{}>,", binding.state_type())?;
    writeln!(out, "    Json(request): Json<models::{}>,", request)?;
    writeln!(out, ") -> Result<StatusCode, ServerError> {{")?;
    out.push_str(&decode_params(method, 4));
    writeln!(out, "    {};", domain_call(method, "input", DOMAIN_ERROR))?;
    writeln!(out, "    Ok(StatusCode::NO_CONTENT)")?;
    writeln!(out, "}}")?;
    Ok(())
}

fn render_stream_handler(
    out: &mut String,
    binding: &ServiceBinding,
    method: &MethodSignature,
) -> Result<()> {
    let session = binding.item(method, "_session");
    writeln!(out, "async fn {}{}(", binding.item(method, ""), binding.generics())?;
    writeln!(out, "    State(service): State<{}>,", binding.state_type())?;
    writeln!(out, "    upgrade: WebSocketUpgrade,")?;
    writeln!(out, ") -> Response {{")?;
    writeln!(out, "    upgrade.on_upgrade(move |socket| async move {{")?;
    writeln!(out, "        let (mut sink, source) = socket.split();")?;
    writeln!(out, "        if let Err(err) = {}(service, &mut sink, source).await {{", session)?;
    writeln!(out, "            report_failure(&mut sink, err).await;")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }})")?;
    writeln!(out, "}}\n")?;

    let request = request_envelope(&binding.service.name, &method.name);
    writeln!(out, "async fn {}{}(", session, binding.generics())?;
    writeln!(out, "    service: {},", binding.state_type())?;
    writeln!(out, "    sink: &mut SplitSink<WebSocket, Message>,")?;
    writeln!(out, "    mut source: SplitStream<WebSocket>,")?;
    writeln!(out, ") -> Result<(), ServerError> {{")?;
    writeln!(out, "    let request: models::{} = receive_request(&mut source).await?;", request)?;
    out.push_str(&decode_params(method, 4));
    if let Some(param) = method.stream_param() {
        writeln!(
            out,
            "    let input = inbound::<{}, _>(source);",
            wire_type_in(&param.ty, "models::")
        )?;
    }
    let call = domain_call(method, "input", DOMAIN_ERROR);
    if method.shape.streams_responses() {
        let item = method.response_payload().map(|ty| wire_type_in(ty, "models::"));
        writeln!(out, "    let output = {};", call)?;
        writeln!(out, "    let mut output = std::pin::pin!(output);")?;
        writeln!(out, "    while let Some(item) = output.next().await {{")?;
        writeln!(
            out,
            "        let item: {} = IntoWire::into_wire(item).map_err(ServerError::encode)?;",
            item.unwrap_or_else(|| "()".to_string())
        )?;
        writeln!(out, "        send_frame(sink, Frame::Item(item)).await?;")?;
        writeln!(out, "    }}")?;
    } else {
        match &method.returns {
            Some(ty) => {
                writeln!(out, "    let result = {};", call)?;
                writeln!(
                    out,
                    "    let payload: {} = IntoWire::into_wire(result).map_err(ServerError::encode)?;",
                    wire_type_in(ty, "models::")
                )?;
                writeln!(out, "    send_frame(sink, Frame::Item(payload)).await?;")?;
            }
            None => {
                writeln!(out, "    {};", call)?;
                writeln!(out, "    send_frame(sink, Frame::Item(())).await?;")?;
            }
        }
    }
    writeln!(out, "    send_frame(sink, Frame::<()>::End).await")?;
    writeln!(out, "}}")?;
    Ok(())
}

fn render_service_router(out: &mut String, binding: &ServiceBinding) -> Result<()> {
    writeln!(out, "\n/// Routes of `{}`.", binding.service.name)?;
    writeln!(
        out,
        "pub fn {}_router{}(service: {}) -> Router {{",
        binding.segment,
        binding.generics(),
        binding.state_type()
    )?;
    writeln!(out, "    Router::new()")?;
    for method in &binding.service.methods {
        let verb = if method.shape.is_streaming() { "get" } else { "post" };
        writeln!(
            out,
            "        .route(\"{}\", {}({}{}))",
            binding.route(method),
            verb,
            binding.item(method, ""),
            binding.turbofish()
        )?;
    }
    writeln!(out, "        .with_state(service)")?;
    writeln!(out, "}}")?;
    Ok(())
}

fn render_router(out: &mut String, bindings: &[ServiceBinding]) -> Result<()> {
    let generics: Vec<String> = bindings
        .iter()
        .filter(|binding| !binding.generics().is_empty())
        .map(|binding| {
            format!("{}: {} + Send + Sync + 'static", implementor(binding), binding.domain)
        })
        .collect();
    let params: Vec<String> = bindings
        .iter()
        .map(|binding| {
            let ty = if binding.generics().is_empty() {
                binding.state_type()
            } else {
                format!("Arc<{}>", implementor(binding))
            };
            format!("{}: {}", sanitize_identifier(&binding.segment), ty)
        })
        .collect();

    writeln!(out, "\n/// Routes of every service, merged into one router.")?;
    let generics =
        if generics.is_empty() { String::new() } else { format!("<{}>", generics.join(", ")) };
    writeln!(out, "pub fn router{}({}) -> Router {{", generics, params.join(", "))?;
    writeln!(out, "    Router::new()")?;
    for binding in bindings {
        writeln!(
            out,
            "        .merge({}_router({}))",
            binding.segment,
            sanitize_identifier(&binding.segment)
        )?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Generic parameter standing for the implementor of a trait service.
fn implementor(binding: &ServiceBinding) -> String {
    format!("{}Impl", pascal_case(&binding.service.name))
}

fn render_client(ir: &ServiceIR, options: &GeneratorOptions) -> String {
    let mut out =
        CLIENT_TEMPLATE.replace("{{CHANNEL_CAPACITY}}", &options.channel_capacity.to_string());
    for service in ir.services() {
        let client = format!("{}Client", pascal_case(&service.name));
        let binding = ServiceBinding::new(service, options);
        out.push('\n');
        out.push_str(&format!("/// Client of `{}`.\n", service.name));
        if service.description.is_some() {
            out.push_str("///\n");
            out.push_str(&format_doc_comment(service.description.as_deref(), 0));
        }
        out.push_str("#[derive(Debug, Clone)]\n");
        out.push_str(&format!("pub struct {} {{\n", client));
        out.push_str("    http: reqwest::Client,\n    base_url: String,\n    channel_capacity: usize,\n}\n\n");
        out.push_str(&format!("impl {} {{\n", client));
        out.push_str(CLIENT_CONSTRUCTORS);
        for method in &service.methods {
            out.push('\n');
            out.push_str(&render_client_method(&binding, method));
        }
        out.push_str("}\n");
    }
    with_header(BACKEND, &out)
}

const CLIENT_CONSTRUCTORS: &str = r#"    /// Client of the server at `base_url`, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Client sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, channel_capacity: CHANNEL_CAPACITY }
    }

    /// Bound of the stream queues opened by this client.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
"#;

fn render_client_method(binding: &ServiceBinding, method: &MethodSignature) -> String {
    let service = &binding.service.name;
    let (declared, fields) = client_params(method);
    let request = format!("models::{} {{ {} }}", request_envelope(service, &method.name), fields);
    let route = binding.route(method);
    let name = client_method_name(&method.name);
    let payload = method
        .response_payload()
        .map(|ty| wire_type_in(ty, "models::"))
        .unwrap_or_else(|| "()".to_string());

    let mut out = format_doc_comment(method.description.as_deref(), 4);
    match method.shape {
        InteractionShape::Unary => {
            let response = response_envelope(service, &method.name);
            out.push_str(&format!(
                "    pub async fn {}(&self{}) -> Result<{}, ClientError> {{\n",
                name, declared, payload
            ));
            out.push_str(&format!("        let request = {};\n", request));
            out.push_str(&format!(
                "        let response: models::{} =\n            post_json(&self.http, format!(\"{{}}{}\", self.base_url), &request).await?;\n",
                response, route
            ));
            out.push_str("        Ok(response.payload)\n    }\n");
        }
        InteractionShape::FireAndForget => {
            out.push_str(&format!(
                "    pub async fn {}(&self{}) -> Result<(), ClientError> {{\n",
                name, declared
            ));
            out.push_str(&format!("        let request = {};\n", request));
            out.push_str(&format!(
                "        post_notification(&self.http, format!(\"{{}}{}\", self.base_url), &request).await\n    }}\n",
                route
            ));
        }
        shape => {
            let input = method
                .stream_param()
                .map(|param| wire_type_in(&param.ty, "models::"))
                .unwrap_or_else(|| "()".to_string());
            let (returns, build) = match shape {
                InteractionShape::RequestStream => (
                    format!("RequestStreamCall<{}, {}>", input, payload),
                    "RequestStreamCall {\n            sender: spawn_outbound(sink, self.channel_capacity),\n            response: spawn_inbound(source, 1),\n        }",
                ),
                InteractionShape::ResponseStream => (
                    format!("StreamReceiver<{}>", payload),
                    "spawn_inbound(source, self.channel_capacity)",
                ),
                _ => (
                    format!("DuplexChannel<{}, {}>", input, payload),
                    "DuplexChannel {\n            sender: spawn_outbound(sink, self.channel_capacity),\n            receiver: spawn_inbound(source, self.channel_capacity),\n        }",
                ),
            };
            let sink = if shape.streams_requests() { "sink" } else { "_sink" };
            out.push_str(&format!(
                "    pub async fn {}(&self{}) -> Result<{}, ClientError> {{\n",
                name, declared, returns
            ));
            out.push_str(&format!("        let request = {};\n", request));
            out.push_str(&format!(
                "        let socket = open_stream(ws_url(&self.base_url, \"{}\"), &request).await?;\n",
                route
            ));
            out.push_str(&format!("        let ({}, source) = socket.split();\n", sink));
            out.push_str(&format!("        Ok({})\n    }}\n", build));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ir::{ParamDef, Service, ServiceKind, TypeNode};

    use super::*;

    fn service(kind: ServiceKind, methods: Vec<MethodSignature>) -> Service {
        Service {
            name: "Telemetry".into(),
            kind,
            source: "crate::telemetry::Telemetry".into(),
            description: None,
            methods,
        }
    }

    fn watch() -> MethodSignature {
        MethodSignature {
            name: "watch".into(),
            params: vec![ParamDef {
                name: "sensor".into(),
                ty: TypeNode::text(),
                required: true,
                by_ref: true,
            }],
            returns: Some(TypeNode::stream(TypeNode::Record("Reading".into()))),
            shape: InteractionShape::ResponseStream,
            fallible: true,
            is_async: true,
            description: None,
        }
    }

    #[test]
    fn trait_services_get_generic_handlers() {
        let ir = ServiceIR::new(vec![service(ServiceKind::Trait, vec![watch()])], BTreeMap::new());
        let server = render_server(&ir, &GeneratorOptions::default()).expect("server");

        assert!(server.contains(
            "async fn telemetry_watch_session<S: crate::telemetry::Telemetry + Send + Sync + 'static>("
        ));
        assert!(server.contains(".route(\"/telemetry/watch\", get(telemetry_watch::<S>))"));
        assert!(server.contains("let arg_sensor: String = FromWire::from_wire(request.sensor)?;"));
        assert!(server.contains(
            "let output = service.watch(&arg_sensor).await.map_err(|err| ServerError::Domain(err.to_string()))?;"
        ));
        assert!(server.contains("let item: models::Reading = IntoWire::into_wire(item)"));
        assert!(server.contains(
            "pub fn router<TelemetryImpl: crate::telemetry::Telemetry + Send + Sync + 'static>(telemetry: Arc<TelemetryImpl>) -> Router {"
        ));
    }

    #[test]
    fn client_streams_open_websockets_on_the_server_route() {
        let ir = ServiceIR::new(vec![service(ServiceKind::Type, vec![watch()])], BTreeMap::new());
        let options = GeneratorOptions { channel_capacity: 8, ..GeneratorOptions::default() };
        let client = render_client(&ir, &options);

        assert!(client.contains("pub const CHANNEL_CAPACITY: usize = 8;"));
        assert!(client.contains(
            "pub async fn watch(&self, sensor: String) -> Result<StreamReceiver<models::Reading>, ClientError> {"
        ));
        assert!(client.contains("open_stream(ws_url(&self.base_url, \"/telemetry/watch\"), &request)"));
        assert!(client.contains("let (_sink, source) = socket.split();"));
    }

    #[test]
    fn stream_frames_are_sent_by_value() {
        let ir = ServiceIR::new(vec![service(ServiceKind::Type, vec![watch()])], BTreeMap::new());
        let options = GeneratorOptions::default();
        let client = render_client(&ir, &options);
        let server = render_server(&ir, &options).expect("server");

        for text in [&client, &server] {
            assert!(text.contains("    frame: Frame<T>,\n"));
            assert!(!text.contains("&Frame"));
        }
        assert!(client.contains("send_frame(&mut sink, Frame::Item(item)).await"));
        assert!(server.contains("send_frame(sink, Frame::Item(item)).await?;"));
    }
}
