//! JSON-RPC 2.0 server over HTTP. Every method is called as
//! `{service}.{method}` on `POST /rpc` with its request envelope as params.
//! Requests without an `id` are notifications and get `204 No Content`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::models;
use super::wire::{ConversionError, FromWire, IntoWire};

/// The body is not a JSON-RPC 2.0 request.
pub const INVALID_REQUEST: i64 = -32600;
/// No method with the requested name.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// The params do not decode or convert into the method's arguments.
pub const INVALID_PARAMS: i64 = -32602;
/// The server failed to produce a response.
pub const INTERNAL_ERROR: i64 = -32603;
/// The domain method returned an error.
pub const DOMAIN_ERROR: i64 = -32000;

/// Failure while serving a call.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Malformed request object
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Unknown method name
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// Params that do not fit the method
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The domain method returned an error
    #[error("{0}")]
    Domain(String),
    /// The result could not be encoded
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            ServerError::InvalidRequest(_) => INVALID_REQUEST,
            ServerError::MethodNotFound(_) => METHOD_NOT_FOUND,
            ServerError::InvalidParams(_) => INVALID_PARAMS,
            ServerError::Domain(_) => DOMAIN_ERROR,
            ServerError::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Conversion failure on the way out.
    pub fn encode(err: ConversionError) -> Self { ServerError::Internal(err.0) }
}

impl From<ConversionError> for ServerError {
    fn from(err: ConversionError) -> Self { ServerError::InvalidParams(err.0) }
}

struct Call {
    id: Option<Value>,
    method: String,
    params: Value,
}

/// Split a request object; on failure also return whatever id it carried.
fn parse_call(body: Value) -> Result<Call, (Value, ServerError)> {
    let mut object = match body {
        Value::Object(object) => object,
        _ => return Err((Value::Null, ServerError::InvalidRequest("expected an object".into()))),
    };
    let id = object.remove("id");
    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        let id = id.unwrap_or(Value::Null);
        return Err((id, ServerError::InvalidRequest("`jsonrpc` must be \"2.0\"".into())));
    }
    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            let id = id.unwrap_or(Value::Null);
            return Err((id, ServerError::InvalidRequest("`method` must be a string".into())));
        }
    };
    let params = object.remove("params").unwrap_or(Value::Null);
    Ok(Call { id, method, params })
}

fn decode_params<R: DeserializeOwned>(params: Value) -> Result<R, ServerError> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|err| ServerError::InvalidParams(err.to_string()))
}

fn encode_result<T: Serialize>(value: &T) -> Result<Value, ServerError> {
    serde_json::to_value(value).map_err(|err| ServerError::Internal(err.to_string()))
}

fn reply(id: Option<Value>, outcome: Result<Value, ServerError>) -> Response {
    let Some(id) = id else {
        if let Err(err) = outcome {
            tracing::debug!(error = %err, "notification failed");
        }
        return StatusCode::NO_CONTENT.into_response();
    };
    let body = match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => {
            tracing::debug!(error = %err, code = err.code(), "call failed");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": err.code(), "message": err.to_string() },
            })
        }
    };
    warp::reply::json(&body).into_response()
}
