//! JSON-RPC 2.0 client over HTTP. Every method takes and returns wire
//! models; convert with [`FromWire`] and [`IntoWire`] at the edges.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use super::models;
use super::wire::{FromWire, IntoWire};

/// Failure while calling a remote service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// A payload was not valid JSON for its wire model
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// The server answered with a JSON-RPC error
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },
    /// The response carried neither a result nor an error
    #[error("response has no result")]
    MissingResult,
}

#[derive(Debug, Clone)]
struct Transport {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl Transport {
    fn new(http: reqwest::Client, base_url: String) -> Self {
        let url = format!("{}/rpc", base_url.trim_end_matches('/'));
        Self { http, url, next_id: Arc::new(AtomicU64::new(1)) }
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = serde_json::to_value(params)?;
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let response = self.http.post(&self.url).json(&body).send().await?.error_for_status()?;
        let mut response: Value = serde_json::from_slice(&response.bytes().await?)?;
        if let Some(error) = response.get("error") {
            return Err(ClientError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        match response.get_mut("result").map(Value::take) {
            Some(result) => Ok(serde_json::from_value(result)?),
            None => Err(ClientError::MissingResult),
        }
    }

    async fn notify<P: Serialize>(&self, method: &str, params: &P) -> Result<(), ClientError> {
        let params = serde_json::to_value(params)?;
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        self.http.post(&self.url).json(&body).send().await?.error_for_status()?;
        Ok(())
    }
}
