//! HTTP and WebSocket server. Unary and fire-and-forget methods are `POST`
//! routes taking the request envelope as JSON; streaming methods upgrade a
//! `GET` on the same path to a WebSocket carrying JSON frames.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{BoxStream, SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::models;
use super::wire::{ConversionError, Frame, FromWire, IntoWire};

/// Failure while serving a call.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request could not be decoded or converted
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The domain method returned an error
    #[error("{0}")]
    Domain(String),
    /// The result could not be converted to its wire form
    #[error("failed to encode the response: {0}")]
    Encode(String),
    /// The connection failed
    #[error("transport error: {0}")]
    Transport(String),
}

impl ServerError {
    /// Conversion failure on the way out.
    pub fn encode(err: ConversionError) -> Self { ServerError::Encode(err.0) }
}

impl From<ConversionError> for ServerError {
    fn from(err: ConversionError) -> Self { ServerError::BadRequest(err.0) }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

async fn send_frame<T: Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Frame<T>,
) -> Result<(), ServerError> {
    let text = serde_json::to_string(&frame).map_err(|err| ServerError::Encode(err.to_string()))?;
    sink.send(Message::Text(text.into())).await.map_err(|err| ServerError::Transport(err.to_string()))
}

async fn report_failure(sink: &mut SplitSink<WebSocket, Message>, err: ServerError) {
    tracing::debug!(error = %err, "stream session failed");
    let _ = send_frame(sink, Frame::<()>::Error(err.to_string())).await;
    let _ = sink.close().await;
}

/// The first text message of a session is the request envelope.
async fn receive_request<R: DeserializeOwned>(
    source: &mut SplitStream<WebSocket>,
) -> Result<R, ServerError> {
    while let Some(message) = source.next().await {
        match message.map_err(|err| ServerError::Transport(err.to_string()))? {
            Message::Text(text) =>
                return serde_json::from_str(&text)
                    .map_err(|err| ServerError::BadRequest(err.to_string())),
            Message::Close(_) => break,
            _ => continue,
        }
    }
    Err(ServerError::Transport("connection closed before the request arrived".to_string()))
}

/// Items sent by the client, converted to domain values. Ends on the first
/// `end` or `error` frame, on close, or on an item that does not decode.
fn inbound<W, D>(source: SplitStream<WebSocket>) -> BoxStream<'static, D>
where
    W: DeserializeOwned + Send + 'static,
    D: FromWire<W> + Send + 'static,
{
    futures::stream::unfold(source, |mut source| async move {
        loop {
            let text = match source.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(_)) => continue,
            };
            let item = match serde_json::from_str::<Frame<W>>(&text) {
                Ok(Frame::Item(item)) => D::from_wire(item),
                Ok(Frame::End) | Ok(Frame::Error(_)) => return None,
                Err(err) => {
                    tracing::debug!(error = %err, "undecodable frame ends the inbound stream");
                    return None;
                }
            };
            match item {
                Ok(item) => return Some((item, source)),
                Err(err) => {
                    tracing::debug!(error = %err, "unconvertible item ends the inbound stream");
                    return None;
                }
            }
        }
    })
    .boxed()
}
