//! HTTP and WebSocket client. Every method takes and returns wire models;
//! convert with [`FromWire`] and [`IntoWire`] at the edges.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::models;
use super::wire::{Frame, FromWire, IntoWire};

/// Default bound of the stream queues.
pub const CHANNEL_CAPACITY: usize = {{CHANNEL_CAPACITY}};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Failure while calling a remote service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The WebSocket connection failed
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The server answered with an error status
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },
    /// A payload was not valid JSON for its wire model
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
    /// The server ended a stream with an error frame
    #[error("remote error: {0}")]
    Remote(String),
    /// The stream closed before the expected message
    #[error("stream closed")]
    Closed,
}

/// Sending half of a client stream. Dropping every clone (or calling
/// [`StreamSender::finish`]) ends the stream.
#[derive(Debug, Clone)]
pub struct StreamSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> StreamSender<T> {
    /// Queue one item; waits while the queue is full.
    pub async fn send(&self, item: T) -> Result<(), ClientError> {
        self.inner.send(item).await.map_err(|_| ClientError::Closed)
    }

    /// End the stream.
    pub fn finish(self) {}
}

/// Receiving half of a server stream.
#[derive(Debug)]
pub struct StreamReceiver<T> {
    inner: mpsc::Receiver<Result<T, ClientError>>,
}

impl<T> StreamReceiver<T> {
    /// Next item; `None` once the server ended the stream.
    pub async fn recv(&mut self) -> Option<Result<T, ClientError>> { self.inner.recv().await }

    /// Adapt into a [`futures::Stream`].
    pub fn into_stream(self) -> ReceiverStream<Result<T, ClientError>> {
        ReceiverStream::new(self.inner)
    }
}

/// An open request-streaming call.
#[derive(Debug)]
pub struct RequestStreamCall<In, Out> {
    sender: StreamSender<In>,
    response: StreamReceiver<Out>,
}

impl<In, Out> RequestStreamCall<In, Out> {
    /// Send one item.
    pub async fn send(&self, item: In) -> Result<(), ClientError> { self.sender.send(item).await }

    /// End the request stream and wait for the response.
    pub async fn finish(self) -> Result<Out, ClientError> {
        let Self { sender, mut response } = self;
        sender.finish();
        response.recv().await.unwrap_or(Err(ClientError::Closed))
    }
}

/// An open duplex call: both halves are independent.
#[derive(Debug)]
pub struct DuplexChannel<In, Out> {
    /// Items to the server
    pub sender: StreamSender<In>,
    /// Items from the server
    pub receiver: StreamReceiver<Out>,
}

async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
    http: &reqwest::Client,
    url: String,
    request: &Req,
) -> Result<Resp, ClientError> {
    let response = http.post(url).json(request).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(server_error(status, response).await);
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn post_notification<Req: Serialize>(
    http: &reqwest::Client,
    url: String,
    request: &Req,
) -> Result<(), ClientError> {
    let response = http.post(url).json(request).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(server_error(status, response).await);
    }
    Ok(())
}

async fn server_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body),
        Err(err) => err.to_string(),
    };
    ClientError::Server { status: status.as_u16(), message }
}

fn ws_url(base_url: &str, path: &str) -> String {
    let base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!("{}{}", base, path)
}

/// Connect and send the request envelope.
async fn open_stream<R: Serialize>(url: String, request: &R) -> Result<Socket, ClientError> {
    let (mut socket, _) = connect_async(url).await?;
    let text = serde_json::to_string(request)?;
    socket.send(Message::Text(text.into())).await?;
    Ok(socket)
}

/// The frame is owned so the forwarding task is `Send` for any `T: Send`.
async fn send_frame<T: Serialize>(
    sink: &mut SplitSink<Socket, Message>,
    frame: Frame<T>,
) -> Result<(), ClientError> {
    let text = serde_json::to_string(&frame)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Forward queued items as frames, then `end` once every sender is gone.
fn spawn_outbound<T: Serialize + Send + 'static>(
    sink: SplitSink<Socket, Message>,
    capacity: usize,
) -> StreamSender<T> {
    let (tx, mut rx) = mpsc::channel::<T>(capacity.max(1));
    tokio::spawn(async move {
        let mut sink = sink;
        while let Some(item) = rx.recv().await {
            if let Err(err) = send_frame(&mut sink, Frame::Item(item)).await {
                tracing::debug!(error = %err, "outbound stream failed");
                return;
            }
        }
        let _ = send_frame(&mut sink, Frame::<()>::End).await;
    });
    StreamSender { inner: tx }
}

/// Forward received items until `end`, an error frame, or the receiver is
/// dropped.
fn spawn_inbound<T: DeserializeOwned + Send + 'static>(
    source: SplitStream<Socket>,
    capacity: usize,
) -> StreamReceiver<T> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        let mut source = source;
        while let Some(message) = source.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    let _ = tx.send(Err(ClientError::WebSocket(err))).await;
                    break;
                }
            };
            let next = match serde_json::from_str::<Frame<T>>(&text) {
                Ok(Frame::Item(item)) => Ok(item),
                Ok(Frame::End) => break,
                Ok(Frame::Error(message)) => Err(ClientError::Remote(message)),
                Err(err) => Err(ClientError::Decode(err)),
            };
            let stop = next.is_err();
            if tx.send(next).await.is_err() || stop {
                break;
            }
        }
    });
    StreamReceiver { inner: rx }
}
