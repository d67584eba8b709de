//! WebSocket transport adapter.
//!
//! Wraps a `tokio-tungstenite` [`WebSocketStream`] so an extension port
//! tunnelled over WebSocket can back a multiplexer. Frames travel as JSON
//! text messages.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Sink, Stream};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// WebSocketTransport
// ============================================================================

/// A [`crate::Transport`] over a WebSocket connection.
///
/// Text messages are parsed as JSON frames. Text that is not JSON is
/// logged and skipped. Binary, ping and pong messages are ignored. A close
/// message ends the stream.
pub struct WebSocketTransport<S> {
    inner: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established WebSocket stream.
    #[inline]
    #[must_use]
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner }
    }

    /// Returns the wrapped stream.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> WebSocketStream<S> {
        self.inner
    }
}

// ============================================================================
// Stream / Sink
// ============================================================================

impl<S> Stream for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(&text) {
                    Ok(frame) => return Poll::Ready(Some(Ok(frame))),
                    Err(e) => {
                        warn!(error = %e, "Skipping non-JSON text frame");
                    }
                },

                Some(Ok(Message::Close(_))) | None => {
                    trace!("WebSocket transport ended");
                    return Poll::Ready(None);
                }

                Some(Err(e)) => return Poll::Ready(Some(Err(Error::WebSocket(e)))),

                // Ignore Binary, Ping, Pong, Frame
                Some(Ok(_)) => {}
            }
        }
    }
}

impl<S> Sink<Value> for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Error = Error;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_ready(cx).map_err(Error::from)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Value) -> Result<()> {
        let json = serde_json::to_string(&item)?;
        Pin::new(&mut self.inner)
            .start_send(Message::Text(json.into()))
            .map_err(Error::from)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx).map_err(Error::from)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        Pin::new(&mut self.inner).poll_close(cx).map_err(Error::from)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio::io::{DuplexStream, duplex};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn socket_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client_io, server_io) = duplex(16 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        (client, server)
    }

    #[tokio::test]
    async fn test_frames_cross_as_json_text() {
        let (client, mut server) = socket_pair().await;
        let mut transport = WebSocketTransport::new(client);

        transport
            .send(json!({"name": "provider", "data": 7}))
            .await
            .expect("send");

        match server.next().await.expect("message").expect("ok") {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(&text).expect("json");
                assert_eq!(value, json!({"name": "provider", "data": 7}));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_and_binary_are_skipped() {
        let (client, mut server) = socket_pair().await;
        let mut transport = WebSocketTransport::new(client);

        server
            .send(Message::Text("not json".into()))
            .await
            .expect("send");
        server
            .send(Message::Binary(vec![1u8, 2, 3].into()))
            .await
            .expect("send");
        server
            .send(Message::Text(r#"{"name":"capabilities"}"#.into()))
            .await
            .expect("send");

        let frame = transport.next().await.expect("frame").expect("ok");
        assert_eq!(frame, json!({"name": "capabilities"}));
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let (client, mut server) = socket_pair().await;
        let mut transport = WebSocketTransport::new(client);

        server.close(None).await.expect("close");

        assert!(transport.next().await.is_none());
    }
}
