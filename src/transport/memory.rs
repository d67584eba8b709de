//! In-process transport pair.
//!
//! Two [`MemoryTransport`] ends wired back to back: every frame sent on one
//! end is received on the other. Queues are unbounded, matching the
//! fire-and-forget delivery of browser message ports; flow control happens
//! in the multiplexer above.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

// ============================================================================
// MemoryTransport
// ============================================================================

/// One end of an in-process transport pair.
///
/// Closing or dropping an end ends the peer's stream.
#[derive(Debug)]
pub struct MemoryTransport {
    /// Frames from the peer.
    incoming: mpsc::UnboundedReceiver<Result<Value>>,
    /// Frames to the peer. `None` once closed.
    outgoing: Option<mpsc::UnboundedSender<Result<Value>>>,
}

impl MemoryTransport {
    /// Creates two connected ends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        (
            Self {
                incoming: a_rx,
                outgoing: Some(b_tx),
            },
            Self {
                incoming: b_rx,
                outgoing: Some(a_tx),
            },
        )
    }

    /// Makes the peer's stream yield a transport error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the peer is gone.
    pub fn inject_error(&self, message: impl Into<String>) -> Result<()> {
        let tx = self.outgoing.as_ref().ok_or(Error::ConnectionClosed)?;
        tx.send(Err(Error::transport(message)))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns `true` if frames can no longer reach the peer.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outgoing.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

// ============================================================================
// Stream / Sink
// ============================================================================

impl Stream for MemoryTransport {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.incoming.poll_recv(cx)
    }
}

impl Sink<Value> for MemoryTransport {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        if self.is_closed() {
            Poll::Ready(Err(Error::ConnectionClosed))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn start_send(self: Pin<&mut Self>, item: Value) -> Result<()> {
        let tx = self.outgoing.as_ref().ok_or(Error::ConnectionClosed)?;
        tx.send(Ok(item)).map_err(|_| Error::ConnectionClosed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.outgoing = None;
        Poll::Ready(Ok(()))
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

    #[tokio::test]
    async fn test_pair_delivers_in_order() {
        let (mut a, mut b) = MemoryTransport::pair();

        a.send(json!(1)).await.expect("send");
        a.send(json!(2)).await.expect("send");

        assert_eq!(b.next().await.expect("frame").expect("ok"), json!(1));
        assert_eq!(b.next().await.expect("frame").expect("ok"), json!(2));
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.close().await.expect("close");

        assert!(b.next().await.is_none());
        assert!(a.is_closed());
    }

    #[tokio::test]
    async fn test_send_after_peer_dropped_fails() {
        let (mut a, b) = MemoryTransport::pair();
        drop(b);

        let err = a.send(json!("x")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_dropping_one_end_ends_the_other() {
        let (a, mut b) = MemoryTransport::pair();
        drop(a);

        assert!(tokio_test::block_on(b.next()).is_none());
        assert!(b.is_closed());
    }

    #[tokio::test]
    async fn test_inject_error() {
        let (a, mut b) = MemoryTransport::pair();
        a.inject_error("port reset").expect("inject");

        let err = b.next().await.expect("item").unwrap_err();
        assert!(err.is_connection_error());
    }
}
