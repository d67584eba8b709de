//! Channel forwarder.
//!
//! Pairs same-named channels on two multiplexers and relays payloads
//! between them in both directions.
//!
//! # Pairing Lifecycle
//!
//! ```text
//!   mux A                          mux B
//!   Channel "x" ──► pump A→B ──►   Channel "x"
//!   Channel "x" ◄── pump B→A ◄──   Channel "x"
//! ```
//!
//! - Each direction preserves arrival order; nothing is promised across
//!   directions.
//! - A pump awaits room in the destination multiplexer's outbound queue
//!   before reading the next payload from its source. While the
//!   destination is saturated, frames for this channel wait in the source
//!   channel's queue and other channels keep flowing.
//! - The first direction to end (cleanly or with an error) ends the pairing.
//!   Both channels are closed and the outcome is reported exactly once.
//!   The owning multiplexers and every other pairing keep running.

// ============================================================================
// Imports
// ============================================================================

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::Result;
use crate::mux::{Channel, ChannelReader, ChannelWriter, Multiplexer};

// ============================================================================
// ChannelForwarder
// ============================================================================

/// Relays one channel name between two multiplexers.
pub struct ChannelForwarder;

impl ChannelForwarder {
    /// Creates `name` on both multiplexers and starts relaying.
    ///
    /// `on_terminal` receives the pairing outcome once: `Ok(())` for a
    /// clean close, `Err` if either side failed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateChannel`] if `name` already exists
    /// on either multiplexer.
    pub fn connect<F>(
        name: &str,
        mux_a: &Multiplexer,
        mux_b: &Multiplexer,
        on_terminal: F,
    ) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let channel_a = mux_a.create_channel(name)?;
        let channel_b = mux_b.create_channel(name)?;

        debug!(
            channel = %name,
            from = %mux_a.label(),
            to = %mux_b.label(),
            "Forwarding channel"
        );

        Ok(tokio::spawn(async move {
            let outcome = Self::relay(channel_a, channel_b).await;
            on_terminal(outcome);
        }))
    }

    /// Relays between two channels until either one ends.
    ///
    /// # Errors
    ///
    /// Returns the error of the direction that failed first.
    pub async fn relay(channel_a: Channel, channel_b: Channel) -> Result<()> {
        let name = channel_a.name().to_string();
        let (a_rx, a_tx) = channel_a.split();
        let (b_rx, b_tx) = channel_b.split();

        // Dropping the losing pump drops its reader, closing that side too
        let outcome = tokio::select! {
            result = Self::pump(a_rx, &b_tx) => result,
            result = Self::pump(b_rx, &a_tx) => result,
        };

        trace!(channel = %name, ok = outcome.is_ok(), "Pairing ended");
        outcome
    }

    /// Moves payloads from `source` to `destination` in arrival order.
    async fn pump(mut source: ChannelReader, destination: &ChannelWriter) -> Result<()> {
        while let Some(data) = source.recv().await? {
            destination.send(data).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use tokio::io::duplex;
    use tokio::sync::oneshot;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use crate::error::Error;
    use crate::mux::{ChannelState, MuxOptions};
    use crate::transport::{MemoryTransport, WebSocketTransport};

    fn frame(name: &str, data: Value) -> Value {
        json!({ "name": name, "data": data })
    }

    struct Fixture {
        page_peer: MemoryTransport,
        ext_peer: MemoryTransport,
        page: Multiplexer,
        ext: Multiplexer,
    }

    fn fixture() -> Fixture {
        let (page_local, page_peer) = MemoryTransport::pair();
        let (ext_local, ext_peer) = MemoryTransport::pair();
        Fixture {
            page_peer,
            ext_peer,
            page: Multiplexer::new("page", page_local),
            ext: Multiplexer::new("extension", ext_local),
        }
    }

    fn reporter() -> (
        impl FnOnce(Result<()>) + Send + 'static,
        oneshot::Receiver<Result<()>>,
    ) {
        let (tx, rx) = oneshot::channel();
        (
            move |outcome| {
                let _ = tx.send(outcome);
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_relays_both_directions() {
        let mut f = fixture();
        let (report, _rx) = reporter();
        ChannelForwarder::connect("provider", &f.page, &f.ext, report).expect("connect");

        f.page_peer
            .send(frame("provider", json!("to-ext")))
            .await
            .expect("send");
        f.ext_peer
            .send(frame("provider", json!("to-page")))
            .await
            .expect("send");

        let at_ext = f.ext_peer.next().await.expect("frame").expect("ok");
        let at_page = f.page_peer.next().await.expect("frame").expect("ok");
        assert_eq!(at_ext, frame("provider", json!("to-ext")));
        assert_eq!(at_page, frame("provider", json!("to-page")));
    }

    #[tokio::test]
    async fn test_close_reports_once_and_closes_other_side() {
        let f = fixture();
        let (report, rx) = reporter();
        let handle =
            ChannelForwarder::connect("provider", &f.page, &f.ext, report).expect("connect");

        drop(f.page_peer);

        let outcome = rx.await.expect("one terminal event");
        assert!(outcome.is_ok());
        handle.await.expect("task");

        assert_eq!(f.ext.channel_state("provider"), Some(ChannelState::Closed));
        assert!(f.ext.status().is_open());
    }

    #[tokio::test]
    async fn test_error_reported() {
        let f = fixture();
        let (report, rx) = reporter();
        ChannelForwarder::connect("provider", &f.page, &f.ext, report).expect("connect");

        f.ext_peer.inject_error("background crashed").expect("inject");

        let outcome = rx.await.expect("one terminal event");
        assert!(matches!(outcome, Err(Error::Transport { .. })));
        assert_eq!(f.page.channel_state("provider"), Some(ChannelState::Closed));
    }

    #[tokio::test]
    async fn test_pairing_failure_is_contained() {
        let mut f = fixture();
        let (other_local, other_peer) = MemoryTransport::pair();
        let other = Multiplexer::new("other", other_local);

        let (report_x, _rx_x) = reporter();
        let (report_y, rx_y) = reporter();
        ChannelForwarder::connect("provider", &f.page, &f.ext, report_x).expect("connect");
        ChannelForwarder::connect("capabilities", &f.page, &other, report_y).expect("connect");

        drop(other_peer);
        assert!(rx_y.await.expect("terminal").is_ok());

        f.page_peer
            .send(frame("provider", json!("still alive")))
            .await
            .expect("send");
        let at_ext = f.ext_peer.next().await.expect("frame").expect("ok");
        assert_eq!(at_ext, frame("provider", json!("still alive")));
        assert!(f.page.status().is_open());
    }

    /// Polls until the backlog of `name` stops changing and is non-zero.
    async fn settled_backlog(mux: &Multiplexer, name: &str) -> usize {
        let mut last = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let queued = mux.queued_frames(name).unwrap_or(0);
            if queued > 0 && queued == last {
                return queued;
            }
            last = queued;
        }
        last
    }

    #[tokio::test]
    async fn test_saturated_destination_pauses_source() {
        const FRAMES: usize = 200;

        let (page_local, mut page_peer) = MemoryTransport::pair();
        let (client_io, server_io) = duplex(256);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let mut server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        let options = MuxOptions::default().with_channel_capacity(1);
        let page = Multiplexer::with_options("page", page_local, options);
        let ext = Multiplexer::with_options("extension", WebSocketTransport::new(client), options);
        let (report, _rx) = reporter();
        ChannelForwarder::connect("provider", &page, &ext, report).expect("connect");

        for i in 0..FRAMES {
            page_peer
                .send(frame("provider", json!(i)))
                .await
                .expect("send");
        }

        // The extension peer reads nothing, so the source stops being drained
        let stalled = settled_backlog(&page, "provider").await;
        assert!(stalled > FRAMES / 2, "only {stalled} frames held back");

        for i in 0..FRAMES {
            let message = server.next().await.expect("message").expect("ok");
            let value: Value =
                serde_json::from_str(message.to_text().expect("text")).expect("json");
            assert_eq!(value, frame("provider", json!(i)));
        }
        assert_eq!(page.queued_frames("provider"), Some(0));
    }

    #[tokio::test]
    async fn test_duplicate_pairing_fails() {
        let f = fixture();
        let (report_a, _) = reporter();
        let (report_b, _) = reporter();
        ChannelForwarder::connect("provider", &f.page, &f.ext, report_a).expect("connect");

        let err = ChannelForwarder::connect("provider", &f.page, &f.ext, report_b).unwrap_err();
        assert!(err.is_config_error());
    }

    proptest! {
        #[test]
        fn prop_preserves_order_per_direction(
            up in prop::collection::vec(any::<u32>(), 0..50),
            down in prop::collection::vec(any::<u32>(), 0..50),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");

            let (got_up, got_down) = runtime.block_on(async {
                let mut f = fixture();
                let (report, _rx) = reporter();
                ChannelForwarder::connect("provider", &f.page, &f.ext, report).expect("connect");

                for (u, d) in up.iter().map(Some).chain(std::iter::repeat(None)).zip(
                    down.iter().map(Some).chain(std::iter::repeat(None)),
                ).take(up.len().max(down.len())) {
                    if let Some(u) = u {
                        f.page_peer.send(frame("provider", json!(u))).await.expect("send");
                    }
                    if let Some(d) = d {
                        f.ext_peer.send(frame("provider", json!(d))).await.expect("send");
                    }
                }

                let mut got_up = Vec::new();
                for _ in 0..up.len() {
                    let sent = f.ext_peer.next().await.expect("frame").expect("ok");
                    got_up.push(sent["data"].as_u64().expect("u32") as u32);
                }
                let mut got_down = Vec::new();
                for _ in 0..down.len() {
                    let sent = f.page_peer.next().await.expect("frame").expect("ok");
                    got_down.push(sent["data"].as_u64().expect("u32") as u32);
                }
                (got_up, got_down)
            });

            prop_assert_eq!(got_up, up);
            prop_assert_eq!(got_down, down);
        }
    }
}
