//! Channel handles.
//!
//! A [`Channel`] is one named duplex stream inside a [`Multiplexer`]. It
//! splits into a [`ChannelReader`] and a [`ChannelWriter`] so the two
//! directions can be driven independently.
//!
//! Dropping the reader closes the channel: its route is removed and any
//! later frames for that name are discarded by the multiplexer.
//!
//! [`Multiplexer`]: super::Multiplexer

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::multiplexer::{MuxStatus, Registry};

// ============================================================================
// Channel
// ============================================================================

/// A named duplex stream within one multiplexer.
pub struct Channel {
    reader: ChannelReader,
    writer: ChannelWriter,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.reader.name)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Creates a channel from its registered parts.
    pub(crate) fn new(
        name: &str,
        inbound: mpsc::UnboundedReceiver<Value>,
        queued: Arc<AtomicUsize>,
        status: watch::Receiver<MuxStatus>,
        registry: Arc<Mutex<Registry>>,
        outgoing: mpsc::Sender<Envelope>,
    ) -> Self {
        let name: Arc<str> = Arc::from(name);

        Self {
            reader: ChannelReader {
                name: Arc::clone(&name),
                inbound,
                queued,
                status,
                registry,
            },
            writer: ChannelWriter { name, outgoing },
        }
    }

    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.reader.name
    }

    /// Receives the next payload. See [`ChannelReader::recv`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the underlying transport failed.
    pub async fn recv(&mut self) -> Result<Option<Value>> {
        self.reader.recv().await
    }

    /// Sends a payload. See [`ChannelWriter::send`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the multiplexer has stopped.
    pub async fn send(&self, data: Value) -> Result<()> {
        self.writer.send(data).await
    }

    /// Splits the channel into independently owned halves.
    #[must_use]
    pub fn split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }

    /// Closes the channel.
    ///
    /// Frames arriving for this name afterwards are discarded.
    pub fn close(self) {
        drop(self);
    }
}

// ============================================================================
// ChannelReader
// ============================================================================

/// Receiving half of a [`Channel`].
pub struct ChannelReader {
    name: Arc<str>,
    inbound: mpsc::UnboundedReceiver<Value>,
    queued: Arc<AtomicUsize>,
    status: watch::Receiver<MuxStatus>,
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for ChannelReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ChannelReader {
    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receives the next payload in arrival order.
    ///
    /// Returns `Ok(None)` once the channel has ended cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the channel ended because the
    /// underlying transport failed.
    pub async fn recv(&mut self) -> Result<Option<Value>> {
        if let Some(data) = self.inbound.recv().await {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return Ok(Some(data));
        }

        let status = self.status.borrow().clone();
        match status {
            MuxStatus::Failed(message) => Err(Error::transport(message)),
            MuxStatus::Open | MuxStatus::Closed => Ok(None),
        }
    }
}

impl Drop for ChannelReader {
    fn drop(&mut self) {
        self.registry.lock().remove_route(&self.name);
        trace!(channel = %self.name, "Channel closed");
    }
}

// ============================================================================
// ChannelWriter
// ============================================================================

/// Sending half of a [`Channel`].
///
/// Cloning a writer shares the same channel name and multiplexer queue.
#[derive(Clone)]
pub struct ChannelWriter {
    name: Arc<str>,
    outgoing: mpsc::Sender<Envelope>,
}

impl fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ChannelWriter {
    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends a payload tagged with this channel's name.
    ///
    /// Waits while the multiplexer's outbound queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the multiplexer has stopped.
    pub async fn send(&self, data: Value) -> Result<()> {
        self.outgoing
            .send(Envelope::new(&*self.name, data))
            .await
            .map_err(|_| Error::ConnectionClosed)
    }
}
