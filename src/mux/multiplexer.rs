//! Multiplexer and event loop.
//!
//! # Event Loop
//!
//! [`Multiplexer::new`] spawns one tokio task that handles:
//!
//! - Incoming frames: unwrap `{name, data}` and route to the matching channel
//! - Outgoing frames: tag channel writes with their name and send them
//! - Shutdown requests
//!
//! Frames for names no channel is registered under are discarded. When the
//! transport ends or fails, every channel is closed and the final
//! [`MuxStatus`] is published. No reconnection is attempted.
//!
//! # Queues
//!
//! | Queue | Bound | When full |
//! |-------|-------|-----------|
//! | Outbound (shared by all writers) | `channel_capacity` | Writers wait |
//! | Inbound (one per channel) | none | Backlog warning at `channel_capacity` |
//!
//! Routing an incoming frame never waits on a channel's consumer, so a
//! stalled channel cannot hold up the others on the same transport.
//! Flow control happens on the write side: a forwarder waits for room in
//! the destination's outbound queue before reading its next frame.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::Envelope;
use crate::transport::Transport;

use super::channel::Channel;

// ============================================================================
// Constants
// ============================================================================

/// Default outbound queue bound and per-channel backlog warning threshold.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default number of channels before a warning is logged.
pub const DEFAULT_MAX_CHANNELS: usize = 25;

// ============================================================================
// MuxStatus
// ============================================================================

/// Lifecycle state of a multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxStatus {
    /// Event loop running.
    Open,
    /// Transport ended, or shutdown was requested.
    Closed,
    /// Transport failed with the given message.
    Failed(String),
}

impl MuxStatus {
    /// Returns `true` while the event loop is running.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the transport failed.
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ============================================================================
// ChannelState
// ============================================================================

/// State of a channel name on one multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Frames for this name are delivered to its channel.
    Open,
    /// The channel was created and has since closed.
    Closed,
}

// ============================================================================
// MuxOptions
// ============================================================================

/// Multiplexer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxOptions {
    /// Outbound queue bound. A channel whose inbound backlog reaches this
    /// size logs a warning.
    pub channel_capacity: usize,

    /// Soft channel limit. Exceeding it logs a warning and nothing else.
    pub max_channels: usize,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

impl MuxOptions {
    /// Sets the queue bound (minimum 1).
    #[inline]
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Sets the soft channel limit.
    #[inline]
    #[must_use]
    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = max_channels;
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Producer side of one channel's inbound queue.
#[derive(Clone)]
pub(crate) struct Inbound {
    tx: mpsc::UnboundedSender<Value>,
    queued: Arc<AtomicUsize>,
}

impl Inbound {
    /// Queues `data`, returning the backlog including it, or `None` if the
    /// channel is gone.
    fn push(&self, data: Value) -> Option<usize> {
        let backlog = self.queued.fetch_add(1, Ordering::AcqRel) + 1;
        if self.tx.send(data).is_err() {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        Some(backlog)
    }
}

/// Where an incoming frame goes.
enum Route {
    /// Deliver to an open channel.
    Deliver(Inbound),
    /// Known name (closed or ignored), drop quietly.
    Discard,
    /// Never registered on this side.
    Unknown,
}

/// Channel routing table shared between handles and the event loop.
#[derive(Default)]
pub(crate) struct Registry {
    /// Open channels by name.
    routes: FxHashMap<String, Inbound>,
    /// Every name ever created, open or not.
    created: FxHashSet<String>,
    /// Names whose frames are dropped without logging.
    ignored: FxHashSet<String>,
}

impl Registry {
    fn lookup(&self, name: &str) -> Route {
        if let Some(inbound) = self.routes.get(name) {
            Route::Deliver(inbound.clone())
        } else if self.created.contains(name) || self.ignored.contains(name) {
            Route::Discard
        } else {
            Route::Unknown
        }
    }

    pub(crate) fn remove_route(&mut self, name: &str) {
        self.routes.remove(name);
    }
}

// ============================================================================
// Multiplexer
// ============================================================================

/// Internal shared state for a multiplexer.
struct MuxInner {
    /// Human-readable label used in logs.
    label: String,
    /// Queue bounds and limits.
    options: MuxOptions,
    /// Routing table (shared with event loop and channel readers).
    registry: Arc<Mutex<Registry>>,
    /// Queue drained by the event loop onto the transport.
    outgoing: mpsc::Sender<Envelope>,
    /// Published lifecycle state.
    status: watch::Receiver<MuxStatus>,
    /// Shutdown signal for the event loop.
    shutdown: Arc<Notify>,
}

/// Splits one transport into named channels.
///
/// Cheap to clone; all clones drive the same event loop. Dropping the last
/// clone and every channel writer lets the loop close the transport.
#[derive(Clone)]
pub struct Multiplexer {
    inner: Arc<MuxInner>,
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("label", &self.inner.label)
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

impl Multiplexer {
    /// Creates a multiplexer over `transport` with default options.
    ///
    /// Spawns the event loop task; must be called within a tokio runtime.
    pub fn new<T: Transport>(label: impl Into<String>, transport: T) -> Self {
        Self::with_options(label, transport, MuxOptions::default())
    }

    /// Creates a multiplexer over `transport` with custom options.
    pub fn with_options<T: Transport>(
        label: impl Into<String>,
        transport: T,
        options: MuxOptions,
    ) -> Self {
        let label = label.into();
        let options = options.with_channel_capacity(options.channel_capacity);

        let (outgoing, outgoing_rx) = mpsc::channel(options.channel_capacity);
        let (status_tx, status) = watch::channel(MuxStatus::Open);
        let registry = Arc::new(Mutex::new(Registry::default()));
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(Self::run_event_loop(
            label.clone(),
            transport,
            options.channel_capacity,
            outgoing_rx,
            Arc::clone(&registry),
            status_tx,
            Arc::clone(&shutdown),
        ));

        debug!(mux = %label, "Multiplexer started");

        Self {
            inner: Arc::new(MuxInner {
                label,
                options,
                registry,
                outgoing,
                status,
                shutdown,
            }),
        }
    }

    /// Returns the log label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Registers a new channel.
    ///
    /// If the multiplexer has already stopped, the returned channel is
    /// already ended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateChannel`] if `name` was created before on
    /// this multiplexer, even if that channel has since closed.
    pub fn create_channel(&self, name: &str) -> Result<Channel> {
        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));

        let count = {
            let mut registry = self.inner.registry.lock();
            if !registry.created.insert(name.to_string()) {
                return Err(Error::duplicate_channel(name));
            }
            if self.inner.status.borrow().is_open() {
                registry.routes.insert(
                    name.to_string(),
                    Inbound {
                        tx,
                        queued: Arc::clone(&queued),
                    },
                );
            }
            registry.created.len()
        };

        if count > self.inner.options.max_channels {
            warn!(
                mux = %self.inner.label,
                count,
                max = self.inner.options.max_channels,
                "Channel count above configured limit"
            );
        }

        debug!(mux = %self.inner.label, channel = %name, "Channel created");

        Ok(Channel::new(
            name,
            rx,
            queued,
            self.inner.status.clone(),
            Arc::clone(&self.inner.registry),
            self.inner.outgoing.clone(),
        ))
    }

    /// Drops frames for `name` without logging them as unknown.
    pub fn ignore_channel(&self, name: &str) {
        self.inner.registry.lock().ignored.insert(name.to_string());
    }

    /// Returns the state of `name`, or `None` if it was never created.
    #[must_use]
    pub fn channel_state(&self, name: &str) -> Option<ChannelState> {
        let registry = self.inner.registry.lock();
        if registry.routes.contains_key(name) {
            Some(ChannelState::Open)
        } else if registry.created.contains(name) {
            Some(ChannelState::Closed)
        } else {
            None
        }
    }

    /// Returns how many frames for `name` are routed but not yet received,
    /// or `None` if no open channel has that name.
    #[must_use]
    pub fn queued_frames(&self, name: &str) -> Option<usize> {
        self.inner
            .registry
            .lock()
            .routes
            .get(name)
            .map(|inbound| inbound.queued.load(Ordering::Acquire))
    }

    /// Returns the number of open channels.
    #[inline]
    #[must_use]
    pub fn open_channel_count(&self) -> usize {
        self.inner.registry.lock().routes.len()
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> MuxStatus {
        self.inner.status.borrow().clone()
    }

    /// Waits until the event loop stops and returns the final state.
    pub async fn closed(&self) -> MuxStatus {
        let mut status = self.inner.status.clone();
        match status.wait_for(|s| !s.is_open()).await {
            Ok(final_status) => final_status.clone(),
            Err(_) => MuxStatus::Closed,
        }
    }

    /// Writes a frame for `name` directly, bypassing channel ownership.
    ///
    /// Used for bridge-originated notices on channels owned elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the multiplexer has stopped.
    pub async fn notify(&self, name: &str, data: Value) -> Result<()> {
        self.inner
            .outgoing
            .send(Envelope::new(name, data))
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Stops the event loop, closing the transport and every channel.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }
}

// ============================================================================
// Multiplexer - Event Loop
// ============================================================================

impl Multiplexer {
    /// Event loop that drives both halves of the transport.
    async fn run_event_loop<T: Transport>(
        label: String,
        transport: T,
        backlog_warning: usize,
        mut outgoing_rx: mpsc::Receiver<Envelope>,
        registry: Arc<Mutex<Registry>>,
        status_tx: watch::Sender<MuxStatus>,
        shutdown: Arc<Notify>,
    ) {
        let (mut sink, stream) = transport.split();

        let status = tokio::select! {
            result = Self::read_loop(&label, stream, &registry, backlog_warning) => {
                Self::terminal_status(&label, "read", result)
            }

            result = Self::write_loop(&label, &mut sink, &mut outgoing_rx) => {
                Self::terminal_status(&label, "write", result)
            }

            () = shutdown.notified() => {
                debug!(mux = %label, "Shutdown requested");
                MuxStatus::Closed
            }
        };

        if let Err(e) = sink.close().await {
            trace!(mux = %label, error = %e, "Transport close failed");
        }

        // Publish before dropping routes so readers see the final state
        status_tx.send_replace(status);
        registry.lock().routes.clear();
        outgoing_rx.close();

        debug!(mux = %label, "Event loop terminated");
    }

    /// Routes incoming frames until the transport ends.
    async fn read_loop<S>(
        label: &str,
        mut stream: S,
        registry: &Mutex<Registry>,
        backlog_warning: usize,
    ) -> Result<()>
    where
        S: Stream<Item = Result<Value>> + Unpin,
    {
        while let Some(frame) = stream.next().await {
            let envelope = match Envelope::from_frame(frame?) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(mux = %label, error = %e, "Dropping untagged frame");
                    continue;
                }
            };

            let route = registry.lock().lookup(&envelope.name);

            match route {
                Route::Deliver(inbound) => match inbound.push(envelope.data) {
                    Some(backlog) if backlog == backlog_warning => {
                        warn!(
                            mux = %label,
                            channel = %envelope.name,
                            backlog,
                            "Channel consumer falling behind"
                        );
                    }
                    Some(_) => {}
                    None => {
                        trace!(mux = %label, channel = %envelope.name, "Channel closed, frame dropped");
                    }
                },

                Route::Discard => {
                    trace!(mux = %label, channel = %envelope.name, "Frame discarded");
                }

                Route::Unknown => {
                    debug!(mux = %label, channel = %envelope.name, "Frame for unknown channel dropped");
                }
            }
        }

        Ok(())
    }

    /// Sends queued channel writes until every writer is gone.
    async fn write_loop<K>(
        label: &str,
        sink: &mut K,
        outgoing_rx: &mut mpsc::Receiver<Envelope>,
    ) -> Result<()>
    where
        K: Sink<Value, Error = Error> + Unpin,
    {
        while let Some(envelope) = outgoing_rx.recv().await {
            trace!(mux = %label, channel = %envelope.name, "Frame sent");
            sink.send(envelope.into_frame()?).await?;
        }

        Ok(())
    }

    /// Maps a finished loop half to the final status.
    fn terminal_status(label: &str, half: &str, result: Result<()>) -> MuxStatus {
        match result {
            Ok(()) => {
                debug!(mux = %label, half, "Transport ended");
                MuxStatus::Closed
            }
            Err(e) => {
                debug!(mux = %label, half, error = %e, "Transport failed");
                MuxStatus::Failed(e.to_string())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
