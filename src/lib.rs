//! Page bridge - channel multiplexing between an in-page script and an
//! extension background.
//!
//! This library connects two duplex frame streams and routes named logical
//! channels between them, intercepting a few channels for local handling.
//!
//! # Architecture
//!
//! ```text
//!   page transport ──► Multiplexer ──► ChannelForwarder ──► Multiplexer ──► extension transport
//!                                       (provider, publicConfig, capabilities)
//!                                                             │
//!                                                 OnboardingSink, PhishingSink
//! ```
//!
//! Key design principles:
//!
//! - Every frame is a `{name, data}` envelope; the name selects the channel
//! - Each multiplexer owns one transport and one event loop task
//! - A failing channel never takes down its multiplexer or another pairing
//! - A stalled channel never holds up the others on its transport
//! - Bounded outbound queues pause a forwarder when its destination is full
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_bridge::{Bridge, MemoryTransport, PageContext, Result};
//! # use page_bridge::{BoxError, PhishingRedirect, PhishingWarning, TabRegistrar};
//! # struct Host;
//! # #[async_trait::async_trait]
//! # impl TabRegistrar for Host {
//! #     async fn register_onboarding(&self, _: &str) -> std::result::Result<(), BoxError> { Ok(()) }
//! # }
//! # impl PhishingRedirect for Host { fn redirect(&self, _: PhishingWarning) {} }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (page, _page_peer) = MemoryTransport::pair();
//!     let (extension, _extension_peer) = MemoryTransport::pair();
//!
//!     let bridge = Bridge::builder()
//!         .page_transport(page)
//!         .extension_transport(extension)
//!         .page(PageContext::parse("https://example.com/")?)
//!         .registrar(Arc::new(Host))
//!         .redirect(Arc::new(Host))
//!         .build()?
//!         .start()?;
//!
//!     bridge.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`activation`] | Whether to run for a document, and the launch sequence |
//! | [`bridge`] | Coordinator: [`Bridge`], [`BridgeBuilder`], [`BridgeConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`forwarder`] | Cross-multiplexer channel pairing |
//! | [`mux`] | [`Multiplexer`] and its [`Channel`]s |
//! | [`protocol`] | Envelope and message types |
//! | [`sinks`] | Onboarding and phishing side channels |
//! | [`transport`] | Frame transports |

// ============================================================================
// Modules
// ============================================================================

/// Activation gate and launch sequence.
pub mod activation;

/// Bridge coordinator.
///
/// Use [`Bridge::builder()`] to assemble a bridge.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Channel forwarding between multiplexers.
pub mod forwarder;

/// Channel multiplexer.
pub mod mux;

/// Envelope and message types.
pub mod protocol;

/// Side-channel sinks.
pub mod sinks;

/// Frame transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Activation
pub use activation::{DocumentInfo, ScriptInjector, launch, should_activate};

// Bridge types
pub use bridge::{Bridge, BridgeBuilder, BridgeConfig, PageContext, RunningBridge, Side};

// Error types
pub use error::{BoxError, Error, Result};

// Forwarding
pub use forwarder::ChannelForwarder;

// Multiplexer types
pub use mux::{
    Channel, ChannelReader, ChannelState, ChannelWriter, Multiplexer, MuxOptions, MuxStatus,
};

// Sinks
pub use sinks::{OnboardingSink, PhishingRedirect, PhishingSink, PhishingWarning, TabRegistrar};

// Transports
pub use transport::{BoxTransport, MemoryTransport, Transport, WebSocketTransport};
