//! Frame transport layer.
//!
//! A [`Transport`] is one duplex connection to a peer: the in-page script on
//! one side, the extension background on the other. The bridge never opens
//! transports itself. The host hands them in already established and the
//! multiplexers borrow them for the bridge's lifetime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   Transport    ┌──────────────┐   Transport    ┌──────────────┐
//! │  In-page     │◄──────────────►│    Bridge    │◄──────────────►│  Extension   │
//! │  script      │  {name, data}  │  (2 muxes)   │  {name, data}  │  background  │
//! └──────────────┘                └──────────────┘                └──────────────┘
//! ```
//!
//! Any `Stream<Item = Result<Value>> + Sink<Value>` is a transport, so hosts
//! can adapt whatever message port they have.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | In-process transport pair |
//! | `websocket` | Adapter over a WebSocket stream |

// ============================================================================
// Imports
// ============================================================================

use futures_util::{Sink, Stream};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport pair.
pub mod memory;

/// WebSocket transport adapter.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemoryTransport;
pub use websocket::WebSocketTransport;

// ============================================================================
// Transport
// ============================================================================

/// An ordered duplex stream of discrete JSON frames.
///
/// Ending the stream (`None`) means the peer disconnected. Yielding an error
/// means the transport failed. Either is terminal for the multiplexer
/// reading it.
pub trait Transport:
    Stream<Item = Result<Value>> + Sink<Value, Error = Error> + Send + Unpin + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<Value>> + Sink<Value, Error = Error> + Send + Unpin + 'static
{
}

/// Type-erased transport, as stored by the bridge builder.
pub type BoxTransport = Box<dyn Transport>;
