//! Channel multiplexer.
//!
//! Splits one [`Transport`](crate::transport::Transport) into many named
//! logical channels and merges their writes back onto it.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!                      │         Multiplexer          │
//!   Transport ◄───────►│  read half ──► route by name │──► Channel "provider"
//!   {name, data}       │  write half ◄── tag by name  │──► Channel "publicConfig"
//!                      │                              │──► Channel ...
//!                      └──────────────────────────────┘
//! ```
//!
//! Each multiplexer owns exactly one event loop task. Both halves of the
//! transport are driven from that task, so a slow channel can stall
//! inbound routing without ever blocking outbound writes.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Channel handles (reader and writer halves) |
//! | `multiplexer` | Multiplexer and its event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Channel handles.
pub mod channel;

/// Multiplexer and event loop.
pub mod multiplexer;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, ChannelReader, ChannelWriter};
pub use multiplexer::{ChannelState, MuxOptions, MuxStatus, Multiplexer};
