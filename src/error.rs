//! Error types for the page bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use page_bridge::{Result, Multiplexer};
//!
//! fn open(mux: &Multiplexer) -> Result<()> {
//!     let channel = mux.create_channel("provider")?;
//!     drop(channel);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Setup | [`Error::Config`], [`Error::DuplicateChannel`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::Transport`] |
//! | Messages | [`Error::MalformedMessage`], [`Error::UnrecognizedMessageType`] |
//! | Delivery | [`Error::Delivery`] |
//! | External | [`Error::InvalidUrl`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error produced by external collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the bridge is assembled with missing or invalid parts.
    /// Fatal at startup: no partially started bridge is left behind.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Channel name registered twice on the same multiplexer.
    #[error("Duplicate channel: {name}")]
    DuplicateChannel {
        /// The reused channel name.
        name: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport or channel closed.
    ///
    /// Returned when writing to a channel whose multiplexer has stopped.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport failure.
    ///
    /// Returned when the underlying frame stream reports an error.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Message Errors
    // ========================================================================
    /// Message was null or empty.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// Why the message was rejected.
        reason: String,
    },

    /// Message carried a `type` this sink does not handle.
    #[error("Unrecognized message type: {message_type}")]
    UnrecognizedMessageType {
        /// The offending `type` value (empty when absent).
        message_type: String,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// An external collaborator failed to deliver a request.
    #[error("Delivery failed: {message}")]
    Delivery {
        /// What was being delivered.
        message: String,
        /// Underlying cause reported by the collaborator.
        #[source]
        source: BoxError,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a duplicate channel error.
    #[inline]
    pub fn duplicate_channel(name: impl Into<String>) -> Self {
        Self::DuplicateChannel { name: name.into() }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed message error.
    #[inline]
    pub fn malformed_message(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates an unrecognized message type error.
    #[inline]
    pub fn unrecognized_message_type(message_type: impl Into<String>) -> Self {
        Self::UnrecognizedMessageType {
            message_type: message_type.into(),
        }
    }

    /// Creates a delivery error wrapping the collaborator's cause.
    #[inline]
    pub fn delivery(message: impl Into<String>, source: BoxError) -> Self {
        Self::Delivery {
            message: message.into(),
            source,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error aborts bridge startup.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::DuplicateChannel { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Transport { .. } | Self::WebSocket(_)
        )
    }

    /// Returns `true` if a single application message was rejected.
    ///
    /// Message errors never terminate the owning channel.
    #[inline]
    #[must_use]
    pub fn is_message_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage { .. } | Self::UnrecognizedMessageType { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
