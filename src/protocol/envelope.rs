//! Channel frame envelope.
//!
//! Every frame crossing a transport carries the name of the logical channel
//! it belongs to alongside an opaque payload.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// A single multiplexed frame.
///
/// # Format
///
/// ```json
/// {
///   "name": "provider",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel this frame belongs to.
    pub name: String,

    /// Opaque channel payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Unwraps a raw transport frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the frame has no string `name`.
    pub fn from_frame(frame: Value) -> Result<Self> {
        Ok(serde_json::from_value(frame)?)
    }

    /// Wraps this envelope into a raw transport frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn into_frame(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
