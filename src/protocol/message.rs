//! Side-channel application messages.
//!
//! Unlike forwarded channels, the onboarding channel carries messages the
//! bridge interprets itself. The bridge also originates one message of its
//! own: a notice telling the page the extension side has gone away.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// The only onboarding `type` the bridge acts on.
pub const REGISTER_ONBOARDING: &str = "registerOnboarding";

/// JSON-RPC method announcing that the extension stream failed.
pub const STREAM_FAILURE_METHOD: &str = "STREAM_FAILURE";

// ============================================================================
// OnboardingMessage
// ============================================================================

/// A parsed onboarding request.
///
/// # Format
///
/// ```json
/// { "type": "registerOnboarding" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingMessage {
    /// Register the current tab as the onboarding initiator.
    RegisterOnboarding,
}

impl OnboardingMessage {
    /// Parses a raw channel payload.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedMessage`] if the payload is null or empty
    /// - [`Error::UnrecognizedMessageType`] for any other `type`
    pub fn parse(value: &Value) -> Result<Self> {
        if is_empty(value) {
            return Err(Error::malformed_message("onboarding message is empty"));
        }

        let message_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match message_type {
            REGISTER_ONBOARDING => Ok(Self::RegisterOnboarding),
            other => Err(Error::unrecognized_message_type(other)),
        }
    }
}

/// Returns `true` for payloads that carry nothing at all.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ============================================================================
// StreamFailureNotice
// ============================================================================

/// Notice written to the page when the extension multiplexer stops.
///
/// # Format
///
/// ```json
/// { "jsonrpc": "2.0", "method": "STREAM_FAILURE" }
/// ```
#[derive(Debug, Clone)]
pub struct StreamFailureNotice {
    jsonrpc: &'static str,
    method: &'static str,
}

impl StreamFailureNotice {
    /// Creates the notice.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            jsonrpc: "2.0",
            method: STREAM_FAILURE_METHOD,
        }
    }

    /// Returns the notice as a channel payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "jsonrpc": self.jsonrpc, "method": self.method })
    }
}

impl Default for StreamFailureNotice {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_register_onboarding() {
        let parsed = OnboardingMessage::parse(&json!({"type": "registerOnboarding"}));
        assert_eq!(parsed.expect("parse"), OnboardingMessage::RegisterOnboarding);
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let parsed =
            OnboardingMessage::parse(&json!({"type": "registerOnboarding", "origin": "x"}));
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_parse_null_is_malformed() {
        let err = OnboardingMessage::parse(&Value::Null).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));

        let err = OnboardingMessage::parse(&json!({})).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_parse_other_type_is_unrecognized() {
        let err = OnboardingMessage::parse(&json!({"type": "other"})).unwrap_err();
        match err {
            Error::UnrecognizedMessageType { message_type } => assert_eq!(message_type, "other"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_missing_type_is_unrecognized() {
        let err = OnboardingMessage::parse(&json!({"kind": "x"})).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedMessageType { .. }));
    }

    #[test]
    fn test_stream_failure_notice() {
        let value = StreamFailureNotice::new().to_value();
        assert_eq!(value, json!({"jsonrpc": "2.0", "method": "STREAM_FAILURE"}));
    }
}
