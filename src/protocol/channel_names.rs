//! Stable channel identifiers.
//!
//! These strings are the multiplex keys exchanged on the wire. Both the
//! in-page script and the extension background address channels by these
//! exact names, so they form a protocol surface and must not change.

/// General-purpose provider traffic (forwarded).
pub const PROVIDER: &str = "provider";

/// Public configuration updates (forwarded).
pub const PUBLIC_CONFIG: &str = "publicConfig";

/// Capability negotiation (forwarded).
pub const CAPABILITIES: &str = "capabilities";

/// Onboarding registration requests (interpreted by the onboarding sink).
pub const ONBOARDING: &str = "onboarding";

/// Phishing notices (interpreted by the phishing sink, one-shot).
pub const PHISHING: &str = "phishing";

/// Channels relayed 1:1 between the page and the extension by default.
pub const FORWARDED: [&str; 3] = [PROVIDER, PUBLIC_CONFIG, CAPABILITIES];

// ============================================================================
// Tests
// ============================================================================
