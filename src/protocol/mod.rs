//! Wire protocol types.
//!
//! This module defines the frame format shared by both multiplexers and
//! the application messages interpreted by the side-channel sinks.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Envelope`] | Both | One channel frame: `{ "name", "data" }` |
//! | [`OnboardingMessage`] | Extension → Bridge | Onboarding registration request |
//! | [`StreamFailureNotice`] | Bridge → Page | Extension side went away |
//!
//! # Channel Names
//!
//! Channel names are the multiplex keys and must match verbatim on both
//! ends. See [`channel_names`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel_names` | Stable channel identifiers |
//! | `envelope` | Frame envelope |
//! | `message` | Side-channel application messages |

// ============================================================================
// Submodules
// ============================================================================

/// Stable channel identifiers.
pub mod channel_names;

/// Channel frame envelope.
pub mod envelope;

/// Side-channel application messages.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use message::{OnboardingMessage, REGISTER_ONBOARDING, StreamFailureNotice};
