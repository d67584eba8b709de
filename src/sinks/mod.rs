//! Side-channel sinks.
//!
//! Some channels are not relayed 1:1. Their payloads are consumed by the
//! bridge itself:
//!
//! | Sink | Channel | Behavior |
//! |------|---------|----------|
//! | [`OnboardingSink`] | `onboarding` | Registers the current tab, one message at a time |
//! | [`PhishingSink`] | `phishing` | Redirects to the warning page on the first message, then detaches |

// ============================================================================
// Submodules
// ============================================================================

/// Onboarding registration sink.
pub mod onboarding;

/// One-shot phishing notice sink.
pub mod phishing;

// ============================================================================
// Re-exports
// ============================================================================

pub use onboarding::{OnboardingSink, TabRegistrar};
pub use phishing::{PHISHING_WARNING_PAGE, PhishingRedirect, PhishingSink, PhishingWarning};
