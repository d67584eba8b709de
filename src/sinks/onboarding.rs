//! Onboarding registration sink.
//!
//! Consumes the onboarding channel sequentially. Each message is handled to
//! completion, including the registration call, before the next is read.
//! A rejected message is reported to the caller and the channel keeps
//! running.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{BoxError, Error, Result};
use crate::mux::Channel;
use crate::protocol::{OnboardingMessage, REGISTER_ONBOARDING};

// ============================================================================
// TabRegistrar
// ============================================================================

/// Registers the current tab with the extension background.
///
/// Implemented by the host. The call may fail; failures are surfaced as
/// [`Error::Delivery`] and are not retried.
#[async_trait]
pub trait TabRegistrar: Send + Sync {
    /// Registers the tab showing `location` as the onboarding initiator.
    async fn register_onboarding(&self, location: &str) -> std::result::Result<(), BoxError>;
}

// ============================================================================
// OnboardingSink
// ============================================================================

/// Interprets onboarding requests from one channel.
#[derive(Clone)]
pub struct OnboardingSink {
    registrar: Arc<dyn TabRegistrar>,
    location: String,
}

impl fmt::Debug for OnboardingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingSink")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl OnboardingSink {
    /// Creates a sink registering `location` (the current document URL).
    #[must_use]
    pub fn new(registrar: Arc<dyn TabRegistrar>, location: impl Into<String>) -> Self {
        Self {
            registrar,
            location: location.into(),
        }
    }

    /// Handles a single onboarding message.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedMessage`] if the message is null or empty
    /// - [`Error::UnrecognizedMessageType`] for any `type` other than
    ///   `registerOnboarding`
    /// - [`Error::Delivery`] if the registration call failed
    pub async fn handle(&self, message: &Value) -> Result<()> {
        match OnboardingMessage::parse(message)? {
            OnboardingMessage::RegisterOnboarding => {
                debug!(location = %self.location, "Registering onboarding tab");

                self.registrar
                    .register_onboarding(&self.location)
                    .await
                    .map_err(|e| Error::delivery(REGISTER_ONBOARDING, e))?;

                trace!("Onboarding registration acknowledged");
                Ok(())
            }
        }
    }

    /// Consumes `channel` until it ends.
    ///
    /// `on_message` receives each message's outcome in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the channel's transport failed.
    pub async fn run<F>(self, mut channel: Channel, mut on_message: F) -> Result<()>
    where
        F: FnMut(Result<()>) + Send,
    {
        while let Some(message) = channel.recv().await? {
            let outcome = self.handle(&message).await;
            on_message(outcome);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
