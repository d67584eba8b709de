//! Builder pattern for bridge assembly.
//!
//! Transports and collaborators are injected rather than created by the
//! bridge, so hosts (and tests) decide what backs each side.
//!
//! # Example
//!
//! ```ignore
//! let bridge = Bridge::builder()
//!     .page_transport(page)
//!     .extension_transport(extension)
//!     .page(PageContext::parse("https://example.com/")?)
//!     .registrar(Arc::new(registrar))
//!     .redirect(Arc::new(redirect))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::sinks::{PhishingRedirect, TabRegistrar};
use crate::transport::{BoxTransport, Transport};

use super::config::BridgeConfig;
use super::context::PageContext;
use super::core::Bridge;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`].
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default)]
pub struct BridgeBuilder {
    /// Transport to the in-page script.
    page_transport: Option<BoxTransport>,
    /// Transport to the extension background.
    extension_transport: Option<BoxTransport>,
    /// Current document location.
    page: Option<PageContext>,
    /// Onboarding registration collaborator.
    registrar: Option<Arc<dyn TabRegistrar>>,
    /// Phishing redirect collaborator.
    redirect: Option<Arc<dyn PhishingRedirect>>,
    /// Channel layout.
    config: BridgeConfig,
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("page_transport", &self.page_transport.is_some())
            .field("extension_transport", &self.extension_transport.is_some())
            .field("page", &self.page)
            .field("registrar", &self.registrar.is_some())
            .field("redirect", &self.redirect.is_some())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates an empty builder with the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport to the in-page script.
    #[inline]
    #[must_use]
    pub fn page_transport<T: Transport>(mut self, transport: T) -> Self {
        self.page_transport = Some(Box::new(transport) as BoxTransport);
        self
    }

    /// Sets the transport to the extension background.
    #[inline]
    #[must_use]
    pub fn extension_transport<T: Transport>(mut self, transport: T) -> Self {
        self.extension_transport = Some(Box::new(transport) as BoxTransport);
        self
    }

    /// Sets the current document location.
    #[inline]
    #[must_use]
    pub fn page(mut self, page: PageContext) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the onboarding registration collaborator.
    #[inline]
    #[must_use]
    pub fn registrar<R: TabRegistrar + 'static>(mut self, registrar: Arc<R>) -> Self {
        self.registrar = Some(registrar as Arc<dyn TabRegistrar>);
        self
    }

    /// Sets the phishing redirect collaborator.
    #[inline]
    #[must_use]
    pub fn redirect<H: PhishingRedirect + 'static>(mut self, redirect: Arc<H>) -> Self {
        self.redirect = Some(redirect as Arc<dyn PhishingRedirect>);
        self
    }

    /// Replaces the configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates and assembles the bridge without starting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a transport, the page context or a
    /// collaborator is missing, or if the configuration is invalid.
    pub fn build(self) -> Result<Bridge> {
        self.config.validate()?;

        let page_transport = self.page_transport.ok_or_else(|| {
            Error::config("Page transport is required. Use .page_transport() to set it.")
        })?;
        let extension_transport = self.extension_transport.ok_or_else(|| {
            Error::config("Extension transport is required. Use .extension_transport() to set it.")
        })?;
        let page = self
            .page
            .ok_or_else(|| Error::config("Page context is required. Use .page() to set it."))?;
        let registrar = self.registrar.ok_or_else(|| {
            Error::config("Tab registrar is required. Use .registrar() to set it.")
        })?;
        let redirect = self.redirect.ok_or_else(|| {
            Error::config("Phishing redirect is required. Use .redirect() to set it.")
        })?;

        Ok(Bridge::new(
            page_transport,
            extension_transport,
            page,
            registrar,
            redirect,
            self.config,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
