//! One-shot phishing notice sink.
//!
//! The extension sends a notice on the phishing channel when the current
//! page is on its phishing list. The first notice triggers a redirect to the
//! bundled warning page; the channel is then closed so later notices are
//! discarded by the multiplexer.
//!
//! When the sink knows the extension's root URL it builds the warning page
//! URL itself and hands it over in [`PhishingWarning::target`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::bridge::PageContext;
use crate::error::Result;
use crate::mux::Channel;

// ============================================================================
// Constants
// ============================================================================

/// Warning page bundled with the extension, relative to its root URL.
pub const PHISHING_WARNING_PAGE: &str = "phishing.html";

// ============================================================================
// PhishingWarning
// ============================================================================

/// The page being warned about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhishingWarning {
    /// Hostname of the current document.
    pub hostname: String,
    /// Full URL of the current document.
    pub href: String,
    /// Warning page to navigate to, set when the extension root is known.
    pub target: Option<Url>,
}

impl PhishingWarning {
    /// Captures the current document.
    #[must_use]
    pub fn from_page(page: &PageContext) -> Self {
        Self {
            hostname: page.hostname().to_string(),
            href: page.href().to_string(),
            target: None,
        }
    }

    /// Builds the warning page URL under `extension_root`.
    ///
    /// Format: `<root>/phishing.html?hostname=<hostname>&href=<href>`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] if `extension_root` cannot be a
    /// base URL.
    pub fn redirect_target(&self, extension_root: &Url) -> Result<Url> {
        let mut target = extension_root.join(PHISHING_WARNING_PAGE)?;
        target.set_query(Some(&format!(
            "hostname={}&href={}",
            urlencoding::encode(&self.hostname),
            urlencoding::encode(&self.href)
        )));
        Ok(target)
    }
}

// ============================================================================
// PhishingRedirect
// ============================================================================

/// Navigates the current document to the warning page.
///
/// Called at most once per bridge. Implementations should start the
/// navigation and return; the bridge does not wait for it. Without a
/// [`PhishingWarning::target`], build one with
/// [`PhishingWarning::redirect_target`].
pub trait PhishingRedirect: Send + Sync {
    /// Starts the redirect for `warning`.
    fn redirect(&self, warning: PhishingWarning);
}

// ============================================================================
// PhishingSink
// ============================================================================

/// Fires one redirect on the first phishing notice.
#[derive(Clone)]
pub struct PhishingSink {
    handler: Arc<dyn PhishingRedirect>,
    warning: PhishingWarning,
    extension_root: Option<Url>,
}

impl fmt::Debug for PhishingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhishingSink")
            .field("warning", &self.warning)
            .field("extension_root", &self.extension_root)
            .finish_non_exhaustive()
    }
}

impl PhishingSink {
    /// Creates a sink for the page described by `warning`.
    #[must_use]
    pub fn new(handler: Arc<dyn PhishingRedirect>, warning: PhishingWarning) -> Self {
        Self {
            handler,
            warning,
            extension_root: None,
        }
    }

    /// Builds the warning page URL under `root` before redirecting.
    #[inline]
    #[must_use]
    pub fn with_extension_root(mut self, root: Url) -> Self {
        self.extension_root = Some(root);
        self
    }

    /// Waits for the first notice, redirects, and detaches.
    ///
    /// Returns `true` if the redirect fired, `false` if the channel ended
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the channel's transport failed
    /// before any notice arrived.
    pub async fn run(self, mut channel: Channel) -> Result<bool> {
        let notice = channel.recv().await?;
        channel.close();

        if notice.is_none() {
            debug!("Phishing channel ended without a notice");
            return Ok(false);
        }

        let mut warning = self.warning;
        if let Some(root) = &self.extension_root {
            match warning.redirect_target(root) {
                Ok(target) => warning.target = Some(target),
                Err(e) => warn!(error = %e, "Could not build warning page URL"),
            }
        }

        info!(hostname = %warning.hostname, "Phishing notice received, redirecting");
        self.handler.redirect(warning);
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================
