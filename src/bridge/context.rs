//! Current document location.

use url::Url;

use crate::error::Result;

// ============================================================================
// PageContext
// ============================================================================

/// Location of the document the bridge runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    url: Url,
}

impl PageContext {
    /// Creates a context for `url`.
    #[inline]
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Parses `href` into a context.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] if `href` is not a valid URL.
    pub fn parse(href: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(href)?))
    }

    /// Returns the parsed URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the full URL.
    #[inline]
    #[must_use]
    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the hostname, or an empty string for host-less URLs.
    #[inline]
    #[must_use]
    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
