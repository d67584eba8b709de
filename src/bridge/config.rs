//! Bridge configuration.
//!
//! Channel names are a protocol surface shared with the in-page script and
//! the extension background, so the defaults match
//! [`channel_names`](crate::protocol::channel_names).
//!
//! # Example
//!
//! ```ignore
//! use page_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::new()
//!     .with_forwarded_channel("experimental")
//!     .with_ignored_channel("legacyConfig")
//!     .with_channel_capacity(128);
//! ```

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use url::Url;

use crate::error::{Error, Result};
use crate::mux::MuxOptions;
use crate::mux::multiplexer::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CHANNELS};
use crate::protocol::channel_names;

// ============================================================================
// Side
// ============================================================================

/// Which multiplexer a sink is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Multiplexer over the in-page transport.
    Page,
    /// Multiplexer over the extension transport.
    Extension,
}

// ============================================================================
// BridgeConfig
// ============================================================================

/// Channel layout and queue tuning for a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Channels relayed 1:1 between page and extension.
    pub forwarded_channels: Vec<String>,

    /// Channel carrying onboarding requests.
    pub onboarding_channel: String,

    /// Multiplexer the onboarding sink reads from.
    pub onboarding_side: Side,

    /// Extension channel carrying phishing notices.
    pub phishing_channel: String,

    /// Extension channels whose frames are dropped silently.
    pub ignored_channels: Vec<String>,

    /// Extension root URL the phishing warning page is resolved against.
    pub extension_root: Option<Url>,

    /// Outbound queue bound and per-channel backlog warning threshold.
    pub channel_capacity: usize,

    /// Soft per-multiplexer channel limit.
    pub max_channels: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            forwarded_channels: channel_names::FORWARDED
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            onboarding_channel: channel_names::ONBOARDING.to_string(),
            onboarding_side: Side::Extension,
            phishing_channel: channel_names::PHISHING.to_string(),
            ignored_channels: Vec::new(),
            extension_root: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeConfig {
    /// Creates the default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the forwarded channel set.
    #[must_use]
    pub fn with_forwarded_channels(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.forwarded_channels = names.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one forwarded channel.
    #[inline]
    #[must_use]
    pub fn with_forwarded_channel(mut self, name: impl Into<String>) -> Self {
        self.forwarded_channels.push(name.into());
        self
    }

    /// Sets the onboarding channel name.
    #[inline]
    #[must_use]
    pub fn with_onboarding_channel(mut self, name: impl Into<String>) -> Self {
        self.onboarding_channel = name.into();
        self
    }

    /// Sets which multiplexer the onboarding sink reads from.
    #[inline]
    #[must_use]
    pub fn with_onboarding_side(mut self, side: Side) -> Self {
        self.onboarding_side = side;
        self
    }

    /// Sets the phishing channel name.
    #[inline]
    #[must_use]
    pub fn with_phishing_channel(mut self, name: impl Into<String>) -> Self {
        self.phishing_channel = name.into();
        self
    }

    /// Adds an extension channel to drop silently.
    #[inline]
    #[must_use]
    pub fn with_ignored_channel(mut self, name: impl Into<String>) -> Self {
        self.ignored_channels.push(name.into());
        self
    }

    /// Sets the extension root used to build the phishing warning URL.
    #[inline]
    #[must_use]
    pub fn with_extension_root(mut self, root: Url) -> Self {
        self.extension_root = Some(root);
        self
    }

    /// Sets the outbound queue bound.
    #[inline]
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the soft channel limit.
    #[inline]
    #[must_use]
    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = max_channels;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeConfig {
    /// Checks the configuration before any multiplexer is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the capacity is zero, a name is empty,
    /// a name is used twice, or the extension root cannot be a base URL.
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::config("channel_capacity must be greater than 0"));
        }

        if let Some(root) = &self.extension_root
            && root.cannot_be_a_base()
        {
            return Err(Error::config(format!(
                "extension root '{root}' cannot be a base URL"
            )));
        }

        let mut seen = FxHashSet::default();
        let names = self
            .forwarded_channels
            .iter()
            .chain([&self.onboarding_channel, &self.phishing_channel]);

        for name in names {
            if name.is_empty() {
                return Err(Error::config("channel names must not be empty"));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!(
                    "channel '{name}' is configured more than once"
                )));
            }
        }

        Ok(())
    }

    /// Returns the multiplexer options derived from this configuration.
    #[inline]
    #[must_use]
    pub fn mux_options(&self) -> MuxOptions {
        MuxOptions::default()
            .with_channel_capacity(self.channel_capacity)
            .with_max_channels(self.max_channels)
    }
}

// ============================================================================
// Tests
// ============================================================================
