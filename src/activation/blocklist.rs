//! Domains the bridge never runs on.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Deny-list entries.
///
/// An entry is a host, optionally followed by a path. A URL is blocked when
/// its host equals the entry's host or is a subdomain of it, and, if the
/// entry has a path, the URL path starts with that path.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "uscourts.gov",
    "dropbox.com",
    "webbyawards.com",
    "cdn.shopify.com/s/javascripts/tricorder/xtld-read-only-frame.html",
    "adyen.com",
    "gravityforms.com",
    "harbourair.com",
    "ani.gamer.com.tw",
    "blueskybooking.com",
    "sharefile.com",
];

// ============================================================================
// Matching
// ============================================================================

/// Returns `true` if `url` falls inside any deny-list entry.
#[must_use]
pub fn is_blocked_domain(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    BLOCKED_DOMAINS
        .iter()
        .any(|entry| entry_matches(entry, &host, url.path()))
}

/// Matches one entry against a lowercase host and a path.
fn entry_matches(entry: &str, host: &str, path: &str) -> bool {
    let (domain, entry_path) = match entry.find('/') {
        Some(index) => entry.split_at(index),
        None => (entry, ""),
    };

    let inside = host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'));

    inside && path.starts_with(entry_path)
}

// ============================================================================
// Tests
// ============================================================================
