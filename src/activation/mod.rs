//! Activation gate.
//!
//! Decides, once per document load, whether the bridge runs at all.
//!
//! # Checks
//!
//! All must hold for [`should_activate`] to return `true`:
//!
//! | Check | Rejects |
//! |-------|---------|
//! | Doctype | Declared doctype other than exactly `html` |
//! | Top-level element | Root tag other than `html` (any case) |
//! | Path suffix | Paths ending in `.xml` or `.pdf` |
//! | Deny-list | Hosts inside [`BLOCKED_DOMAINS`] |
//!
//! [`launch`] runs the full start-up sequence behind the gate.

// ============================================================================
// Submodules
// ============================================================================

/// Fixed deny-list of domains.
pub mod blocklist;

/// Document checks.
pub mod gate;

/// Gate, inject, wait, start.
pub mod launch;

// ============================================================================
// Re-exports
// ============================================================================

pub use blocklist::{BLOCKED_DOMAINS, is_blocked_domain};
pub use gate::{DocumentInfo, should_activate};
pub use launch::{ScriptInjector, launch};
