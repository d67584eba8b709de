//! Bridge coordinator.
//!
//! Owns both multiplexers and wires everything between them.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | Validated, not yet started coordinator |
//! | [`RunningBridge`] | Live coordinator with its tasks |
//! | [`BridgeBuilder`] | Fluent assembly of transports and collaborators |
//! | [`BridgeConfig`] | Channel names and queue tuning |
//! | [`PageContext`] | The current document's location |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use page_bridge::{Bridge, MemoryTransport, PageContext, Result};
//! # use page_bridge::{PhishingRedirect, PhishingWarning, TabRegistrar, BoxError};
//! # struct Host;
//! # #[async_trait::async_trait]
//! # impl TabRegistrar for Host {
//! #     async fn register_onboarding(&self, _: &str) -> std::result::Result<(), BoxError> { Ok(()) }
//! # }
//! # impl PhishingRedirect for Host { fn redirect(&self, _: PhishingWarning) {} }
//!
//! # async fn example() -> Result<()> {
//! let (page, _page_peer) = MemoryTransport::pair();
//! let (extension, _extension_peer) = MemoryTransport::pair();
//!
//! let bridge = Bridge::builder()
//!     .page_transport(page)
//!     .extension_transport(extension)
//!     .page(PageContext::parse("https://example.com/")?)
//!     .registrar(Arc::new(Host))
//!     .redirect(Arc::new(Host))
//!     .build()?
//!     .start()?;
//!
//! bridge.stop().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for bridge assembly.
pub mod builder;

/// Bridge configuration.
pub mod config;

/// Current document location.
pub mod context;

/// Coordinator implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use config::{BridgeConfig, Side};
pub use context::PageContext;
pub use core::{Bridge, RunningBridge};
