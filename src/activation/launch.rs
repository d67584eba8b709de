//! Start-up sequence behind the activation gate.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use tracing::{debug, error, info};

use crate::bridge::{BridgeBuilder, PageContext, RunningBridge};
use crate::error::{BoxError, Result};

use super::gate::{DocumentInfo, should_activate};

// ============================================================================
// ScriptInjector
// ============================================================================

/// Places the in-page script bundle into the document.
pub trait ScriptInjector: Send + Sync {
    /// Injects `bundle`.
    fn inject(&self, bundle: &str) -> std::result::Result<(), BoxError>;
}

// ============================================================================
// launch
// ============================================================================

/// Runs the gate, injects `bundle`, waits for `ready`, then starts the bridge.
///
/// Returns `Ok(None)` without touching the injector when the gate rejects
/// the document. Injection failure is logged and does not stop the bridge.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if `builder` is incomplete or its
/// configuration is invalid.
pub async fn launch<R>(
    document: &DocumentInfo,
    page: PageContext,
    injector: &dyn ScriptInjector,
    bundle: &str,
    ready: R,
    builder: BridgeBuilder,
) -> Result<Option<RunningBridge>>
where
    R: Future<Output = ()>,
{
    if !should_activate(document, page.url()) {
        debug!(url = %page.href(), "Bridge not activated for document");
        return Ok(None);
    }

    if let Err(e) = injector.inject(bundle) {
        error!(error = %e, "Script injection failed");
    }

    ready.await;

    let bridge = builder.page(page).build()?.start()?;
    info!("Bridge launched");
    Ok(Some(bridge))
}

// ============================================================================
// Tests
// ============================================================================
