//! Coordinator implementation.
//!
//! # Startup Order
//!
//! [`Bridge::start`] performs, in order:
//!
//! 1. Page multiplexer over the page transport
//! 2. Extension multiplexer over the extension transport
//! 3. Onboarding sink
//! 4. One forwarder pairing per forwarded channel
//! 5. Phishing sink
//!
//! Any failure aborts startup: already spawned tasks are aborted and both
//! multiplexers are shut down.
//!
//! # Failure Policy
//!
//! Terminal errors from a pairing or the onboarding sink are logged as
//! disconnect warnings with a label naming the part that failed. They
//! never stop anything else.
//!
//! # Teardown
//!
//! [`RunningBridge::stop`] raises the stop signal and shuts down both
//! multiplexers. Pairings and the phishing sink end with their channels.
//! The onboarding sink also watches the stop signal, so a registration
//! that never completes is abandoned instead of holding up `stop`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::forwarder::ChannelForwarder;
use crate::mux::{MuxStatus, Multiplexer};
use crate::protocol::{StreamFailureNotice, channel_names};
use crate::sinks::{OnboardingSink, PhishingRedirect, PhishingSink, PhishingWarning, TabRegistrar};
use crate::transport::BoxTransport;

use super::config::{BridgeConfig, Side};
use super::context::PageContext;

// ============================================================================
// Constants
// ============================================================================

/// Log label of the page-side multiplexer.
pub const PAGE_MUX_LABEL: &str = "page multiplex";

/// Log label of the extension-side multiplexer.
pub const EXTENSION_MUX_LABEL: &str = "extension multiplex";

/// Log label of the onboarding sink.
pub const ONBOARDING_LABEL: &str = "onboarding sink";

/// Log label of the phishing sink.
pub const PHISHING_LABEL: &str = "phishing sink";

// ============================================================================
// Bridge
// ============================================================================

/// A validated bridge that has not started yet.
///
/// Created by [`BridgeBuilder::build`](super::BridgeBuilder::build).
pub struct Bridge {
    page_transport: BoxTransport,
    extension_transport: BoxTransport,
    page: PageContext,
    registrar: Arc<dyn TabRegistrar>,
    redirect: Arc<dyn PhishingRedirect>,
    config: BridgeConfig,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("page", &self.page)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Creates a new bridge builder.
    #[inline]
    #[must_use]
    pub fn builder() -> super::BridgeBuilder {
        super::BridgeBuilder::new()
    }

    /// Assembles a bridge from validated parts.
    pub(crate) fn new(
        page_transport: BoxTransport,
        extension_transport: BoxTransport,
        page: PageContext,
        registrar: Arc<dyn TabRegistrar>,
        redirect: Arc<dyn PhishingRedirect>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            page_transport,
            extension_transport,
            page,
            registrar,
            redirect,
            config,
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Starts both multiplexers and everything wired between them.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateChannel`] or [`Error::Config`] if the
    /// channel layout cannot be registered. Nothing keeps running on error.
    pub fn start(self) -> Result<RunningBridge> {
        let options = self.config.mux_options();

        let page_mux = Multiplexer::with_options(PAGE_MUX_LABEL, self.page_transport, options);
        let extension_mux =
            Multiplexer::with_options(EXTENSION_MUX_LABEL, self.extension_transport, options);

        for name in &self.config.ignored_channels {
            extension_mux.ignore_channel(name);
        }

        let (stopping, _) = watch::channel(false);
        let mut tasks = Vec::new();

        let wired = Self::wire(
            &page_mux,
            &extension_mux,
            &self.page,
            self.registrar,
            self.redirect,
            &self.config,
            &stopping,
            &mut tasks,
        );

        if let Err(e) = wired {
            warn!(error = %e, "Bridge startup failed");
            for task in &tasks {
                task.abort();
            }
            page_mux.shutdown();
            extension_mux.shutdown();
            return Err(e);
        }

        tasks.push(tokio::spawn(Self::monitor_page(page_mux.clone())));
        tasks.push(tokio::spawn(Self::monitor_extension(
            extension_mux.clone(),
            page_mux.clone(),
            self.config
                .forwarded_channels
                .iter()
                .any(|name| name == channel_names::PROVIDER),
            stopping.subscribe(),
        )));

        info!(
            page = %self.page.hostname(),
            forwarded = self.config.forwarded_channels.len(),
            "Bridge started"
        );

        Ok(RunningBridge {
            page_mux,
            extension_mux,
            tasks,
            stopping,
        })
    }

    /// Binds sinks and forwarders, collecting their tasks.
    fn wire(
        page_mux: &Multiplexer,
        extension_mux: &Multiplexer,
        page: &PageContext,
        registrar: Arc<dyn TabRegistrar>,
        redirect: Arc<dyn PhishingRedirect>,
        config: &BridgeConfig,
        stopping: &watch::Sender<bool>,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> Result<()> {
        // Onboarding sink
        let onboarding_mux = match config.onboarding_side {
            Side::Page => page_mux,
            Side::Extension => extension_mux,
        };
        let onboarding = onboarding_mux.create_channel(&config.onboarding_channel)?;
        let sink = OnboardingSink::new(registrar, page.href());
        let stop_signal = stopping.subscribe();
        tasks.push(tokio::spawn(async move {
            let run = sink.run(onboarding, |outcome| {
                if let Err(e) = outcome {
                    warn!(label = ONBOARDING_LABEL, error = %e, "Onboarding message rejected");
                }
            });

            tokio::select! {
                outcome = run => {
                    if let Err(e) = outcome {
                        log_disconnect_warning(ONBOARDING_LABEL, &e);
                    }
                }

                () = stop_requested(stop_signal) => {
                    debug!(label = ONBOARDING_LABEL, "Abandoned on stop");
                }
            }
        }));

        // Forwarded channels
        for name in &config.forwarded_channels {
            let label = format!("{name} forwarder");
            let handle = ChannelForwarder::connect(name, page_mux, extension_mux, move |outcome| {
                match outcome {
                    Ok(()) => debug!(label = %label, "Pairing closed"),
                    Err(e) => log_disconnect_warning(&label, &e),
                }
            })?;
            tasks.push(handle);
        }

        // Phishing sink
        let phishing = extension_mux.create_channel(&config.phishing_channel)?;
        let mut sink = PhishingSink::new(redirect, PhishingWarning::from_page(page));
        if let Some(root) = &config.extension_root {
            sink = sink.with_extension_root(root.clone());
        }
        tasks.push(tokio::spawn(async move {
            if let Err(e) = sink.run(phishing).await {
                debug!(label = PHISHING_LABEL, error = %e, "Phishing channel ended");
            }
        }));

        Ok(())
    }

    /// Logs the page multiplexer's end.
    async fn monitor_page(page_mux: Multiplexer) {
        match page_mux.closed().await {
            MuxStatus::Failed(message) => {
                log_disconnect_warning(PAGE_MUX_LABEL, &Error::transport(message));
            }
            status => debug!(label = PAGE_MUX_LABEL, ?status, "Multiplexer ended"),
        }
    }

    /// Logs the extension multiplexer's end and tells the page about it.
    async fn monitor_extension(
        extension_mux: Multiplexer,
        page_mux: Multiplexer,
        notify_provider: bool,
        stopping: watch::Receiver<bool>,
    ) {
        match extension_mux.closed().await {
            MuxStatus::Failed(message) => {
                log_disconnect_warning(EXTENSION_MUX_LABEL, &Error::transport(message));
            }
            status => debug!(label = EXTENSION_MUX_LABEL, ?status, "Multiplexer ended"),
        }

        if *stopping.borrow() || !notify_provider {
            return;
        }

        let notice = StreamFailureNotice::new().to_value();
        if let Err(e) = page_mux.notify(channel_names::PROVIDER, notice).await {
            debug!(error = %e, "Could not deliver stream failure notice");
        }
    }
}

// ============================================================================
// RunningBridge
// ============================================================================

/// A started bridge.
///
/// Dropping it leaves the tasks running until the transports end; call
/// [`RunningBridge::stop`] to tear down explicitly.
pub struct RunningBridge {
    page_mux: Multiplexer,
    extension_mux: Multiplexer,
    tasks: Vec<JoinHandle<()>>,
    stopping: watch::Sender<bool>,
}

impl fmt::Debug for RunningBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningBridge")
            .field("page_mux", &self.page_mux)
            .field("extension_mux", &self.extension_mux)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl RunningBridge {
    /// Returns the page-side multiplexer.
    #[inline]
    #[must_use]
    pub fn page_mux(&self) -> &Multiplexer {
        &self.page_mux
    }

    /// Returns the extension-side multiplexer.
    #[inline]
    #[must_use]
    pub fn extension_mux(&self) -> &Multiplexer {
        &self.extension_mux
    }

    /// Shuts down both multiplexers and waits for every task to finish.
    ///
    /// Returns even if a tab registration is still pending.
    pub async fn stop(self) {
        info!("Bridge stopping");

        self.stopping.send_replace(true);
        self.page_mux.shutdown();
        self.extension_mux.shutdown();

        for task in self.tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Bridge task ended abnormally");
            }
        }

        info!("Bridge stopped");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves once `stop` is called. Never resolves if the bridge handle was
/// dropped without stopping.
async fn stop_requested(mut signal: watch::Receiver<bool>) {
    if signal.wait_for(|stopping| *stopping).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Logs the monitoring signal for a lost stream.
fn log_disconnect_warning(label: &str, error: &Error) {
    warn!(label = %label, error = %error, "Lost connection to {label}");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use url::Url;

    use crate::error::BoxError;
    use crate::transport::MemoryTransport;

    const PAGE_URL: &str = "https://app.example.com/start";

    #[derive(Default)]
    struct Host {
        registrations: Mutex<Vec<String>>,
        redirects: Mutex<Vec<PhishingWarning>>,
        /// Registrations never complete.
        stalled: bool,
    }

    impl Host {
        fn stalled() -> Self {
            Self {
                stalled: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TabRegistrar for Host {
        async fn register_onboarding(&self, location: &str) -> std::result::Result<(), BoxError> {
            self.registrations.lock().push(location.to_string());
            if self.stalled {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    impl PhishingRedirect for Host {
        fn redirect(&self, warning: PhishingWarning) {
            self.redirects.lock().push(warning);
        }
    }

    struct Harness {
        host: Arc<Host>,
        page_peer: MemoryTransport,
        ext_peer: MemoryTransport,
        bridge: RunningBridge,
    }

    fn start(config: BridgeConfig) -> Harness {
        start_with(config, Host::default())
    }

    fn start_with(config: BridgeConfig, host: Host) -> Harness {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let (page_local, page_peer) = MemoryTransport::pair();
        let (ext_local, ext_peer) = MemoryTransport::pair();
        let host = Arc::new(host);

        let bridge = Bridge::builder()
            .page_transport(page_local)
            .extension_transport(ext_local)
            .page(PageContext::parse(PAGE_URL).expect("url"))
            .registrar(Arc::clone(&host))
            .redirect(Arc::clone(&host))
            .config(config)
            .build()
            .expect("build")
            .start()
            .expect("start");

        Harness {
            host,
            page_peer,
            ext_peer,
            bridge,
        }
    }

    fn frame(name: &str, data: Value) -> Value {
        json!({ "name": name, "data": data })
    }

    async fn next_frame(peer: &mut MemoryTransport) -> Value {
        peer.next().await.expect("frame").expect("ok")
    }

    /// Round-trips a provider frame so everything sent earlier was routed.
    async fn sync(from: &mut MemoryTransport, to: &mut MemoryTransport) {
        from.send(frame("provider", json!("sync")))
            .await
            .expect("send");
        assert_eq!(next_frame(to).await, frame("provider", json!("sync")));
    }

    #[tokio::test]
    async fn test_forwards_every_configured_channel() {
        let mut h = start(BridgeConfig::default());

        for name in channel_names::FORWARDED {
            h.page_peer
                .send(frame(name, json!({"up": name})))
                .await
                .expect("send");
            assert_eq!(
                next_frame(&mut h.ext_peer).await,
                frame(name, json!({"up": name}))
            );

            h.ext_peer
                .send(frame(name, json!({"down": name})))
                .await
                .expect("send");
            assert_eq!(
                next_frame(&mut h.page_peer).await,
                frame(name, json!({"down": name}))
            );
        }

        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_unforwarded_channel_is_not_relayed() {
        let mut h = start(BridgeConfig::default());

        h.page_peer
            .send(frame("internal", json!(1)))
            .await
            .expect("send");
        h.page_peer
            .send(frame("provider", json!(2)))
            .await
            .expect("send");

        assert_eq!(next_frame(&mut h.ext_peer).await, frame("provider", json!(2)));
        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_onboarding_registers_page_location() {
        let mut h = start(BridgeConfig::default());

        h.ext_peer
            .send(frame("onboarding", json!({"type": "other"})))
            .await
            .expect("send");
        h.ext_peer
            .send(frame("onboarding", json!({"type": "registerOnboarding"})))
            .await
            .expect("send");
        sync(&mut h.ext_peer, &mut h.page_peer).await;

        h.bridge.stop().await;
        assert_eq!(*h.host.registrations.lock(), vec![PAGE_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_onboarding_on_page_side() {
        let mut h = start(BridgeConfig::new().with_onboarding_side(Side::Page));

        h.page_peer
            .send(frame("onboarding", json!({"type": "registerOnboarding"})))
            .await
            .expect("send");
        sync(&mut h.page_peer, &mut h.ext_peer).await;

        h.bridge.stop().await;
        assert_eq!(h.host.registrations.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_phishing_redirects_once() {
        let mut h = start(BridgeConfig::default());

        h.ext_peer
            .send(frame("phishing", json!({})))
            .await
            .expect("send");
        h.ext_peer
            .send(frame("phishing", json!({})))
            .await
            .expect("send");
        sync(&mut h.ext_peer, &mut h.page_peer).await;

        h.bridge.stop().await;

        let redirects = h.host.redirects.lock();
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects[0].hostname, "app.example.com");
        assert_eq!(redirects[0].href, PAGE_URL);
    }

    #[tokio::test]
    async fn test_phishing_redirect_gets_warning_page_url() {
        let root = Url::parse("moz-extension://5a1e/").expect("root");
        let mut h = start(BridgeConfig::new().with_extension_root(root));

        h.ext_peer
            .send(frame("phishing", json!({})))
            .await
            .expect("send");
        sync(&mut h.ext_peer, &mut h.page_peer).await;
        h.bridge.stop().await;

        let redirects = h.host.redirects.lock();
        let target = redirects[0].target.as_ref().expect("target");
        assert_eq!(target.path(), "/phishing.html");
        assert_eq!(
            target.query(),
            Some("hostname=app.example.com&href=https%3A%2F%2Fapp.example.com%2Fstart")
        );
    }

    #[tokio::test]
    async fn test_pending_registration_does_not_stall_forwarding() {
        let mut h = start_with(BridgeConfig::default(), Host::stalled());

        for _ in 0..70 {
            h.ext_peer
                .send(frame("onboarding", json!({"type": "registerOnboarding"})))
                .await
                .expect("send");
        }
        h.ext_peer
            .send(frame("provider", json!("after onboarding")))
            .await
            .expect("send");

        let relayed = tokio::time::timeout(Duration::from_secs(2), next_frame(&mut h.page_peer))
            .await
            .expect("provider relayed while registration pending");
        assert_eq!(relayed, frame("provider", json!("after onboarding")));
        assert!(h.host.registrations.lock().len() <= 1);

        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_stop_returns_with_pending_registration() {
        let mut h = start_with(BridgeConfig::default(), Host::stalled());

        h.ext_peer
            .send(frame("onboarding", json!({"type": "registerOnboarding"})))
            .await
            .expect("send");
        sync(&mut h.ext_peer, &mut h.page_peer).await;

        // Wait until the sink is inside the registration call
        while h.host.registrations.lock().is_empty() {
            tokio::task::yield_now().await;
        }

        tokio::time::timeout(Duration::from_secs(2), h.bridge.stop())
            .await
            .expect("stop returned");
        assert!(h.page_peer.next().await.is_none());
    }

    #[tokio::test]
    async fn test_extension_loss_notifies_page() {
        let mut h = start(BridgeConfig::default());

        drop(h.ext_peer);

        assert_eq!(
            next_frame(&mut h.page_peer).await,
            frame(
                "provider",
                json!({"jsonrpc": "2.0", "method": "STREAM_FAILURE"})
            )
        );
        assert!(h.bridge.page_mux().status().is_open());
        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_extension_failure_keeps_page_side_alive() {
        let mut h = start(BridgeConfig::default());

        h.ext_peer.inject_error("port disconnected").expect("inject");

        let notice = next_frame(&mut h.page_peer).await;
        assert_eq!(notice["data"]["method"], "STREAM_FAILURE");
        assert!(h.bridge.extension_mux().closed().await.is_failed());
        assert!(h.bridge.page_mux().status().is_open());

        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_stop_closes_transports_without_notice() {
        let mut h = start(BridgeConfig::default());

        h.bridge.stop().await;

        assert!(h.page_peer.next().await.is_none());
        assert!(h.ext_peer.next().await.is_none());
    }

    #[tokio::test]
    async fn test_ignored_extension_channel() {
        let mut h = start(BridgeConfig::new().with_ignored_channel("legacyConfig"));

        h.ext_peer
            .send(frame("legacyConfig", json!(1)))
            .await
            .expect("send");
        h.ext_peer
            .send(frame("capabilities", json!(2)))
            .await
            .expect("send");

        assert_eq!(
            next_frame(&mut h.page_peer).await,
            frame("capabilities", json!(2))
        );
        h.bridge.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_all_or_nothing() {
        let (page_local, mut page_peer) = MemoryTransport::pair();
        let (ext_local, _ext_peer) = MemoryTransport::pair();
        let host = Arc::new(Host::default());

        // Duplicate only detectable at registration time
        let mut config = BridgeConfig::default();
        config.forwarded_channels.push("provider".to_string());

        let bridge = Bridge::new(
            Box::new(page_local),
            Box::new(ext_local),
            PageContext::parse(PAGE_URL).expect("url"),
            host.clone(),
            host,
            config,
        );

        let err = bridge.start().unwrap_err();
        assert!(matches!(err, Error::DuplicateChannel { .. }));
        assert!(page_peer.next().await.is_none());
    }
}
