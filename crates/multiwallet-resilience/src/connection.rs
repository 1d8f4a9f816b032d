//! Chain connection service
//!
//! Thin owner around [`ConnectionHealthTracker`]: it knows how to drive an
//! adapter through a connect (bounded by `connect_timeout`), how to force a
//! manual reconnect, and how to bring every chain back after a sleep.

use crate::health::ConnectionHealthTracker;
use crate::retry_policy::{duration_millis, ReconnectPolicy};
use crate::timeout::{with_connect_timeout, DEFAULT_CONNECT_TIMEOUT};
use multiwallet_error::{CoreError, Result};
use multiwallet_types::{ChainActivity, ChainApi, ConnectionStatus, ConnectionStatusMap, Subscription};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Bound on a single connect
    #[serde(rename = "connect_timeout_ms", with = "duration_millis")]
    pub connect_timeout: Duration,
    /// Automatic reconnect policy
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Create new config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set reconnect policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

/// Owns the tracker and the adapters it drives
#[derive(Clone)]
pub struct ConnectionService {
    config: ConnectionConfig,
    activity: Arc<dyn ChainActivity>,
    tracker: ConnectionHealthTracker,
}

impl std::fmt::Debug for ConnectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionService")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish()
    }
}

impl ConnectionService {
    /// Create a service
    pub fn new(config: ConnectionConfig, activity: Arc<dyn ChainActivity>) -> Self {
        let tracker = ConnectionHealthTracker::new(config.reconnect.clone(), Arc::clone(&activity));
        Self {
            config,
            activity,
            tracker,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Underlying tracker
    pub fn tracker(&self) -> &ConnectionHealthTracker {
        &self.tracker
    }

    /// Register an adapter
    pub fn register(&self, api: Arc<dyn ChainApi>) {
        self.tracker.register(api);
    }

    /// Remove an adapter and its retries
    pub fn unregister(&self, chain: &str) -> Option<Arc<dyn ChainApi>> {
        self.tracker.unregister(chain)
    }

    /// Current status of `chain`
    pub fn status(&self, chain: &str) -> Option<ConnectionStatus> {
        self.tracker.status(chain)
    }

    /// Whole status map
    pub fn statuses(&self) -> ConnectionStatusMap {
        self.tracker.statuses()
    }

    /// Listen to the status map
    pub fn subscribe_status<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ConnectionStatusMap) + Send + Sync + 'static,
    {
        self.tracker.subscribe(listener)
    }

    fn lookup(&self, chain: &str) -> Result<Arc<dyn ChainApi>> {
        let api = self
            .tracker
            .adapter(chain)
            .ok_or_else(|| CoreError::ChainNotFound(chain.to_string()))?;
        if !self.activity.is_chain_active(chain) {
            return Err(CoreError::ChainInactive(chain.to_string()));
        }
        Ok(api)
    }

    /// Reports `CONNECTING`, waits for the adapter to become ready and
    /// reports the outcome.
    ///
    /// A failed or timed-out connect is reported as `DISCONNECTED`, which
    /// starts the retry loop, and the cause is returned to the caller.
    pub async fn connect(&self, chain: &str) -> Result<()> {
        let api = self.lookup(chain)?;
        self.tracker.report(chain, ConnectionStatus::Connecting, false);

        match with_connect_timeout(chain, self.config.connect_timeout, api.wait_ready()).await {
            Ok(()) => {
                self.tracker.report(chain, ConnectionStatus::Connected, false);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(chain = %chain, error = %e, "Connect failed");
                self.tracker.report(chain, ConnectionStatus::Disconnected, false);
                Err(e)
            }
        }
    }

    /// Manual reconnect: asks the adapter to reconnect and restarts the retry
    /// loop from scratch, even after the chain was marked unstable
    pub fn force_reconnect(&self, chain: &str) -> Result<()> {
        let api = self.lookup(chain)?;
        tracing::info!(chain = %chain, "Manual reconnect");
        api.reconnect();
        self.tracker.cancel(chain);
        self.tracker.report(chain, ConnectionStatus::Disconnected, true);
        Ok(())
    }

    /// Suspend automatic reconnects
    pub fn sleep(&self) {
        self.tracker.sleep();
    }

    /// Leave suspended mode and reconnect every registered, active chain
    /// that is not connected
    pub fn wake_up(&self) {
        self.tracker.wake_up();
        for chain in self.tracker.chains() {
            let Some(api) = self.tracker.adapter(&chain) else {
                continue;
            };
            if api.is_connected() || !self.activity.is_chain_active(&chain) {
                continue;
            }
            if let Err(e) = self.force_reconnect(&chain) {
                tracing::warn!(chain = %chain, error = %e, "Reconnect on wake-up failed");
            }
        }
    }

    /// Stop every retry and suspend
    pub fn shutdown(&self) {
        self.tracker.sleep();
        tracing::info!("Connection service shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiwallet_testing::{MockChainApi, ReadyBehavior, StaticActivity};

    fn service(chains: &[&str]) -> (ConnectionService, Arc<StaticActivity>) {
        let activity = Arc::new(StaticActivity::new(chains.iter().copied()));
        (ConnectionService::new(ConnectionConfig::default(), activity.clone()), activity)
    }

    async fn tick(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_config_json() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"connect_timeout_ms": 1000, "reconnect": {"max_retry": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.reconnect.max_retry, 2);
        assert_eq!(ConnectionConfig::default().connect_timeout, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_success() {
        let (svc, _) = service(&["astar"]);
        svc.register(Arc::new(MockChainApi::new("astar")));

        svc.connect("astar").await.unwrap();
        assert_eq!(svc.status("astar"), Some(ConnectionStatus::Connected));
        assert_eq!(svc.tracker().retry_times("astar"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_starts_recovery() {
        let (svc, _) = service(&["astar"]);
        let api = Arc::new(MockChainApi::new("astar"));
        api.set_ready_behavior(ReadyBehavior::Hang);
        svc.register(api.clone());

        let err = svc.connect("astar").await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectTimeout { millis: 30_000, .. }));
        assert!(err.is_retryable());
        assert_eq!(svc.status("astar"), Some(ConnectionStatus::Disconnected));
        assert_eq!(svc.tracker().retry_times("astar"), Some(1));

        tick(3_000).await;
        assert_eq!(api.reconnect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_error_reported_as_disconnected() {
        let (svc, _) = service(&["astar"]);
        let api = Arc::new(MockChainApi::new("astar"));
        api.set_ready_behavior(ReadyBehavior::Fail("refused".into()));
        svc.register(api);

        let err = svc.connect("astar").await.unwrap_err();
        assert!(matches!(err, CoreError::Connectivity { .. }));
        assert_eq!(svc.status("astar"), Some(ConnectionStatus::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_inactive_chains() {
        let (svc, _) = service(&["astar"]);
        assert!(matches!(svc.connect("acala").await, Err(CoreError::ChainNotFound(_))));

        svc.register(Arc::new(MockChainApi::new("kusama")));
        assert!(matches!(svc.force_reconnect("kusama"), Err(CoreError::ChainInactive(_))));
        assert_eq!(svc.status("kusama"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_reconnect_restarts_loop() {
        let (svc, _) = service(&["astar"]);
        let api = Arc::new(MockChainApi::new("astar"));
        svc.register(api.clone());
        svc.tracker().report("astar", ConnectionStatus::Unstable, false);

        svc.force_reconnect("astar").unwrap();
        assert_eq!(api.reconnect_count(), 1);
        assert_eq!(svc.status("astar"), Some(ConnectionStatus::Disconnected));
        assert_eq!(svc.tracker().retry_times("astar"), Some(1));

        // retry record starts over with the short first delay
        tick(3_000).await;
        assert_eq!(api.reconnect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_and_wake_up() {
        let (svc, activity) = service(&["astar", "acala", "moonbeam"]);
        let astar = Arc::new(MockChainApi::new("astar"));
        let acala = Arc::new(MockChainApi::new("acala"));
        let moonbeam = Arc::new(MockChainApi::new("moonbeam"));
        acala.set_connected(true);
        for api in [&astar, &acala, &moonbeam] {
            svc.register(api.clone());
        }
        activity.set_active("moonbeam", false);

        svc.tracker().report("astar", ConnectionStatus::Disconnected, false);
        svc.sleep();
        tick(30_000).await;
        assert_eq!(astar.reconnect_count(), 0);

        svc.wake_up();
        assert_eq!(astar.reconnect_count(), 1);
        assert_eq!(acala.reconnect_count(), 0);
        assert_eq!(moonbeam.reconnect_count(), 0);
        assert_eq!(svc.tracker().retry_times("astar"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_retries() {
        let (svc, _) = service(&["astar"]);
        let api = Arc::new(MockChainApi::new("astar"));
        svc.register(api.clone());
        svc.tracker().report("astar", ConnectionStatus::Disconnected, false);

        svc.shutdown();
        tick(60_000).await;
        assert_eq!(api.reconnect_count(), 0);
        assert_eq!(svc.tracker().retry_times("astar"), None);
    }
}
