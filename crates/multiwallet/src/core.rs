//! Wallet core lifecycle
//!
//! [`WalletCore`] owns the balance store, the balance service and the
//! connection service, and moves them through one lifecycle:
//!
//! ```text
//! NotInitialized -> Initializing -> Initialized -> Starting -> Started
//!                                        ^                        |
//!                                        |                        v
//!                                     Stopped  <-------------  Stopping
//! ```

use crate::config::CoreConfig;
use multiwallet_balance::{BalanceMapStore, BalanceService};
use multiwallet_error::{CoreError, Result};
use multiwallet_resilience::ConnectionService;
use multiwallet_types::{AccountSource, ChainActivity, ChainApi, ConnectionStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a [`WalletCore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Created, nothing set up yet
    NotInitialized,
    /// `init` in progress
    Initializing,
    /// Ready to start
    Initialized,
    /// Connecting chains
    Starting,
    /// Running
    Started,
    /// `stop` in progress
    Stopping,
    /// Stopped; may be started again
    Stopped,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotInitialized => "not_initialized",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Connection tracking and balances for a set of chains
pub struct WalletCore {
    config: CoreConfig,
    status: Mutex<ServiceStatus>,
    activity: Arc<dyn ChainActivity>,
    store: Arc<BalanceMapStore>,
    balances: BalanceService,
    connections: ConnectionService,
}

impl fmt::Debug for WalletCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCore")
            .field("status", &*self.status.lock())
            .field("balances", &self.balances)
            .field("connections", &self.connections)
            .finish()
    }
}

impl WalletCore {
    /// Builds a core from a validated config. `activity` is consulted before
    /// every subscription, connect and retry.
    pub fn new(config: CoreConfig, activity: Arc<dyn ChainActivity>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(BalanceMapStore::new());
        let balances = BalanceService::new(Arc::clone(&store), Arc::clone(&activity))
            .with_all_accounts_selected(config.balance.all_accounts_selected);
        let connections = ConnectionService::new(config.connection.clone(), Arc::clone(&activity));

        Ok(Self {
            config,
            status: Mutex::new(ServiceStatus::NotInitialized),
            activity,
            store,
            balances,
            connections,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn status(&self) -> ServiceStatus {
        *self.status.lock()
    }

    /// Balance map store
    pub fn store(&self) -> &Arc<BalanceMapStore> {
        &self.store
    }

    /// Balance service
    pub fn balances(&self) -> &BalanceService {
        &self.balances
    }

    /// Connection service
    pub fn connections(&self) -> &ConnectionService {
        &self.connections
    }

    fn transition(&self, allowed: &[ServiceStatus], next: ServiceStatus) -> Result<ServiceStatus> {
        let mut status = self.status.lock();
        if !allowed.contains(&*status) {
            return Err(CoreError::InvalidState(format!("cannot move from {} to {}", *status, next)));
        }
        let previous = *status;
        *status = next;
        tracing::debug!(from = %previous, to = %next, "Wallet core state");
        Ok(previous)
    }

    fn set_status(&self, next: ServiceStatus) {
        *self.status.lock() = next;
        tracing::debug!(to = %next, "Wallet core state");
    }

    /// One-time setup. Fails unless the core is fresh.
    pub fn init(&self) -> Result<()> {
        self.transition(&[ServiceStatus::NotInitialized], ServiceStatus::Initializing)?;
        if self.config.balance.all_accounts_selected {
            self.store.recompute_aggregate();
        }
        self.set_status(ServiceStatus::Initialized);
        tracing::info!("Wallet core initialized");
        Ok(())
    }

    /// Registers a chain adapter. It is connected by the next [`start`](Self::start).
    pub fn register_chain(&self, api: Arc<dyn ChainApi>) {
        self.connections.register(api);
    }

    /// Drops a chain: its adapter, retries and balance subscription
    pub fn unregister_chain(&self, chain: &str) {
        self.connections.unregister(chain);
        self.balances.unsubscribe_chain(chain);
    }

    /// Subscribes balances of `addresses` on `source`
    pub fn subscribe_balances(
        &self,
        source: Arc<dyn AccountSource>,
        native_token_slug: impl Into<String>,
        addresses: Vec<String>,
    ) -> Result<()> {
        self.balances.subscribe_chain(source, native_token_slug, addresses)
    }

    /// Connects every registered, active chain concurrently.
    ///
    /// Chains failing their first connect are left to the reconnect loop; the
    /// core is `Started` once every attempt has settled. Must be called
    /// inside a tokio runtime.
    pub async fn start(&self) -> Result<()> {
        let previous = self.transition(&[ServiceStatus::Initialized, ServiceStatus::Stopped], ServiceStatus::Starting)?;
        self.connections.tracker().wake_up();

        let chains: Vec<String> = self
            .connections
            .tracker()
            .chains()
            .into_iter()
            .filter(|chain| self.activity.is_chain_active(chain))
            .collect();

        let handles: Vec<_> = chains
            .into_iter()
            .map(|chain| {
                let connections = self.connections.clone();
                tokio::spawn(async move {
                    let result = connections.connect(&chain).await;
                    (chain, result)
                })
            })
            .collect();

        let mut failed = 0usize;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((chain, Err(e))) => {
                    failed += 1;
                    tracing::warn!(chain = %chain, error = %e, "Initial connect failed, retrying in background");
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "Connect task aborted");
                }
            }
        }

        self.set_status(ServiceStatus::Started);
        tracing::info!(from = %previous, failed, "Wallet core started");
        Ok(())
    }

    /// Suspends reconnects and stops balance subscriptions
    pub fn stop(&self) -> Result<()> {
        self.transition(&[ServiceStatus::Started], ServiceStatus::Stopping)?;
        self.connections.sleep();
        self.balances.stop();
        self.set_status(ServiceStatus::Stopped);
        tracing::info!("Wallet core stopped");
        Ok(())
    }

    /// Stops everything regardless of state
    pub fn shutdown(&self) {
        self.connections.shutdown();
        self.balances.stop();
        self.set_status(ServiceStatus::Stopped);
        tracing::info!("Wallet core shut down");
    }

    /// Toggles the all-accounts view, rebuilding the aggregate when it turns on
    pub fn set_all_accounts_selected(&self, selected: bool) {
        self.balances.set_all_accounts_selected(selected);
        if selected {
            self.store.recompute_aggregate();
        }
    }

    /// Clears balances; see [`BalanceService::reset`]
    pub fn reset_balances(&self, force: bool, active_tokens: &HashSet<String>) {
        self.balances.reset(force, active_tokens);
    }

    /// Manual reconnect of one chain
    pub fn reconnect(&self, chain: &str) -> Result<()> {
        self.connections.force_reconnect(chain)
    }

    /// Connection status of `chain`
    pub fn connection_status(&self, chain: &str) -> Option<ConnectionStatus> {
        self.connections.status(chain)
    }
}
