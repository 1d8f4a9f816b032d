//! Feeds account subscriptions into the [`BalanceMapStore`].

use crate::convert::{balance_item_from_snapshot, equilibrium_balance_item};
use crate::store::BalanceMapStore;
use multiwallet_error::{CoreError, Result};
use multiwallet_types::{
    AccountBalanceSnapshot, AccountSource, AccountUpdate, BalanceItem, BalanceMap, ChainActivity, EquilibriumSource,
    EquilibriumUpdate, ALL_ACCOUNT_KEY,
};
use num_bigint::BigUint;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Process-wide balance service.
///
/// Owns one subscription task per chain. Items coming from a subscription
/// are timestamped and written in one batch; the `ALL` aggregate is rebuilt
/// with them while the all-accounts view is selected.
pub struct BalanceService {
    store: Arc<BalanceMapStore>,
    activity: Arc<dyn ChainActivity>,
    all_accounts_selected: Arc<AtomicBool>,
    subscriptions: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl std::fmt::Debug for BalanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceService")
            .field("all_accounts_selected", &self.all_accounts_selected.load(Ordering::Relaxed))
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}

impl BalanceService {
    /// Creates a service writing into `store`
    pub fn new(store: Arc<BalanceMapStore>, activity: Arc<dyn ChainActivity>) -> Self {
        Self {
            store,
            activity,
            all_accounts_selected: Arc::new(AtomicBool::new(false)),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Sets whether the all-accounts view starts selected
    pub fn with_all_accounts_selected(self, selected: bool) -> Self {
        self.all_accounts_selected.store(selected, Ordering::Relaxed);
        self
    }

    /// Backing store
    pub fn store(&self) -> &Arc<BalanceMapStore> {
        &self.store
    }

    /// Toggles the all-accounts view
    pub fn set_all_accounts_selected(&self, selected: bool) {
        self.all_accounts_selected.store(selected, Ordering::Relaxed);
    }

    /// Whether the all-accounts view is selected
    pub fn all_accounts_selected(&self) -> bool {
        self.all_accounts_selected.load(Ordering::Relaxed)
    }

    /// Subscribes `addresses` on `source`, converting updates into
    /// `native_token_slug` items. Replaces an existing subscription for the
    /// same chain. Must be called inside a tokio runtime.
    pub fn subscribe_chain(
        &self,
        source: Arc<dyn AccountSource>,
        native_token_slug: impl Into<String>,
        addresses: Vec<String>,
    ) -> Result<()> {
        let chain = source.chain().to_string();
        if !self.activity.is_chain_active(&chain) {
            return Err(CoreError::ChainInactive(chain));
        }

        let slug = native_token_slug.into();
        let mut rx = source.subscribe_accounts(addresses.clone());
        let store = Arc::clone(&self.store);
        let all_selected = Arc::clone(&self.all_accounts_selected);
        let task_chain = chain.clone();

        let handle = tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                let items: Vec<BalanceItem> = batch
                    .into_iter()
                    .filter_map(|update| match item_from_update(&slug, update) {
                        Ok(item) => Some(item),
                        Err(e) => {
                            warn!(chain = %task_chain, error = %e, "Dropping malformed account update");
                            None
                        }
                    })
                    .collect();
                write_items(&store, items, all_selected.load(Ordering::Relaxed));
            }
            debug!(chain = %task_chain, "Account subscription ended");
        });

        self.track(chain, handle, addresses.len());
        Ok(())
    }

    /// Subscribes `addresses` on an Equilibrium-style chain. Each update
    /// yields one item per `(token slug, asset id)` in `assets`. Shares the
    /// per-chain slot with [`subscribe_chain`](Self::subscribe_chain).
    pub fn subscribe_equilibrium(
        &self,
        source: Arc<dyn EquilibriumSource>,
        assets: Vec<(String, u64)>,
        addresses: Vec<String>,
    ) -> Result<()> {
        let chain = source.chain().to_string();
        if !self.activity.is_chain_active(&chain) {
            return Err(CoreError::ChainInactive(chain));
        }

        let mut rx = source.subscribe_equilibrium(addresses.clone());
        let store = Arc::clone(&self.store);
        let all_selected = Arc::clone(&self.all_accounts_selected);
        let task_chain = chain.clone();

        let handle = tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                write_items(&store, equilibrium_items(&assets, batch), all_selected.load(Ordering::Relaxed));
            }
            debug!(chain = %task_chain, "Equilibrium subscription ended");
        });

        self.track(chain, handle, addresses.len());
        Ok(())
    }

    fn track(&self, chain: String, handle: JoinHandle<()>, addresses: usize) {
        info!(chain = %chain, addresses, "Subscribed account balances");
        if let Some(previous) = self.subscriptions.lock().insert(chain, handle) {
            previous.abort();
        }
    }

    /// Stops the subscription of one chain; no-op if there is none
    pub fn unsubscribe_chain(&self, chain: &str) {
        if let Some(handle) = self.subscriptions.lock().remove(chain) {
            handle.abort();
            debug!(chain = %chain, "Unsubscribed account balances");
        }
    }

    /// Chains with a running subscription
    pub fn subscribed_chains(&self) -> Vec<String> {
        let mut chains: Vec<String> = self.subscriptions.lock().keys().cloned().collect();
        chains.sort();
        chains
    }

    /// Timestamps and stores a batch of items
    pub fn set_balance_items(&self, items: Vec<BalanceItem>) {
        write_items(&self.store, items, self.all_accounts_selected());
    }

    /// Drops every balance of the given addresses, and the aggregate with them
    pub fn remove_balance_by_addresses(&self, addresses: &[String]) {
        let mut keys = addresses.to_vec();
        keys.push(ALL_ACCOUNT_KEY.to_string());
        self.store.remove_by_keys(Some(keys.as_slice()), None);
    }

    /// Drops balances whose token is not in `active_tokens`
    pub fn remove_inactive_token_balances(&self, active_tokens: &HashSet<String>) {
        self.store.remove_where(|item| !active_tokens.contains(&item.token_slug));
    }

    /// Clears every balance when `force` is set, otherwise only drops
    /// balances of tokens outside `active_tokens`
    pub fn reset(&self, force: bool, active_tokens: &HashSet<String>) {
        if force {
            self.store.set_all(BalanceMap::new());
            info!("Balance map reset");
        } else {
            self.remove_inactive_token_balances(active_tokens);
        }
    }

    /// Free balance of one (address, token) pair, if known
    pub fn free_balance(&self, address: &str, token_slug: &str) -> Option<BigUint> {
        self.store.get(address, token_slug).map(|item| item.free)
    }

    /// Aborts every subscription
    pub fn stop(&self) {
        let handles: Vec<(String, JoinHandle<()>)> = self.subscriptions.lock().drain().collect();
        for (chain, handle) in handles {
            handle.abort();
            debug!(chain = %chain, "Unsubscribed account balances");
        }
    }
}

impl Drop for BalanceService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn item_from_update(token_slug: &str, update: AccountUpdate) -> Result<BalanceItem> {
    let pooled = update
        .pooled_stake
        .as_ref()
        .map(|raw| raw.parse("pooledStake"))
        .transpose()?;
    let snapshot = AccountBalanceSnapshot::try_from(update.info)?;
    Ok(balance_item_from_snapshot(
        &update.address,
        token_slug,
        &snapshot,
        pooled.as_ref(),
    ))
}

fn equilibrium_items(assets: &[(String, u64)], batch: Vec<EquilibriumUpdate>) -> Vec<BalanceItem> {
    batch
        .iter()
        .flat_map(|update| {
            assets.iter().map(move |(slug, asset_id)| {
                equilibrium_balance_item(&update.address, slug, *asset_id, std::slice::from_ref(&update.account))
            })
        })
        .collect()
}

fn write_items(store: &BalanceMapStore, items: Vec<BalanceItem>, recompute_aggregate: bool) {
    let now = now_millis();
    store.upsert_many(items.into_iter().map(|item| item.with_timestamp(now)), recompute_aggregate);
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
