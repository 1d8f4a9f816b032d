//! Seams to the chain API adapters living outside the core.

use crate::amount::RawAmount;
use crate::snapshot::{EquilibriumAccount, RawAccountInfo};
use async_trait::async_trait;
use multiwallet_error::Result;
use tokio::sync::mpsc;

/// A live connection to one chain.
///
/// Connect failures are absorbed here: the adapter surfaces them to the
/// connection tracker only as a `DISCONNECTED` report.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// Chain slug this adapter serves
    fn chain(&self) -> &str;

    /// Resolves once the current (re)connection is usable
    async fn wait_ready(&self) -> Result<()>;

    /// Live connection indicator
    fn is_connected(&self) -> bool;

    /// Starts a reconnect. Completion is signalled through status reports.
    fn reconnect(&self);
}

/// Administrative on/off switch per chain
pub trait ChainActivity: Send + Sync {
    /// True if the chain is enabled
    fn is_chain_active(&self, chain: &str) -> bool;
}

impl<F> ChainActivity for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_chain_active(&self, chain: &str) -> bool {
        self(chain)
    }
}

/// One account's raw state as pushed by an [`AccountSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    /// Account address
    pub address: String,
    /// Raw `system.account` entry
    pub info: RawAccountInfo,
    /// Nomination-pool stake (points plus unbonding), if any
    pub pooled_stake: Option<RawAmount>,
}

impl AccountUpdate {
    /// Update without pool stake
    pub fn new(address: impl Into<String>, info: RawAccountInfo) -> Self {
        Self {
            address: address.into(),
            info,
            pooled_stake: None,
        }
    }
}

/// Substrate-style account subscription
pub trait AccountSource: Send + Sync {
    /// Chain slug
    fn chain(&self) -> &str;

    /// Streams batches of account updates for `addresses`. The stream ends
    /// when the adapter drops its sender.
    fn subscribe_accounts(&self, addresses: Vec<String>) -> mpsc::UnboundedReceiver<Vec<AccountUpdate>>;
}

/// One address's Equilibrium-style system account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquilibriumUpdate {
    /// Account address
    pub address: String,
    /// Decoded per-asset balance list
    pub account: EquilibriumAccount,
}

impl EquilibriumUpdate {
    /// Update for `address`
    pub fn new(address: impl Into<String>, account: EquilibriumAccount) -> Self {
        Self {
            address: address.into(),
            account,
        }
    }
}

/// Subscription to chains whose system account is the Equilibrium
/// per-asset list instead of the usual `data` record
pub trait EquilibriumSource: Send + Sync {
    /// Chain slug
    fn chain(&self) -> &str;

    /// Streams batches of account updates for `addresses`
    fn subscribe_equilibrium(&self, addresses: Vec<String>) -> mpsc::UnboundedReceiver<Vec<EquilibriumUpdate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_activity_oracle() {
        let oracle = |chain: &str| chain != "kusama";
        assert!(oracle.is_chain_active("polkadot"));
        assert!(!oracle.is_chain_active("kusama"));
    }
}
