//! # Multiwallet Testing Infrastructure
//!
//! Testing utilities for the multiwallet core:
//! - Edge case amounts and account fixtures
//! - Mock chain adapters with scriptable connectivity
//! - Property-based testing strategies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use multiwallet_testing::*;
//!
//! let api = MockChainApi::new("astar");
//! api.set_connected(false);
//!
//! proptest! {
//!     #[test]
//!     fn test_total(snap in strategies::any_snapshot()) {
//!         // ...
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use multiwallet_error::{CoreError, Result};
use multiwallet_types::{
    AccountSource, AccountUpdate, ChainActivity, ChainApi, EquilibriumSource, EquilibriumUpdate, RawAccountData,
    RawAccountInfo, RawAmount,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

// ============================================================================
// Edge Case Amounts
// ============================================================================

/// Edge case amounts, as decimal strings
pub struct EdgeCaseAmounts;

impl EdgeCaseAmounts {
    /// Zero
    pub const ZERO: &'static str = "0";

    /// Smallest unit
    pub const MIN: &'static str = "1";

    /// `u64::MAX`
    pub const MAX_U64: &'static str = "18446744073709551615";

    /// `u128::MAX`
    pub const MAX_U128: &'static str = "340282366920938463463374607431768211455";

    /// Larger than any machine integer
    pub const BEYOND_U128: &'static str = "340282366920938463463374607431768211456000";

    /// Typical Polkadot existential deposit (1 DOT in plancks)
    pub const DOT_ED: &'static str = "10000000000";

    /// Valid amounts, including hex
    pub fn valid() -> Vec<&'static str> {
        vec![
            Self::ZERO,
            Self::MIN,
            Self::MAX_U64,
            Self::MAX_U128,
            Self::BEYOND_U128,
            Self::DOT_ED,
            "0x0",
            "0xffffffffffffffffffffffffffffffffff",
        ]
    }

    /// Malformed amounts that must be rejected rather than read as zero
    pub fn malformed() -> Vec<&'static str> {
        vec![
            "",              // Empty
            "-1",            // Negative
            "+1",            // Explicit sign
            "1.5",           // Fraction
            "1_000",         // Separator
            " 10",           // Whitespace
            "0x",            // Bare prefix
            "0xZZ",          // Bad hex
            "12abc",         // Trailing garbage
        ]
    }
}

// ============================================================================
// Account Fixtures
// ============================================================================

/// Current-layout `system.account` entry with zero reference counts
pub fn raw_account(free: &str, reserved: &str, frozen: &str) -> RawAccountInfo {
    RawAccountInfo {
        data: RawAccountData {
            free: Some(RawAmount::from(free)),
            reserved: Some(RawAmount::from(reserved)),
            frozen: Some(RawAmount::from(frozen)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Legacy-layout `system.account` entry with zero reference counts
pub fn legacy_raw_account(free: &str, reserved: &str, misc_frozen: &str, fee_frozen: &str) -> RawAccountInfo {
    RawAccountInfo {
        data: RawAccountData {
            free: Some(RawAmount::from(free)),
            reserved: Some(RawAmount::from(reserved)),
            misc_frozen: Some(RawAmount::from(misc_frozen)),
            fee_frozen: Some(RawAmount::from(fee_frozen)),
            frozen: None,
        },
        ..Default::default()
    }
}

// ============================================================================
// Mock Adapters
// ============================================================================

/// How [`MockChainApi::wait_ready`] resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyBehavior {
    /// Resolves immediately with `Ok`
    Ready,
    /// Resolves immediately with a connectivity error
    Fail(String),
    /// Never resolves
    Hang,
}

/// Chain adapter with scriptable connectivity
#[derive(Debug)]
pub struct MockChainApi {
    chain: String,
    connected: AtomicBool,
    connect_on_reconnect: AtomicBool,
    reconnects: AtomicUsize,
    ready: Mutex<ReadyBehavior>,
}

impl MockChainApi {
    /// Disconnected adapter whose `wait_ready` succeeds
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            connected: AtomicBool::new(false),
            connect_on_reconnect: AtomicBool::new(false),
            reconnects: AtomicUsize::new(0),
            ready: Mutex::new(ReadyBehavior::Ready),
        }
    }

    /// Sets the live connection indicator
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Makes `reconnect` flip the indicator to connected
    pub fn set_connect_on_reconnect(&self, enabled: bool) {
        self.connect_on_reconnect.store(enabled, Ordering::SeqCst);
    }

    /// Sets how `wait_ready` resolves
    pub fn set_ready_behavior(&self, behavior: ReadyBehavior) {
        *self.ready.lock() = behavior;
    }

    /// Number of `reconnect` calls so far
    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainApi for MockChainApi {
    fn chain(&self) -> &str {
        &self.chain
    }

    async fn wait_ready(&self) -> Result<()> {
        let behavior = self.ready.lock().clone();
        match behavior {
            ReadyBehavior::Ready => {
                self.set_connected(true);
                Ok(())
            }
            ReadyBehavior::Fail(reason) => Err(CoreError::Connectivity {
                chain: self.chain.clone(),
                reason,
            }),
            ReadyBehavior::Hang => std::future::pending().await,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        if self.connect_on_reconnect.load(Ordering::SeqCst) {
            self.set_connected(true);
        }
    }
}

/// Activity oracle backed by a mutable set of active chains
#[derive(Debug, Default)]
pub struct StaticActivity {
    active: RwLock<HashSet<String>>,
}

impl StaticActivity {
    /// Oracle with `chains` active
    pub fn new<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: RwLock::new(chains.into_iter().map(Into::into).collect()),
        }
    }

    /// Enables or disables a chain
    pub fn set_active(&self, chain: &str, active: bool) {
        let mut set = self.active.write();
        if active {
            set.insert(chain.to_string());
        } else {
            set.remove(chain);
        }
    }
}

impl ChainActivity for StaticActivity {
    fn is_chain_active(&self, chain: &str) -> bool {
        self.active.read().contains(chain)
    }
}

/// Account source fed by hand through [`push`](Self::push)
#[derive(Debug)]
pub struct MockAccountSource {
    chain: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Vec<AccountUpdate>>>>,
    subscribed: Mutex<Vec<String>>,
}

impl MockAccountSource {
    /// Source for `chain`
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            sender: Mutex::new(None),
            subscribed: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a batch to the current subscriber. Returns false when there
    /// is none or it has gone away.
    pub fn push(&self, batch: Vec<AccountUpdate>) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(batch).is_ok(),
            None => false,
        }
    }

    /// Ends the current subscription stream
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Addresses passed to the last `subscribe_accounts`
    pub fn subscribed_addresses(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }
}

impl AccountSource for MockAccountSource {
    fn chain(&self) -> &str {
        &self.chain
    }

    fn subscribe_accounts(&self, addresses: Vec<String>) -> mpsc::UnboundedReceiver<Vec<AccountUpdate>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock() = Some(tx);
        *self.subscribed.lock() = addresses;
        rx
    }
}

/// Equilibrium source fed by hand
#[derive(Debug)]
pub struct MockEquilibriumSource {
    chain: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Vec<EquilibriumUpdate>>>>,
}

impl MockEquilibriumSource {
    /// Source for `chain`
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            sender: Mutex::new(None),
        }
    }

    /// Delivers a batch to the current subscriber
    pub fn push(&self, batch: Vec<EquilibriumUpdate>) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(batch).is_ok(),
            None => false,
        }
    }
}

impl EquilibriumSource for MockEquilibriumSource {
    fn chain(&self) -> &str {
        &self.chain
    }

    fn subscribe_equilibrium(&self, _addresses: Vec<String>) -> mpsc::UnboundedReceiver<Vec<EquilibriumUpdate>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock() = Some(tx);
        rx
    }
}

// ============================================================================
// Property-Based Testing Strategies
// ============================================================================

/// Proptest strategies for snapshots and balance items
pub mod strategies {
    use multiwallet_types::{AccountBalanceSnapshot, AccountData, ApiItemState, BalanceItem};
    use num_bigint::BigUint;
    use proptest::prelude::*;

    /// Amounts from dust up to beyond `u128::MAX`
    pub fn any_amount() -> impl Strategy<Value = BigUint> {
        prop_oneof![
            (0u64..10_000).prop_map(BigUint::from),
            any::<u64>().prop_map(BigUint::from),
            any::<u128>().prop_map(BigUint::from),
            (any::<u128>(), 1u32..1_000).prop_map(|(v, m)| BigUint::from(v) * m),
        ]
    }

    /// Existential deposits
    pub fn any_existential_deposit() -> impl Strategy<Value = BigUint> {
        any_amount()
    }

    /// Either account layout
    pub fn any_account_data() -> impl Strategy<Value = AccountData> {
        prop_oneof![
            (any_amount(), any_amount(), any_amount(), any_amount()).prop_map(
                |(free, reserved, misc_frozen, fee_frozen)| AccountData::Legacy {
                    free,
                    reserved,
                    misc_frozen,
                    fee_frozen,
                }
            ),
            (any_amount(), any_amount(), any_amount())
                .prop_map(|(free, reserved, frozen)| AccountData::Current { free, reserved, frozen }),
        ]
    }

    /// Snapshots with small reference counts
    pub fn any_snapshot() -> impl Strategy<Value = AccountBalanceSnapshot> {
        (any_account_data(), 0u32..3, 0u32..3).prop_map(|(data, consumers, providers)| {
            AccountBalanceSnapshot::new(data).with_refs(consumers, providers)
        })
    }

    /// Item states
    pub fn any_state() -> impl Strategy<Value = ApiItemState> {
        prop_oneof![
            Just(ApiItemState::Pending),
            Just(ApiItemState::Ready),
            Just(ApiItemState::Cached),
            Just(ApiItemState::NotSupport),
        ]
    }

    /// One item over a small address/token universe so keys collide
    pub fn any_balance_item() -> impl Strategy<Value = BalanceItem> {
        (
            prop::sample::select(vec!["addrA", "addrB", "addrC"]),
            prop::sample::select(vec!["DOT", "KSM", "ACA"]),
            any_amount(),
            any_amount(),
            any_state(),
        )
            .prop_map(|(address, slug, free, locked, state)| {
                BalanceItem::new(address, slug, free, locked).with_state(state)
            })
    }

    /// Batches of items
    pub fn any_balance_items() -> impl Strategy<Value = Vec<BalanceItem>> {
        prop::collection::vec(any_balance_item(), 0..20)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use multiwallet_types::{parse_amount, AccountBalanceSnapshot, AccountVariant};
    use proptest::prelude::*;

    #[test]
    fn test_edge_case_amounts() {
        for raw in EdgeCaseAmounts::valid() {
            assert!(parse_amount("amount", raw).is_ok(), "expected {raw:?} to parse");
        }
        for raw in EdgeCaseAmounts::malformed() {
            assert!(parse_amount("amount", raw).is_err(), "expected {raw:?} to be rejected");
        }
    }

    #[test]
    fn test_fixtures_decode_to_expected_layout() {
        let current = AccountBalanceSnapshot::try_from(raw_account("1", "0", "0")).unwrap();
        assert_eq!(current.variant(), AccountVariant::Current);

        let legacy = AccountBalanceSnapshot::try_from(legacy_raw_account("1", "0", "0", "0")).unwrap();
        assert_eq!(legacy.variant(), AccountVariant::Legacy);
    }

    #[tokio::test]
    async fn test_mock_chain_api() {
        let api = MockChainApi::new("astar");
        assert!(!api.is_connected());

        api.reconnect();
        assert_eq!(api.reconnect_count(), 1);
        assert!(!api.is_connected());

        api.set_connect_on_reconnect(true);
        api.reconnect();
        assert!(api.is_connected());

        api.set_ready_behavior(ReadyBehavior::Fail("boom".into()));
        assert!(api.wait_ready().await.is_err());
    }

    #[test]
    fn test_static_activity() {
        let oracle = StaticActivity::new(["polkadot"]);
        assert!(oracle.is_chain_active("polkadot"));
        oracle.set_active("polkadot", false);
        oracle.set_active("kusama", true);
        assert!(!oracle.is_chain_active("polkadot"));
        assert!(oracle.is_chain_active("kusama"));
    }

    #[tokio::test]
    async fn test_mock_account_source() {
        let source = MockAccountSource::new("polkadot");
        assert!(!source.push(vec![]));

        let mut rx = source.subscribe_accounts(vec!["addrA".into()]);
        assert!(source.push(vec![AccountUpdate::new("addrA", raw_account("1", "0", "0"))]));
        assert_eq!(rx.recv().await.unwrap().len(), 1);

        source.close();
        assert!(rx.recv().await.is_none());
    }

    proptest! {
        #[test]
        fn test_snapshot_refs_in_range(snap in strategies::any_snapshot()) {
            prop_assert!(snap.consumers < 3);
            prop_assert!(snap.providers < 3);
        }
    }
}
