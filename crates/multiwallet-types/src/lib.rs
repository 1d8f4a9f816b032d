//! # Multiwallet Types
//!
//! Shared vocabulary for the chain-connection and balance core.
//!
//! ## Contents
//!
//! - [`AccountBalanceSnapshot`] / [`AccountData`] - raw `system.account` data, with
//!   the legacy/current layout decided once at decode time
//! - [`BalanceItem`] / [`BalanceMap`] - canonical per-(address, token) balances
//! - [`ConnectionStatus`] - per-chain connectivity
//! - [`ExtrinsicType`] - hints used by the strict-mode policy
//! - [`ChainApi`], [`ChainActivity`], [`AccountSource`] - adapter seams
//! - [`Subject`] - replay-one observable used by the store and the tracker
//!
//! ## Example
//!
//! ```
//! use multiwallet_types::prelude::*;
//!
//! let json = r#"{
//!     "nonce": 1, "consumers": 0, "providers": 1, "sufficients": 0,
//!     "data": { "free": "1000", "reserved": "0", "miscFrozen": "200", "feeFrozen": "50" }
//! }"#;
//!
//! let snapshot = AccountBalanceSnapshot::from_json(json).unwrap();
//! assert_eq!(snapshot.variant(), AccountVariant::Legacy);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod amount;
pub mod balance;
pub mod connection;
pub mod extrinsic;
pub mod observable;
pub mod snapshot;

pub use adapter::{AccountSource, AccountUpdate, ChainActivity, ChainApi, EquilibriumSource, EquilibriumUpdate};
pub use amount::{parse_amount, RawAmount};
pub use balance::{is_account_all, ApiItemState, BalanceItem, BalanceMap, SubstrateInfo, ALL_ACCOUNT_KEY};
pub use connection::{ConnectionStatus, ConnectionStatusMap};
pub use extrinsic::ExtrinsicType;
pub use observable::{Subject, Subscription};
pub use snapshot::{
    AccountBalanceSnapshot, AccountData, AccountVariant, EquilibriumAccount, RawAccountData,
    RawAccountInfo, SignedBalance,
};

/// Arbitrary precision unsigned balance in the chain's smallest unit
pub use num_bigint::BigUint as Balance;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{AccountSource, AccountUpdate, ChainActivity, ChainApi};
    pub use crate::balance::{ApiItemState, BalanceItem, BalanceMap, ALL_ACCOUNT_KEY};
    pub use crate::connection::ConnectionStatus;
    pub use crate::extrinsic::ExtrinsicType;
    pub use crate::observable::{Subject, Subscription};
    pub use crate::snapshot::{AccountBalanceSnapshot, AccountData, AccountVariant};
    pub use crate::Balance;
}
