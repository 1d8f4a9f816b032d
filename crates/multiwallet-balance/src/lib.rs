//! # Multiwallet Balance
//!
//! Turns raw, runtime-version-specific account data into canonical balances
//! and keeps them in an observable per-address, per-token map.
//!
//! - **Normalizer**: [`compute_transferable`], [`compute_total_balance`],
//!   [`is_reapable`], [`is_active`]
//! - **Strict mode**: [`StrictModePolicy`] decides whether the existential
//!   deposit is withheld
//! - **Store**: [`BalanceMapStore`] with the synthetic `ALL` aggregate
//! - **Service**: [`BalanceService`] wires account sources into the store
//!
//! ## Example
//!
//! ```
//! use multiwallet_balance::{compute_transferable, compute_total_balance};
//! use multiwallet_types::{AccountBalanceSnapshot, AccountData, ExtrinsicType};
//!
//! let snapshot = AccountBalanceSnapshot::new(AccountData::current("500", "100", "50").unwrap())
//!     .with_refs(1, 1);
//!
//! let transferable = compute_transferable(&snapshot, "10", None).unwrap();
//! assert_eq!(transferable.to_string(), "490");
//! assert_eq!(compute_total_balance(&snapshot).to_string(), "600");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
pub mod group;
pub mod normalizer;
pub mod policy;
pub mod service;
pub mod store;

pub use convert::{balance_item_from_snapshot, equilibrium_balance_item};
pub use group::group_balance;
pub use normalizer::{
    compute_applied_ed, compute_locked, compute_total_balance, compute_transferable,
    compute_transferable_with_policy, is_active, is_reapable, transferable,
};
pub use policy::StrictModePolicy;
pub use service::BalanceService;
pub use store::BalanceMapStore;
