//! # Multiwallet - Chain Connection and Balance Core
//!
//! Keeps a multi-chain wallet's view of the world consistent: which chains
//! are reachable, and what each account holds on each of them.
//!
//! | Crate | Provides |
//! |-------|----------|
//! | [`error`] | [`CoreError`], [`ParseError`], error codes |
//! | [`types`] | balance and connection types, adapter traits, `Subject` |
//! | [`balance`] | balance normalizer, strict-mode policy, balance map store |
//! | [`resilience`] | connection health tracker and reconnect loop |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use multiwallet::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<dyn ChainApi>) -> multiwallet::Result<()> {
//! let config = CoreConfig::from_json_str(r#"{"balance": {"all_accounts_selected": true}}"#)?;
//! init_logging(&config.log_filter);
//!
//! let activity: Arc<dyn ChainActivity> = Arc::new(|_: &str| true);
//! let core = WalletCore::new(config, activity)?;
//! core.register_chain(api);
//! core.init()?;
//! core.start().await?;
//!
//! let _sub = core.store().subscribe(|balances| {
//!     println!("{} addresses", balances.len());
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Transferable balance
//!
//! ```rust
//! use multiwallet::balance::compute_transferable;
//! use multiwallet::types::{AccountBalanceSnapshot, AccountData, ExtrinsicType};
//!
//! let snapshot = AccountBalanceSnapshot::new(AccountData::legacy("1000", "0", "200", "150").unwrap())
//!     .with_refs(0, 1);
//! let amount = compute_transferable(&snapshot, "100", Some(ExtrinsicType::TransferBalance)).unwrap();
//! assert_eq!(amount.to_string(), "800");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::{BalanceConfig, CoreConfig};
pub use crate::core::{ServiceStatus, WalletCore};
pub use crate::logging::init_logging;

pub use multiwallet_balance as balance;
pub use multiwallet_error as error;
pub use multiwallet_resilience as resilience;
pub use multiwallet_types as types;

pub use multiwallet_error::{CoreError, ParseError, Result};

// ============================================================================
// Prelude - commonly used types
// ============================================================================

/// Prelude module for convenient imports
///
/// ```
/// use multiwallet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{BalanceConfig, CoreConfig};
    pub use crate::core::{ServiceStatus, WalletCore};
    pub use crate::logging::init_logging;

    pub use multiwallet_balance::{
        compute_total_balance, compute_transferable, is_active, is_reapable, BalanceMapStore, BalanceService,
        StrictModePolicy,
    };
    pub use multiwallet_error::{CoreError, ErrorContext, ParseError, Result};
    pub use multiwallet_resilience::{ConnectionConfig, ConnectionHealthTracker, ConnectionService, ReconnectPolicy};
    pub use multiwallet_types::prelude::*;
}

/// Returns the crate version
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
