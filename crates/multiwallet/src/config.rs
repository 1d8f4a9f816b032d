//! Core configuration
//!
//! Everything is optional in JSON; missing fields take their defaults.
//!
//! ```json
//! {
//!   "connection": {
//!     "connect_timeout_ms": 30000,
//!     "reconnect": { "max_retry": 6, "first_reconnect_delay_ms": 3000, "short_retry_delay_ms": 20000 }
//!   },
//!   "balance": { "all_accounts_selected": true },
//!   "log_filter": "multiwallet=debug"
//! }
//! ```

use multiwallet_error::{CoreError, ErrorContext, Result};
use multiwallet_resilience::{ConnectionConfig, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Balance settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Keep the `ALL` aggregate rebuilt on every balance update
    pub all_accounts_selected: bool,
}

impl BalanceConfig {
    /// Set the all-accounts view
    pub fn with_all_accounts_selected(mut self, selected: bool) -> Self {
        self.all_accounts_selected = selected;
        self
    }
}

/// Top-level configuration of a [`WalletCore`](crate::WalletCore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Connection and reconnect settings
    pub connection: ConnectionConfig,
    /// Balance settings
    pub balance: BalanceConfig,
    /// `EnvFilter` directive used by [`init_logging`](crate::init_logging)
    pub log_filter: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            balance: BalanceConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Create config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connection settings
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Set the reconnect policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.connection.reconnect = policy;
        self
    }

    /// Set balance settings
    pub fn with_balance(mut self, balance: BalanceConfig) -> Self {
        self.balance = balance;
        self
    }

    /// Set the log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parses and validates a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Rejects settings the reconnect loop cannot work with
    pub fn validate(&self) -> Result<()> {
        let reconnect = &self.connection.reconnect;
        if reconnect.max_retry == 0 {
            return Err(CoreError::ConfigError("max_retry must be greater than 0".into()));
        }
        if reconnect.first_reconnect_delay.is_zero() || reconnect.short_retry_delay.is_zero() {
            return Err(CoreError::ConfigError("reconnect delays must be non-zero".into()));
        }
        if self.connection.connect_timeout.is_zero() {
            return Err(CoreError::ConfigError("connect_timeout must be non-zero".into()));
        }
        Ok(())
    }
}
