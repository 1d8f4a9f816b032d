//! Canonical balance records.

use crate::amount::amount_string;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Synthetic address holding the sum over every real address
pub const ALL_ACCOUNT_KEY: &str = "ALL";

/// Returns true for the synthetic all-accounts address
pub fn is_account_all(address: &str) -> bool {
    address == ALL_ACCOUNT_KEY
}

/// Freshness of a balance record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiItemState {
    /// Waiting for the first chain response
    Pending,
    /// Fresh from the chain
    Ready,
    /// Restored from a previous session
    Cached,
    /// Chain or token cannot report this balance
    NotSupport,
}

impl fmt::Display for ApiItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Cached => write!(f, "cached"),
            Self::NotSupport => write!(f, "not_support"),
        }
    }
}

/// Raw lock breakdown kept alongside native-token balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateInfo {
    /// Reserved balance
    #[serde(with = "amount_string")]
    pub reserved: BigUint,
    /// `miscFrozen`, or `frozen` on consolidated runtimes
    #[serde(with = "amount_string")]
    pub misc_frozen: BigUint,
    /// `feeFrozen`, zero on consolidated runtimes
    #[serde(with = "amount_string")]
    pub fee_frozen: BigUint,
}

/// Balance of one token held by one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceItem {
    /// Owner address, or [`ALL_ACCOUNT_KEY`]
    pub address: String,
    /// Token slug (e.g. `polkadot-NATIVE-DOT`)
    pub token_slug: String,
    /// Spendable part
    #[serde(with = "amount_string")]
    pub free: BigUint,
    /// Locked/reserved part
    #[serde(with = "amount_string")]
    pub locked: BigUint,
    /// Freshness
    pub state: ApiItemState,
    /// Milliseconds since the epoch when the item was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Lock breakdown for native tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substrate_info: Option<SubstrateInfo>,
}

impl BalanceItem {
    /// Creates a ready item
    pub fn new(address: impl Into<String>, token_slug: impl Into<String>, free: BigUint, locked: BigUint) -> Self {
        Self {
            address: address.into(),
            token_slug: token_slug.into(),
            free,
            locked,
            state: ApiItemState::Ready,
            timestamp: None,
            substrate_info: None,
        }
    }

    /// Sets the state
    pub fn with_state(mut self, state: ApiItemState) -> Self {
        self.state = state;
        self
    }

    /// Sets the timestamp
    pub fn with_timestamp(mut self, millis: u64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// `free + locked`
    pub fn total(&self) -> BigUint {
        &self.free + &self.locked
    }
}

/// `address -> token slug -> item`
pub type BalanceMap = BTreeMap<String, BTreeMap<String, BalanceItem>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts_serialize_as_strings() {
        let item = BalanceItem::new("addrA", "polkadot-NATIVE-DOT", BigUint::from(100u32), BigUint::from(5u32));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["free"], "100");
        assert_eq!(json["locked"], "5");
        assert_eq!(json["state"], "READY");
        assert_eq!(json["tokenSlug"], "polkadot-NATIVE-DOT");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_deserialize_rejects_corrupt_amount() {
        let json = r#"{"address":"a","tokenSlug":"t","free":"12x","locked":"0","state":"READY"}"#;
        assert!(serde_json::from_str::<BalanceItem>(json).is_err());
    }

    #[test]
    fn test_state_names() {
        let state: ApiItemState = serde_json::from_str("\"NOT_SUPPORT\"").unwrap();
        assert_eq!(state, ApiItemState::NotSupport);
        assert_eq!(ApiItemState::Cached.to_string(), "cached");
    }

    #[test]
    fn test_all_account_key() {
        assert!(is_account_all(ALL_ACCOUNT_KEY));
        assert!(!is_account_all("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"));
    }
}
