//! Raw per-account balance snapshots.
//!
//! Substrate runtimes changed the `AccountData` layout: older runtimes carry
//! two lock buckets (`miscFrozen`, `feeFrozen`), newer ones a single
//! consolidated `frozen`. The layout is decided once, when a
//! [`RawAccountInfo`] is converted into an [`AccountBalanceSnapshot`].

use crate::amount::RawAmount;
use multiwallet_error::{CoreError, ParseError};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Which `AccountData` layout a snapshot was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountVariant {
    /// `free`, `reserved`, `miscFrozen`, `feeFrozen`
    Legacy,
    /// `free`, `reserved`, `frozen`
    Current,
}

/// Balance fields of an account, by layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountData {
    /// Pre-consolidation layout with two gross lock buckets
    Legacy {
        /// Free balance
        free: BigUint,
        /// Reserved balance
        reserved: BigUint,
        /// Lock applying to everything except fee payment
        misc_frozen: BigUint,
        /// Lock applying to fee payment
        fee_frozen: BigUint,
    },
    /// Consolidated layout; `frozen` may exceed `free - reserved`
    Current {
        /// Free balance
        free: BigUint,
        /// Reserved balance
        reserved: BigUint,
        /// Consolidated lock
        frozen: BigUint,
    },
}

impl AccountData {
    /// Builds a legacy layout from decimal strings
    pub fn legacy(free: &str, reserved: &str, misc_frozen: &str, fee_frozen: &str) -> Result<Self, ParseError> {
        Ok(AccountData::Legacy {
            free: crate::parse_amount("free", free)?,
            reserved: crate::parse_amount("reserved", reserved)?,
            misc_frozen: crate::parse_amount("miscFrozen", misc_frozen)?,
            fee_frozen: crate::parse_amount("feeFrozen", fee_frozen)?,
        })
    }

    /// Builds a current layout from decimal strings
    pub fn current(free: &str, reserved: &str, frozen: &str) -> Result<Self, ParseError> {
        Ok(AccountData::Current {
            free: crate::parse_amount("free", free)?,
            reserved: crate::parse_amount("reserved", reserved)?,
            frozen: crate::parse_amount("frozen", frozen)?,
        })
    }

    /// Layout tag
    pub fn variant(&self) -> AccountVariant {
        match self {
            AccountData::Legacy { .. } => AccountVariant::Legacy,
            AccountData::Current { .. } => AccountVariant::Current,
        }
    }

    /// Free balance
    pub fn free(&self) -> &BigUint {
        match self {
            AccountData::Legacy { free, .. } | AccountData::Current { free, .. } => free,
        }
    }

    /// Reserved balance
    pub fn reserved(&self) -> &BigUint {
        match self {
            AccountData::Legacy { reserved, .. } | AccountData::Current { reserved, .. } => reserved,
        }
    }
}

/// A decoded `system.account` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalanceSnapshot {
    /// Transaction count
    pub nonce: u64,
    /// Modules depending on this account's existence
    pub consumers: u32,
    /// Modules vouching for this account's existence
    pub providers: u32,
    /// Self-sufficient references
    pub sufficients: u32,
    /// Balance fields
    pub data: AccountData,
}

impl AccountBalanceSnapshot {
    /// Wraps account data with zeroed reference counts
    pub fn new(data: AccountData) -> Self {
        Self {
            nonce: 0,
            consumers: 0,
            providers: 0,
            sufficients: 0,
            data,
        }
    }

    /// Sets reference counts
    pub fn with_refs(mut self, consumers: u32, providers: u32) -> Self {
        self.consumers = consumers;
        self.providers = providers;
        self
    }

    /// Layout tag
    pub fn variant(&self) -> AccountVariant {
        self.data.variant()
    }

    /// Decodes a JSON-encoded `system.account` entry
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: RawAccountInfo = serde_json::from_str(json)?;
        Ok(Self::try_from(raw)?)
    }
}

/// `system.account` entry as delivered by an adapter, before layout detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountInfo {
    /// Transaction count
    #[serde(default)]
    pub nonce: u64,
    /// Consumer references
    #[serde(default)]
    pub consumers: u32,
    /// Provider references
    #[serde(default)]
    pub providers: u32,
    /// Sufficient references
    #[serde(default)]
    pub sufficients: u32,
    /// Balance fields
    #[serde(default)]
    pub data: RawAccountData,
}

/// Balance fields of a [`RawAccountInfo`]; absent amounts read as zero
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountData {
    /// Free balance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<RawAmount>,
    /// Reserved balance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<RawAmount>,
    /// Legacy misc lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc_frozen: Option<RawAmount>,
    /// Legacy fee lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_frozen: Option<RawAmount>,
    /// Consolidated lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen: Option<RawAmount>,
}

fn parse_or_zero(raw: &Option<RawAmount>, field: &str) -> Result<BigUint, ParseError> {
    match raw {
        Some(amount) => amount.parse(field),
        None => Ok(BigUint::zero()),
    }
}

impl TryFrom<RawAccountInfo> for AccountBalanceSnapshot {
    type Error = ParseError;

    fn try_from(raw: RawAccountInfo) -> Result<Self, Self::Error> {
        let d = &raw.data;
        let free = parse_or_zero(&d.free, "free")?;
        let reserved = parse_or_zero(&d.reserved, "reserved")?;

        let data = match (&d.misc_frozen, &d.fee_frozen) {
            (Some(misc), Some(fee)) => AccountData::Legacy {
                free,
                reserved,
                misc_frozen: misc.parse("miscFrozen")?,
                fee_frozen: fee.parse("feeFrozen")?,
            },
            _ => AccountData::Current {
                free,
                reserved,
                frozen: parse_or_zero(&d.frozen, "frozen")?,
            },
        };

        Ok(Self {
            nonce: raw.nonce,
            consumers: raw.consumers,
            providers: raw.providers,
            sufficients: raw.sufficients,
            data,
        })
    }
}

/// Signed balance entry of an Equilibrium-style account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignedBalance {
    /// Holding
    Positive(#[serde(with = "crate::amount::amount_string")] BigUint),
    /// Debt
    Negative(#[serde(with = "crate::amount::amount_string")] BigUint),
}

impl SignedBalance {
    /// The holding part; debts contribute nothing
    pub fn positive(&self) -> BigUint {
        match self {
            SignedBalance::Positive(v) => v.clone(),
            SignedBalance::Negative(_) => BigUint::zero(),
        }
    }
}

/// Equilibrium customizes the system account into a per-asset balance list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquilibriumAccount {
    /// `(asset id, signed balance)` pairs
    pub balances: Vec<(u64, SignedBalance)>,
}

#[derive(Deserialize)]
struct RawEqData {
    v0: RawEqV0,
}

#[derive(Deserialize)]
struct RawEqV0 {
    balance: Vec<(u64, SignedBalance)>,
}

impl EquilibriumAccount {
    /// Decodes the `{"v0": {"balance": [[id, {"positive": n}], ...]}}` shape
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: RawEqData = serde_json::from_str(json)?;
        Ok(Self {
            balances: raw.v0.balance,
        })
    }

    /// Holding for one asset id, zero when absent
    pub fn positive_for(&self, asset_id: u64) -> BigUint {
        self.balances
            .iter()
            .find(|(id, _)| *id == asset_id)
            .map(|(_, b)| b.positive())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_detected_when_both_buckets_present() {
        let json = r#"{"consumers":1,"providers":1,"data":{"free":"1000","reserved":"0","miscFrozen":"200","feeFrozen":"50"}}"#;
        let snap = AccountBalanceSnapshot::from_json(json).unwrap();
        assert_eq!(snap.variant(), AccountVariant::Legacy);
        assert_eq!(snap.consumers, 1);
        match snap.data {
            AccountData::Legacy { misc_frozen, fee_frozen, .. } => {
                assert_eq!(misc_frozen, BigUint::from(200u32));
                assert_eq!(fee_frozen, BigUint::from(50u32));
            }
            _ => panic!("expected legacy layout"),
        }
    }

    #[test]
    fn test_single_bucket_is_current() {
        // Only one of the legacy buckets present: not legacy
        let json = r#"{"data":{"free":"500","reserved":"100","miscFrozen":"7","frozen":"50"}}"#;
        let snap = AccountBalanceSnapshot::from_json(json).unwrap();
        assert_eq!(snap.variant(), AccountVariant::Current);
        assert_eq!(snap.data, AccountData::current("500", "100", "50").unwrap());
    }

    #[test]
    fn test_missing_amounts_read_as_zero() {
        let snap = AccountBalanceSnapshot::from_json(r#"{"data":{"free":"5"}}"#).unwrap();
        assert_eq!(snap.data, AccountData::current("5", "0", "0").unwrap());
    }

    #[test]
    fn test_hex_and_numbers_accepted() {
        let json = r#"{"data":{"free":"0x64","reserved":10,"frozen":"0"}}"#;
        let snap = AccountBalanceSnapshot::from_json(json).unwrap();
        assert_eq!(snap.data.free(), &BigUint::from(100u32));
        assert_eq!(snap.data.reserved(), &BigUint::from(10u32));
    }

    #[test]
    fn test_malformed_amount_is_parse_error() {
        let json = r#"{"data":{"free":"10","reserved":"abc","frozen":"0"}}"#;
        let err = AccountBalanceSnapshot::from_json(json).unwrap_err();
        match err {
            CoreError::Parse(e) => assert_eq!(e.field, "reserved"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_equilibrium_decode() {
        let json = r#"{"v0":{"balance":[[6450786,{"positive":"1500"}],[25969,{"negative":"20"}]]}}"#;
        let acc = EquilibriumAccount::from_json(json).unwrap();
        assert_eq!(acc.positive_for(6450786), BigUint::from(1500u32));
        assert_eq!(acc.positive_for(25969), BigUint::zero());
        assert_eq!(acc.positive_for(1), BigUint::zero());
    }
}
