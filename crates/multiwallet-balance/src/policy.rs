//! Strict-mode policy table.
//!
//! Strict mode withholds the existential deposit from the transferable
//! amount regardless of whether the chain could reap the account. It is on
//! unless an override is registered for the extrinsic hint.

use multiwallet_types::{AccountVariant, ExtrinsicType};
use std::collections::HashMap;

/// Maps `(account variant, extrinsic hint)` to a strict-mode flag
#[derive(Debug, Clone)]
pub struct StrictModePolicy {
    overrides: HashMap<(Option<AccountVariant>, ExtrinsicType), bool>,
}

impl Default for StrictModePolicy {
    /// Native transfers may spend down to the reap threshold
    fn default() -> Self {
        Self::strict_only().with_override(None, ExtrinsicType::TransferBalance, false)
    }
}

impl StrictModePolicy {
    /// Policy without overrides: always strict
    pub fn strict_only() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Registers an override. `variant = None` applies to both layouts; a
    /// variant-specific entry wins over it.
    pub fn with_override(mut self, variant: Option<AccountVariant>, hint: ExtrinsicType, strict: bool) -> Self {
        self.overrides.insert((variant, hint), strict);
        self
    }

    /// Resolves the flag. Missing hints and unregistered hints are strict.
    pub fn resolve(&self, variant: AccountVariant, hint: Option<ExtrinsicType>) -> bool {
        let Some(hint) = hint else {
            return true;
        };

        self.overrides
            .get(&(Some(variant), hint))
            .or_else(|| self.overrides.get(&(None, hint)))
            .copied()
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hint_is_strict() {
        let policy = StrictModePolicy::default();
        assert!(policy.resolve(AccountVariant::Current, None));
        assert!(policy.resolve(AccountVariant::Legacy, None));
    }

    #[test]
    fn test_unregistered_hint_is_strict() {
        let policy = StrictModePolicy::default();
        assert!(policy.resolve(AccountVariant::Current, Some(ExtrinsicType::StakingBond)));
        assert!(policy.resolve(AccountVariant::Legacy, Some(ExtrinsicType::TransferXcm)));
    }

    #[test]
    fn test_default_native_transfer_override() {
        let policy = StrictModePolicy::default();
        assert!(!policy.resolve(AccountVariant::Current, Some(ExtrinsicType::TransferBalance)));
        assert!(!policy.resolve(AccountVariant::Legacy, Some(ExtrinsicType::TransferBalance)));
    }

    #[test]
    fn test_variant_specific_override_wins() {
        let policy = StrictModePolicy::default()
            .with_override(Some(AccountVariant::Legacy), ExtrinsicType::TransferBalance, true);
        assert!(policy.resolve(AccountVariant::Legacy, Some(ExtrinsicType::TransferBalance)));
        assert!(!policy.resolve(AccountVariant::Current, Some(ExtrinsicType::TransferBalance)));
    }

    #[test]
    fn test_strict_only() {
        let policy = StrictModePolicy::strict_only();
        assert!(policy.resolve(AccountVariant::Current, Some(ExtrinsicType::TransferBalance)));
    }
}
