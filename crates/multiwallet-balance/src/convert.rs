//! Building [`BalanceItem`]s from decoded chain data.

use crate::group::group_balance;
use multiwallet_types::{AccountBalanceSnapshot, AccountData, BalanceItem, EquilibriumAccount, SubstrateInfo};
use num_bigint::BigUint;
use num_traits::Zero;

/// Native-token item for one account.
///
/// `locked` is `reserved` plus the misc (or consolidated) lock, and pooled
/// stake counts towards both the total and the locked part. `free` is what
/// remains of the total, floored at zero.
pub fn balance_item_from_snapshot(
    address: &str,
    token_slug: &str,
    snapshot: &AccountBalanceSnapshot,
    pooled_stake: Option<&BigUint>,
) -> BalanceItem {
    let (misc_frozen, fee_frozen) = match &snapshot.data {
        AccountData::Legacy {
            misc_frozen, fee_frozen, ..
        } => (misc_frozen.clone(), fee_frozen.clone()),
        AccountData::Current { frozen, .. } => (frozen.clone(), BigUint::zero()),
    };
    let reserved = snapshot.data.reserved().clone();
    let pooled = pooled_stake.cloned().unwrap_or_default();

    let total = snapshot.data.free() + &reserved + &pooled;
    let locked = &reserved + &misc_frozen + &pooled;
    let free = if total > locked { &total - &locked } else { BigUint::zero() };

    let mut item = BalanceItem::new(address, token_slug, free, locked);
    item.substrate_info = Some(SubstrateInfo {
        reserved,
        misc_frozen,
        fee_frozen,
    });
    item
}

/// Equilibrium token item: the positive holdings of `asset_id` summed over
/// `accounts`. Equilibrium reports no locks.
pub fn equilibrium_balance_item(
    address: &str,
    token_slug: &str,
    asset_id: u64,
    accounts: &[EquilibriumAccount],
) -> BalanceItem {
    let per_account: Vec<BalanceItem> = accounts
        .iter()
        .map(|acc| BalanceItem::new(address, token_slug, acc.positive_for(asset_id), BigUint::zero()))
        .collect();

    if per_account.is_empty() {
        return BalanceItem::new(address, token_slug, BigUint::zero(), BigUint::zero());
    }
    group_balance(&per_account, address, token_slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiwallet_types::ApiItemState;

    #[test]
    fn test_legacy_item() {
        let snap = AccountBalanceSnapshot::new(AccountData::legacy("1000", "100", "200", "50").unwrap());
        let item = balance_item_from_snapshot("addrA", "polkadot-NATIVE-DOT", &snap, None);
        // total 1100, locked 100 + 200
        assert_eq!(item.locked, BigUint::from(300u32));
        assert_eq!(item.free, BigUint::from(800u32));
        assert_eq!(item.state, ApiItemState::Ready);
        let info = item.substrate_info.unwrap();
        assert_eq!(info.misc_frozen, BigUint::from(200u32));
        assert_eq!(info.fee_frozen, BigUint::from(50u32));
    }

    #[test]
    fn test_current_item_with_pool() {
        let snap = AccountBalanceSnapshot::new(AccountData::current("500", "100", "50").unwrap());
        let pooled = BigUint::from(25u32);
        let item = balance_item_from_snapshot("addrA", "DOT", &snap, Some(&pooled));
        assert_eq!(item.total(), BigUint::from(625u32));
        assert_eq!(item.locked, BigUint::from(175u32));
        assert_eq!(item.free, BigUint::from(450u32));
        assert_eq!(item.substrate_info.unwrap().fee_frozen, BigUint::zero());
    }

    #[test]
    fn test_lock_exceeding_total_floors_free() {
        let snap = AccountBalanceSnapshot::new(AccountData::current("10", "0", "500").unwrap());
        let item = balance_item_from_snapshot("addrA", "DOT", &snap, None);
        assert_eq!(item.free, BigUint::zero());
        assert_eq!(item.locked, BigUint::from(500u32));
    }

    #[test]
    fn test_equilibrium_item() {
        let a = EquilibriumAccount::from_json(r#"{"v0":{"balance":[[25969,{"positive":"100"}]]}}"#).unwrap();
        let b = EquilibriumAccount::from_json(r#"{"v0":{"balance":[[25969,{"negative":"7"}],[1,{"positive":"9"}]]}}"#)
            .unwrap();
        let item = equilibrium_balance_item("addrA", "equilibrium-NATIVE-EQ", 25969, &[a, b]);
        assert_eq!(item.free, BigUint::from(100u32));
        assert_eq!(item.locked, BigUint::zero());

        let empty = equilibrium_balance_item("addrA", "equilibrium-NATIVE-EQ", 25969, &[]);
        assert_eq!(empty.free, BigUint::zero());
    }
}
