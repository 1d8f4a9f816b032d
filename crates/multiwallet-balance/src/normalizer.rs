//! Canonical transferable/total figures from raw account snapshots.
//!
//! Every function here is pure. Inputs arrive either as decoded
//! [`AccountBalanceSnapshot`]s or, for the existential deposit, as a
//! decimal string; a malformed string is a [`ParseError`], never zero.

use crate::policy::StrictModePolicy;
use multiwallet_error::ParseError;
use multiwallet_types::{parse_amount, AccountBalanceSnapshot, AccountData, ExtrinsicType};
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

/// Amount held back by locks.
///
/// On consolidated runtimes `frozen` overlaps `reserved`, so the lock is
/// `frozen - reserved` and may be negative. Legacy buckets are gross amounts.
pub fn compute_locked(data: &AccountData) -> BigInt {
    match data {
        AccountData::Legacy {
            misc_frozen, fee_frozen, ..
        } => BigInt::from(misc_frozen.max(fee_frozen).clone()),
        AccountData::Current { reserved, frozen, .. } => {
            BigInt::from(frozen.clone()) - BigInt::from(reserved.clone())
        }
    }
}

/// Existential deposit withheld from the transferable amount
pub fn compute_applied_ed(snapshot: &AccountBalanceSnapshot, existential_deposit: &BigUint, strict: bool) -> BigUint {
    if strict || !is_reapable(snapshot) {
        existential_deposit.clone()
    } else {
        BigUint::zero()
    }
}

/// `max(free - max(locked, applied ED), 0)` with an explicit strict flag
pub fn transferable(snapshot: &AccountBalanceSnapshot, existential_deposit: &BigUint, strict: bool) -> BigUint {
    let locked = compute_locked(&snapshot.data);
    let applied_ed = BigInt::from(compute_applied_ed(snapshot, existential_deposit, strict));
    let free = BigInt::from(snapshot.data.free().clone());

    (free - locked.max(applied_ed)).to_biguint().unwrap_or_default()
}

/// Transferable balance with the strict flag resolved through `policy`
pub fn compute_transferable_with_policy(
    snapshot: &AccountBalanceSnapshot,
    existential_deposit: &str,
    hint: Option<ExtrinsicType>,
    policy: &StrictModePolicy,
) -> Result<BigUint, ParseError> {
    let ed = parse_amount("existentialDeposit", existential_deposit)?;
    let strict = policy.resolve(snapshot.variant(), hint);
    Ok(transferable(snapshot, &ed, strict))
}

/// Transferable balance under the default [`StrictModePolicy`]
pub fn compute_transferable(
    snapshot: &AccountBalanceSnapshot,
    existential_deposit: &str,
    hint: Option<ExtrinsicType>,
) -> Result<BigUint, ParseError> {
    compute_transferable_with_policy(snapshot, existential_deposit, hint, &StrictModePolicy::default())
}

/// `free + reserved`; locks are still owned funds
pub fn compute_total_balance(snapshot: &AccountBalanceSnapshot) -> BigUint {
    snapshot.data.free() + snapshot.data.reserved()
}

/// No module depends on the account, so the chain may prune it
pub fn is_reapable(snapshot: &AccountBalanceSnapshot) -> bool {
    snapshot.consumers == 0
}

/// Neither consumer nor provider references are held.
///
/// Kept as the literal `providers == 0 && consumers == 0`.
pub fn is_active(snapshot: &AccountBalanceSnapshot) -> bool {
    snapshot.providers == 0 && snapshot.consumers == 0
}
