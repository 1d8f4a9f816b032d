//! Summing balance items of one token across addresses.

use multiwallet_types::{ApiItemState, BalanceItem};
use num_bigint::BigUint;

/// Combines `items` into a single item under `address`.
///
/// `free` and `locked` are summed. The state is `NOT_SUPPORT` when every
/// input is unsupported, `READY` when any input is ready, otherwise
/// `PENDING`. Timestamps and lock breakdowns are not carried over.
pub fn group_balance(items: &[BalanceItem], address: &str, token_slug: &str) -> BalanceItem {
    let mut free = BigUint::default();
    let mut locked = BigUint::default();
    for item in items {
        free += &item.free;
        locked += &item.locked;
    }

    let state = if items.iter().all(|i| i.state == ApiItemState::NotSupport) {
        ApiItemState::NotSupport
    } else if items.iter().any(|i| i.state == ApiItemState::Ready) {
        ApiItemState::Ready
    } else {
        ApiItemState::Pending
    };

    BalanceItem::new(address, token_slug, free, locked).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(addr: &str, free: u32, locked: u32, state: ApiItemState) -> BalanceItem {
        BalanceItem::new(addr, "DOT", BigUint::from(free), BigUint::from(locked)).with_state(state)
    }

    #[test]
    fn test_sums_fields() {
        let items = vec![
            item("a", 100, 1, ApiItemState::Ready),
            item("b", 200, 2, ApiItemState::Ready),
        ];
        let grouped = group_balance(&items, "ALL", "DOT");
        assert_eq!(grouped.address, "ALL");
        assert_eq!(grouped.token_slug, "DOT");
        assert_eq!(grouped.free, BigUint::from(300u32));
        assert_eq!(grouped.locked, BigUint::from(3u32));
        assert_eq!(grouped.state, ApiItemState::Ready);
    }

    #[test]
    fn test_state_rule() {
        let unsupported = vec![
            item("a", 0, 0, ApiItemState::NotSupport),
            item("b", 0, 0, ApiItemState::NotSupport),
        ];
        assert_eq!(group_balance(&unsupported, "ALL", "DOT").state, ApiItemState::NotSupport);

        let mixed = vec![
            item("a", 0, 0, ApiItemState::NotSupport),
            item("b", 5, 0, ApiItemState::Ready),
        ];
        assert_eq!(group_balance(&mixed, "ALL", "DOT").state, ApiItemState::Ready);

        let waiting = vec![
            item("a", 0, 0, ApiItemState::Pending),
            item("b", 5, 0, ApiItemState::Cached),
        ];
        assert_eq!(group_balance(&waiting, "ALL", "DOT").state, ApiItemState::Pending);
    }
}
