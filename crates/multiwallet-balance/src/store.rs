//! Observable per-address, per-token balance map.
//!
//! The backing map is guarded by a mutex that is never held while
//! subscribers run: each publishing operation mutates under the lock, clones
//! the map, releases the lock and then hands the clone to the [`Subject`].
//! A subscriber may therefore call back into the store. The clone is stamped
//! under the same lock, so when writers race the newest map is the one that
//! stays published.

use crate::group::group_balance;
use multiwallet_types::{is_account_all, BalanceItem, BalanceMap, Subject, Subscription, ALL_ACCOUNT_KEY};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Authoritative balance state plus the synthetic `ALL` aggregate
#[derive(Debug)]
pub struct BalanceMapStore {
    map: Mutex<BalanceMap>,
    subject: Subject<BalanceMap>,
}

impl Default for BalanceMapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceMapStore {
    /// Empty store
    pub fn new() -> Self {
        Self::with_map(BalanceMap::new())
    }

    /// Store seeded with `map`; nothing is published
    pub fn with_map(map: BalanceMap) -> Self {
        Self {
            subject: Subject::new(map.clone()),
            map: Mutex::new(map),
        }
    }

    /// Copy of the current map
    pub fn map(&self) -> BalanceMap {
        self.map.lock().clone()
    }

    /// Single entry lookup
    pub fn get(&self, address: &str, token_slug: &str) -> Option<BalanceItem> {
        self.map.lock().get(address).and_then(|tokens| tokens.get(token_slug)).cloned()
    }

    /// Last published map. Lags [`map`](Self::map) after unpublished upserts.
    pub fn published(&self) -> BalanceMap {
        self.subject.value()
    }

    /// Registers a listener that receives the full map on every publish,
    /// starting with the last published one.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&BalanceMap) + Send + Sync + 'static,
    {
        self.subject.subscribe(listener)
    }

    /// Replaces the whole map
    pub fn set_all(&self, map: BalanceMap) {
        *self.map.lock() = map;
        self.publish();
    }

    /// Writes one item, creating its address entry if needed. Publishes only
    /// when `publish` is true so callers can batch.
    pub fn upsert_one(&self, item: BalanceItem, publish: bool) {
        Self::insert(&mut self.map.lock(), item);
        if publish {
            self.publish();
        }
    }

    /// Writes every item, optionally rebuilds the aggregate, then publishes once
    pub fn upsert_many<I>(&self, items: I, recompute_aggregate: bool)
    where
        I: IntoIterator<Item = BalanceItem>,
    {
        {
            let mut map = self.map.lock();
            let mut count = 0usize;
            for item in items {
                Self::insert(&mut map, item);
                count += 1;
            }
            if recompute_aggregate {
                Self::rebuild_aggregate(&mut map);
            }
            trace!(count, recompute_aggregate, "Upserted balance items");
        }
        self.publish();
    }

    /// Deletes every entry matching `predicate`. Emptied address entries stay.
    pub fn remove_where<P>(&self, predicate: P)
    where
        P: Fn(&BalanceItem) -> bool,
    {
        {
            let mut map = self.map.lock();
            for tokens in map.values_mut() {
                tokens.retain(|_, item| !predicate(item));
            }
        }
        self.publish();
    }

    /// Deletes by key.
    ///
    /// | addresses | token slugs | removes                              |
    /// |-----------|-------------|--------------------------------------|
    /// | some      | some        | every listed (address, slug) pair    |
    /// | some      | none        | the listed addresses entirely        |
    /// | none      | some        | the listed slugs under every address |
    /// | none      | none        | everything                           |
    pub fn remove_by_keys(&self, addresses: Option<&[String]>, token_slugs: Option<&[String]>) {
        {
            let mut map = self.map.lock();
            match (addresses, token_slugs) {
                (Some(addresses), Some(slugs)) => {
                    for address in addresses {
                        if let Some(tokens) = map.get_mut(address) {
                            for slug in slugs {
                                tokens.remove(slug);
                            }
                        }
                    }
                }
                (Some(addresses), None) => {
                    for address in addresses {
                        map.remove(address);
                    }
                }
                (None, Some(slugs)) => {
                    for tokens in map.values_mut() {
                        for slug in slugs {
                            tokens.remove(slug);
                        }
                    }
                }
                (None, None) => map.clear(),
            }
        }
        debug!(
            addresses = addresses.map(|a| a.len()),
            token_slugs = token_slugs.map(|t| t.len()),
            "Removed balance entries"
        );
        self.publish();
    }

    /// Rebuilds the `ALL` entry from every real address and publishes
    pub fn recompute_aggregate(&self) {
        Self::rebuild_aggregate(&mut self.map.lock());
        self.publish();
    }

    /// Publishes the current map as is
    pub fn publish(&self) {
        let (stamp, snapshot) = {
            let map = self.map.lock();
            (self.subject.stamp(), map.clone())
        };
        self.subject.next_stamped(stamp, snapshot);
    }

    fn insert(map: &mut BalanceMap, item: BalanceItem) {
        map.entry(item.address.clone())
            .or_default()
            .insert(item.token_slug.clone(), item);
    }

    fn rebuild_aggregate(map: &mut BalanceMap) {
        let mut by_token: BTreeMap<String, Vec<BalanceItem>> = BTreeMap::new();
        for (address, tokens) in map.iter() {
            if is_account_all(address) {
                continue;
            }
            for (slug, item) in tokens {
                by_token.entry(slug.clone()).or_default().push(item.clone());
            }
        }

        let aggregate = by_token
            .into_iter()
            .map(|(slug, items)| {
                let grouped = group_balance(&items, ALL_ACCOUNT_KEY, &slug);
                (slug, grouped)
            })
            .collect();

        map.insert(ALL_ACCOUNT_KEY.to_string(), aggregate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiwallet_testing::strategies::any_balance_items;
    use num_bigint::BigUint;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn item(addr: &str, slug: &str, free: u64) -> BalanceItem {
        BalanceItem::new(addr, slug, BigUint::from(free), BigUint::from(0u32))
    }

    fn seeded() -> BalanceMapStore {
        let store = BalanceMapStore::new();
        store.upsert_many(
            vec![
                item("addrA", "DOT", 100),
                item("addrB", "DOT", 200),
                item("addrA", "KSM", 7),
            ],
            false,
        );
        store
    }

    fn counting(store: &BalanceMapStore) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = store.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, sub)
    }

    #[test]
    fn test_aggregate_sums_real_addresses() {
        let store = seeded();
        store.recompute_aggregate();

        let all = store.get(ALL_ACCOUNT_KEY, "DOT").unwrap();
        assert_eq!(all.free.to_string(), "300");
        assert_eq!(store.get(ALL_ACCOUNT_KEY, "KSM").unwrap().free.to_string(), "7");
    }

    #[test]
    fn test_aggregate_ignores_stale_all_entry() {
        let store = seeded();
        store.upsert_one(item(ALL_ACCOUNT_KEY, "DOT", u64::MAX), false);
        store.recompute_aggregate();
        assert_eq!(store.get(ALL_ACCOUNT_KEY, "DOT").unwrap().free.to_string(), "300");
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let store = seeded();
        store.recompute_aggregate();
        let first = store.map().get(ALL_ACCOUNT_KEY).cloned();
        store.recompute_aggregate();
        assert_eq!(store.map().get(ALL_ACCOUNT_KEY).cloned(), first);
    }

    #[test]
    fn test_remove_by_addresses_only() {
        let store = seeded();
        store.remove_by_keys(Some(&["addrA".to_string()][..]), None);
        let map = store.map();
        assert!(!map.contains_key("addrA"));
        assert_eq!(map["addrB"]["DOT"].free.to_string(), "200");
    }

    #[test]
    fn test_remove_by_keys_dispatch() {
        let store = seeded();
        store.remove_by_keys(Some(&["addrA".to_string()][..]), Some(&["DOT".to_string()][..]));
        assert!(store.get("addrA", "DOT").is_none());
        assert!(store.get("addrA", "KSM").is_some());
        assert!(store.get("addrB", "DOT").is_some());

        let store = seeded();
        store.remove_by_keys(None, Some(&["DOT".to_string()][..]));
        assert!(store.get("addrA", "DOT").is_none());
        assert!(store.get("addrB", "DOT").is_none());
        assert!(store.get("addrA", "KSM").is_some());
        // addrB keeps an empty sub-map
        assert!(store.map()["addrB"].is_empty());

        let store = seeded();
        store.remove_by_keys(None, None);
        assert!(store.map().is_empty());
    }

    #[test]
    fn test_remove_where_leaves_empty_sub_maps() {
        let store = seeded();
        store.remove_where(|i| i.token_slug == "DOT");
        let map = store.map();
        assert!(map["addrB"].is_empty());
        assert_eq!(map["addrA"].len(), 1);
    }

    #[test]
    fn test_upsert_one_publish_flag() {
        let store = BalanceMapStore::new();
        let (hits, _sub) = counting(&store);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        store.upsert_one(item("addrA", "DOT", 1), false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(store.published().is_empty());
        assert!(store.get("addrA", "DOT").is_some());

        store.upsert_one(item("addrA", "DOT", 2), true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(store.published()["addrA"]["DOT"].free.to_string(), "2");
    }

    #[test]
    fn test_upsert_many_publishes_once() {
        let store = BalanceMapStore::new();
        let (hits, _sub) = counting(&store);
        store.upsert_many(vec![item("a", "DOT", 1), item("b", "DOT", 2)], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(store.published()[ALL_ACCOUNT_KEY]["DOT"].free.to_string(), "3");
    }

    #[test]
    fn test_subscribers_get_full_map() {
        let store = seeded();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = store.subscribe(move |map| s.lock().push(map.len()));
        store.set_all(BalanceMap::new());
        assert_eq!(*seen.lock(), vec![2, 0]);
    }

    #[test]
    fn test_nested_mutation_from_subscriber() {
        let store = Arc::new(BalanceMapStore::new());
        let inner = Arc::clone(&store);
        let _sub = store.subscribe(move |map| {
            let has_item = map.get("addrA").map(|t| t.contains_key("DOT")).unwrap_or(false);
            let has_aggregate = map.contains_key(ALL_ACCOUNT_KEY);
            if has_item && !has_aggregate {
                inner.recompute_aggregate();
            }
        });

        store.upsert_one(item("addrA", "DOT", 5), true);
        assert_eq!(store.published()[ALL_ACCOUNT_KEY]["DOT"].free.to_string(), "5");
    }

    #[test]
    fn test_parallel_writers_leave_latest_map_published() {
        let store = Arc::new(BalanceMapStore::new());
        let delivered = Arc::new(Mutex::new(BalanceMap::new()));
        let d = Arc::clone(&delivered);
        let _sub = store.subscribe(move |map| *d.lock() = map.clone());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        store.upsert_one(item(&format!("addr{t}"), "DOT", n), true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.published(), store.map());
        assert_eq!(*delivered.lock(), store.map());
        assert_eq!(store.map().len(), 8);
    }

    proptest! {
        #[test]
        fn prop_aggregate_matches_sum(items in any_balance_items()) {
            let store = BalanceMapStore::new();
            store.upsert_many(items, true);
            let map = store.map();

            let all = map.get(ALL_ACCOUNT_KEY).cloned().unwrap_or_default();
            for (slug, aggregated) in &all {
                let expected: BigUint = map
                    .iter()
                    .filter(|(addr, _)| !is_account_all(addr))
                    .filter_map(|(_, tokens)| tokens.get(slug))
                    .map(|i| i.free.clone())
                    .sum();
                prop_assert_eq!(&aggregated.free, &expected);
            }

            store.recompute_aggregate();
            prop_assert_eq!(store.map().get(ALL_ACCOUNT_KEY).cloned().unwrap_or_default(), all);
        }
    }
}
