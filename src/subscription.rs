//! Subscription index: status callbacks keyed by cache key and exact interval.
//!
//! Each cache key owns a small interval tree of `(start, end)` entries. All
//! subscribers for an identical interval share one entry. A mutation to any
//! interval of a key is fanned out by searching the tree for overlaps, not
//! by exact lookup.

use crate::classify::Status;
use crate::interval::{Interval, IntervalOps};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

/// Callback invoked with a freshly computed status.
pub type StatusCallback = Arc<dyn Fn(Status) + Send + Sync>;

/// Identifies one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry<P> {
    interval: Interval<P>,
    callbacks: Vec<(SubscriptionId, StatusCallback)>,
}

impl<P: Clone> Entry<P> {
    fn snapshot(&self) -> (Interval<P>, Vec<StatusCallback>) {
        let callbacks = self.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        (self.interval.clone(), callbacks)
    }
}

/// Entries for one key, sorted by `(start, end)`.
///
/// Overlap search binary-searches the first entry starting past the query
/// and scans the prefix, so cost grows with the number of entries starting
/// before the query's end.
struct IntervalTree<P> {
    entries: Vec<Entry<P>>,
}

impl<P: Clone> IntervalTree<P> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn locate(&self, ops: &IntervalOps<P>, interval: &Interval<P>) -> Result<usize, usize> {
        self.entries.binary_search_by(|entry| ops.compare(&entry.interval, interval))
    }

    fn insert(
        &mut self,
        ops: &IntervalOps<P>,
        interval: Interval<P>,
        id: SubscriptionId,
        callback: StatusCallback,
    ) {
        match self.locate(ops, &interval) {
            Ok(idx) => self.entries[idx].callbacks.push((id, callback)),
            Err(idx) => self.entries.insert(
                idx,
                Entry {
                    interval,
                    callbacks: vec![(id, callback)],
                },
            ),
        }
    }

    fn remove(&mut self, ops: &IntervalOps<P>, interval: &Interval<P>, id: SubscriptionId) -> bool {
        let Ok(idx) = self.locate(ops, interval) else {
            return false;
        };

        let entry = &mut self.entries[idx];
        let before = entry.callbacks.len();
        entry.callbacks.retain(|(existing, _)| *existing != id);
        let removed = entry.callbacks.len() != before;

        if entry.callbacks.is_empty() {
            self.entries.remove(idx);
        }
        removed
    }

    fn search(
        &self,
        ops: &IntervalOps<P>,
        query: &Interval<P>,
    ) -> Vec<(Interval<P>, Vec<StatusCallback>)> {
        let order = ops.order();
        let candidates = self.entries.partition_point(|entry| {
            order.compare(&entry.interval.start, &query.end) != Ordering::Greater
        });

        self.entries[..candidates]
            .iter()
            .filter(|entry| order.greater_or_equal(&entry.interval.end, &query.start))
            .map(Entry::snapshot)
            .collect()
    }

    fn all(&self) -> Vec<(Interval<P>, Vec<StatusCallback>)> {
        self.entries.iter().map(Entry::snapshot).collect()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps each cache key to its interval tree of subscriptions.
pub struct SubscriptionIndex<P, K> {
    ops: IntervalOps<P>,
    trees: FxHashMap<K, IntervalTree<P>>,
    next_id: u64,
}

impl<P, K> SubscriptionIndex<P, K>
where
    P: Clone,
    K: Hash + Eq + Clone,
{
    pub fn new(ops: IntervalOps<P>) -> Self {
        Self {
            ops,
            trees: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// Register a callback for `interval` under `key`.
    pub fn insert(
        &mut self,
        key: &K,
        interval: Interval<P>,
        callback: StatusCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.trees
            .entry(key.clone())
            .or_insert_with(IntervalTree::new)
            .insert(&self.ops, interval, id, callback);
        id
    }

    /// Remove one callback. The entry goes away with its last callback, and
    /// the key's tree with its last entry.
    pub fn remove(&mut self, key: &K, interval: &Interval<P>, id: SubscriptionId) -> bool {
        let Some(tree) = self.trees.get_mut(key) else {
            return false;
        };

        let removed = tree.remove(&self.ops, interval, id);
        if tree.is_empty() {
            self.trees.remove(key);
        }
        removed
    }

    /// Entries under `key` overlapping `query`, touching included.
    pub fn search(&self, key: &K, query: &Interval<P>) -> Vec<(Interval<P>, Vec<StatusCallback>)> {
        self.trees
            .get(key)
            .map(|tree| tree.search(&self.ops, query))
            .unwrap_or_default()
    }

    /// Every entry registered under `key`.
    pub fn entries_for(&self, key: &K) -> Vec<(Interval<P>, Vec<StatusCallback>)> {
        self.trees.get(key).map(IntervalTree::all).unwrap_or_default()
    }

    /// Keys with at least one subscription.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.trees.keys()
    }

    /// Total number of distinct `(key, interval)` entries.
    pub fn len(&self) -> usize {
        self.trees.values().map(|tree| tree.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
