//! Coalescing orchestrator.
//!
//! [`RangeCache`] turns a requested interval into the smallest set of loader
//! calls that, together with what is already resident or in flight, covers
//! it. Per key it tracks four interval sets (loaded, partial, failed and the
//! in-flight loads that make up pending), one sorted value index, and one
//! exact-interval record per distinct request.
//!
//! All per-key state sits behind a single mutex. The lock is never held
//! across an await, never while a loader is invoked, and never while a
//! status callback runs.
//!
//! Status delivery is serialized by a second, reentrant lock that is taken
//! before the status is computed and held until every callback has run, so
//! a subscriber never sees an older status after a newer one.
//!
//! # Example
//!
//! ```rust,no_run
//! use rangecache::prelude::*;
//!
//! # async fn demo() -> rangecache::Result<()> {
//! let cache = RangeCache::new(
//!     PointOrder::new(|a: &i64, b: &i64| a - b),
//!     |line: &i64| *line,
//!     |start: i64, end: i64, _file: String, _ctx: LoadContext| async move {
//!         Ok::<_, LoadError>((start..=end).collect())
//!     },
//! );
//!
//! let lines = cache.read_async(10, 20, "app.log".to_string()).await?;
//! assert_eq!(lines.len(), 11);
//! # Ok(())
//! # }
//! ```

mod load;
mod record;
mod state;

pub use load::{CancellationToken, LoadContext, Loader};
pub use record::{LoadOutcome, RecordHandle};

use crate::classify::{classify, CachedIntervals, Classification, Status};
use crate::config::CacheConfig;
use crate::error::{CacheError, LoadError, Result};
use crate::index::{PointIndex, Slice};
use crate::interval::{Interval, IntervalOps};
use crate::point::PointOrder;
use crate::subscription::{StatusCallback, SubscriptionIndex};
use futures::future::{self, Either};
use futures::FutureExt;
use load::{InFlightLoad, LoadHandle, LoadSettlement};
use parking_lot::{Mutex, ReentrantMutex};
use record::{Record, RecordState, Settlement};
use state::{KeyId, KeyState, KeyTable};
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Counters describing the cache's current footprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Keys with live state.
    pub keys: usize,
    /// Exact-interval records across all keys.
    pub records: usize,
    /// Sub-interval loads currently outstanding.
    pub in_flight: usize,
    /// Loader invocations since the cache was created.
    pub loader_calls: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Keys: {}, Records: {}, In-flight: {}, Loader calls: {}",
            self.keys, self.records, self.in_flight, self.loader_calls
        )
    }
}

/// Keeps a status callback registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct Table<P, V, K> {
    keys: KeyTable<K, KeyState<P, V>>,
    subscriptions: SubscriptionIndex<P, K>,
}

impl<P: Clone, V, K: Hash + Eq + Clone> Table<P, V, K> {
    fn status_of(&self, ops: &IntervalOps<P>, key: &K, interval: &Interval<P>) -> Status {
        match self.keys.get(key) {
            Some(state) => {
                Status::from_classification(&classify(ops, &state.intervals(ops), interval))
            }
            None => Status::NotFound,
        }
    }

    /// Pair each subscription entry with its freshly computed status.
    fn statuses(
        &self,
        ops: &IntervalOps<P>,
        key: &K,
        entries: Vec<(Interval<P>, Vec<StatusCallback>)>,
    ) -> Vec<(Status, Vec<StatusCallback>)> {
        entries
            .into_iter()
            .map(|(interval, callbacks)| (self.status_of(ops, key, &interval), callbacks))
            .collect()
    }
}

struct Inner<P, V, K> {
    config: CacheConfig,
    ops: IntervalOps<P>,
    index: PointIndex<P, V>,
    loader: Arc<dyn Loader<P, V, K>>,
    table: Mutex<Table<P, V, K>>,
    /// Held from status computation through callback delivery.
    delivery: ReentrantMutex<()>,
    loader_calls: AtomicU64,
    next_id: AtomicU64,
}

/// A coalescing cache of range-indexed values.
///
/// `P` is the point type, `V` the value type (positioned by a `point_of`
/// projection), and `K` the key that selects an independent data source,
/// e.g. a file name or query parameters.
///
/// Cloning is cheap and yields a handle to the same cache.
pub struct RangeCache<P, V, K> {
    inner: Arc<Inner<P, V, K>>,
}

impl<P, V, K> Clone for RangeCache<P, V, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, V, K> fmt::Debug for RangeCache<P, V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeCache")
            .field("label", &self.inner.config.label)
            .finish_non_exhaustive()
    }
}

impl<P, V, K> RangeCache<P, V, K>
where
    P: Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    K: Clone + Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    pub fn new<F, L>(order: PointOrder<P>, point_of: F, loader: L) -> Self
    where
        F: Fn(&V) -> P + Send + Sync + 'static,
        L: Loader<P, V, K> + 'static,
    {
        Self::with_config(CacheConfig::default(), order, point_of, loader)
    }

    pub fn with_config<F, L>(
        config: CacheConfig,
        order: PointOrder<P>,
        point_of: F,
        loader: L,
    ) -> Self
    where
        F: Fn(&V) -> P + Send + Sync + 'static,
        L: Loader<P, V, K> + 'static,
    {
        let ops = IntervalOps::new(order.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                index: PointIndex::new(order, point_of),
                loader: Arc::new(loader),
                table: Mutex::new(Table {
                    keys: KeyTable::new(),
                    subscriptions: SubscriptionIndex::new(ops.clone()),
                }),
                delivery: ReentrantMutex::new(()),
                ops,
                loader_calls: AtomicU64::new(0),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Look up or start the request for exactly `[start, end]` under `params`.
    ///
    /// Never blocks. A request seen before returns its memoized outcome (the
    /// same handle while it is still loading). A new request is classified
    /// against the key's state and either answered from the index, rejected
    /// as poisoned, or turned into loads for its missing pieces.
    pub fn read(&self, start: P, end: P, params: K) -> LoadOutcome<V> {
        self.inner.read(start, end, params)
    }

    /// Future-returning form of [`read`](Self::read).
    ///
    /// The request is created before this returns, so two calls made back to
    /// back coalesce even if neither future has been polled yet.
    pub fn read_async(
        &self,
        start: P,
        end: P,
        params: K,
    ) -> impl Future<Output = Result<Slice<V>>> + Send + 'static {
        self.inner.read(start, end, params).into_result()
    }

    pub fn status(&self, start: P, end: P, params: K) -> Status {
        if self.inner.ops.order().greater_than(&start, &end) {
            return Status::Rejected;
        }
        let interval = Interval::new(start, end);
        self.inner.table.lock().status_of(&self.inner.ops, &params, &interval)
    }

    /// Values for `[start, end]` if they can be served right now.
    ///
    /// An exact request made earlier answers with its own result. Otherwise
    /// the value index is used when the interval is fully loaded and does not
    /// touch a failed region.
    pub fn get_value(&self, start: P, end: P, params: K) -> Result<Slice<V>> {
        let inner = &*self.inner;
        let ops = &inner.ops;
        let Some(interval) = ops.checked(start.clone(), end.clone()) else {
            return Err(CacheError::invalid_interval(&start, &end));
        };

        let table = inner.table.lock();
        let Some(state) = table.keys.get(&params) else {
            return Err(CacheError::no_record(&interval.start, &interval.end));
        };

        if let Ok(pos) = state.find_record(ops, &interval) {
            return match &state.records[pos].state {
                RecordState::Pending(_) => Err(CacheError::pending(&interval.start, &interval.end)),
                RecordState::Resolved(slice) => Ok(slice.clone()),
                RecordState::Rejected(err) => Err(err.clone()),
            };
        }

        let classification = classify(ops, &state.intervals(ops), &interval);
        if !classification.pending.is_empty() {
            Err(CacheError::pending(&interval.start, &interval.end))
        } else if classification.contains_failed_results {
            Err(CacheError::poisoned(&interval.start, &interval.end))
        } else if !classification.missing.is_empty() {
            Err(CacheError::no_record(&interval.start, &interval.end))
        } else {
            let values = state.values.slice(&interval.start, &interval.end).to_vec();
            Ok(Slice::new(values, classification.contains_partial_results))
        }
    }

    /// Probe form of [`get_value`](Self::get_value).
    pub fn get_value_if_cached(&self, start: P, end: P, params: K) -> Option<Slice<V>> {
        self.get_value(start, end, params).ok()
    }

    /// Cancel every in-flight load under `params`.
    ///
    /// Pending records for the key are discarded and their awaiters see
    /// [`CacheError::Aborted`]. Loaded, partial and failed history is kept.
    /// Returns whether any load or pending record was discarded.
    pub fn abort(&self, params: K) -> bool {
        let inner = &*self.inner;
        let (loads, dropped) = {
            let mut table = inner.table.lock();
            let Some(state) = table.keys.get_mut(&params) else {
                return false;
            };
            let loads = std::mem::take(&mut state.loads);
            let before = state.records.len();
            state.records.retain(|record| !record.state.is_pending());
            (loads, before - state.records.len())
        };

        for load in &loads {
            load.token.cancel();
        }
        debug!(
            cache = %inner.config.label,
            key = ?params,
            loads = loads.len(),
            records = dropped,
            "aborted in-flight loads"
        );

        inner.notify_all(&params);
        !loads.is_empty() || dropped > 0
    }

    /// Drop everything known about `params` and cancel its loads.
    pub fn evict(&self, params: K) {
        let inner = &*self.inner;
        let Some(state) = inner.table.lock().keys.remove(&params) else {
            return;
        };

        for load in &state.loads {
            load.token.cancel();
        }
        debug!(
            cache = %inner.config.label,
            key = ?params,
            values = state.values.len(),
            "evicted key"
        );

        inner.notify_all(&params);
    }

    /// Drop every key.
    pub fn evict_all(&self) {
        let inner = &*self.inner;
        let (drained, subscribed) = {
            let mut table = inner.table.lock();
            let drained = table.keys.drain();
            let subscribed: Vec<K> = table.subscriptions.keys().cloned().collect();
            (drained, subscribed)
        };

        for (_, state) in &drained {
            for load in &state.loads {
                load.token.cancel();
            }
        }
        debug!(cache = %inner.config.label, keys = drained.len(), "evicted all keys");

        for key in &subscribed {
            inner.notify_all(key);
        }
    }

    /// Call `callback` with the status of `[start, end]` now and after every
    /// change under `params` that overlaps it.
    pub fn subscribe_to_status<F>(&self, callback: F, start: P, end: P, params: K) -> Subscription
    where
        F: Fn(Status) + Send + Sync + 'static,
    {
        let inner = &*self.inner;
        let callback: StatusCallback = Arc::new(callback);
        let interval = Interval::new(start, end);

        let ordered = inner.delivery.lock();
        let (id, status) = {
            let mut table = inner.table.lock();
            let id = table
                .subscriptions
                .insert(&params, interval.clone(), Arc::clone(&callback));
            (id, table.status_of(&inner.ops, &params, &interval))
        };
        callback(status);
        drop(ordered);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.table.lock().subscriptions.remove(&params, &interval, id);
            }
        })
    }

    /// Snapshot of the interval sets tracked for `params`.
    pub fn intervals(&self, params: K) -> CachedIntervals<P> {
        let inner = &*self.inner;
        let table = inner.table.lock();
        table
            .keys
            .get(&params)
            .map(|state| state.intervals(&inner.ops))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = &*self.inner;
        let table = inner.table.lock();
        let mut stats = CacheStats {
            keys: table.keys.len(),
            loader_calls: inner.loader_calls.load(Ordering::Relaxed),
            ..Default::default()
        };
        for state in table.keys.values() {
            stats.records += state.records.len();
            stats.in_flight += state.loads.len();
        }
        stats
    }
}

impl<P, V, K> Inner<P, V, K>
where
    P: Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    K: Clone + Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn read(self: &Arc<Self>, start: P, end: P, params: K) -> LoadOutcome<V> {
        let ops = &self.ops;
        if ops.order().greater_than(&start, &end) {
            return LoadOutcome::Rejected(CacheError::invalid_interval(&start, &end));
        }
        let interval = Interval::new(start, end);

        let outcome = {
            let mut table = self.table.lock();
            let (key_id, state) = table
                .keys
                .get_or_insert_with(&params, || KeyState::new(self.index.clone()));

            if let Ok(pos) = state.find_record(ops, &interval) {
                return state.records[pos].state.outcome();
            }

            let record_id = self.next_id();
            let classification = classify(ops, &state.intervals(ops), &interval);
            trace!(
                cache = %self.config.label,
                key = ?params,
                start = ?interval.start,
                end = ?interval.end,
                missing = classification.missing.len(),
                pending = classification.pending.len(),
                "classified request"
            );

            let record_state = if self.is_poisoned(&state.failed, &classification) {
                warn!(
                    cache = %self.config.label,
                    key = ?params,
                    start = ?interval.start,
                    end = ?interval.end,
                    "request re-covers a failed load; rejecting without loading"
                );
                RecordState::Rejected(CacheError::poisoned(&interval.start, &interval.end))
            } else if classification.is_resolved() {
                let values = state.values.slice(&interval.start, &interval.end).to_vec();
                RecordState::Resolved(Slice::new(values, classification.contains_partial_results))
            } else {
                let handle = self.start_request(
                    key_id,
                    state,
                    &params,
                    &interval,
                    &classification,
                    record_id,
                );
                RecordState::Pending(handle)
            };

            let outcome = record_state.outcome();
            state.insert_record(
                ops,
                Record {
                    id: record_id,
                    interval: interval.clone(),
                    state: record_state,
                },
            );
            outcome
        };

        if let LoadOutcome::Pending(handle) = &outcome {
            if self.config.eager {
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(handle.shared());
                }
            }
        }

        self.notify(&params, &interval);
        outcome
    }

    /// A missing piece nested with a failed interval, in either direction,
    /// is not retried until the key is evicted.
    fn is_poisoned(&self, failed: &[Interval<P>], classification: &Classification<P>) -> bool {
        classification.missing.iter().any(|missing| {
            failed
                .iter()
                .any(|f| self.ops.contains(f, missing) || self.ops.contains(missing, f))
        })
    }

    /// Start loads for the missing pieces, join the in-flight loads covering
    /// the pending ones, and build the record's aggregate handle.
    fn start_request(
        self: &Arc<Self>,
        key_id: KeyId,
        state: &mut KeyState<P, V>,
        params: &K,
        interval: &Interval<P>,
        classification: &Classification<P>,
        record_id: u64,
    ) -> RecordHandle<V> {
        let mut joined: Vec<u64> = Vec::new();
        let mut handles: Vec<LoadHandle> = Vec::new();

        for piece in &classification.pending {
            for load in state.loads_overlapping(&self.ops, piece) {
                if !joined.contains(&load.id) {
                    joined.push(load.id);
                    handles.push(load.handle.clone());
                }
            }
        }

        for piece in &classification.missing {
            handles.push(self.start_load(key_id, state, params.clone(), piece.clone()));
        }

        debug!(
            cache = %self.config.label,
            key = ?params,
            start = ?interval.start,
            end = ?interval.end,
            started = classification.missing.len(),
            joined = joined.len(),
            "created pending record"
        );

        let weak = Arc::downgrade(self);
        let key = params.clone();
        let target = interval.clone();
        let aggregate = async move {
            let settlements = future::join_all(handles).await;
            match weak.upgrade() {
                Some(inner) => inner.finish_record(&key, &target, record_id, settlements),
                None => Settlement::Aborted,
            }
        };

        RecordHandle::new(aggregate.boxed().shared())
    }

    /// Register a load for `piece`. The loader itself runs when the returned
    /// handle is first polled, never under the table lock.
    fn start_load(
        self: &Arc<Self>,
        key_id: KeyId,
        state: &mut KeyState<P, V>,
        params: K,
        piece: Interval<P>,
    ) -> LoadHandle {
        let load_id = self.next_id();
        let token = CancellationToken::new();
        let ctx = LoadContext::new(token.clone());
        let cancel = token.clone();
        let loader = Arc::clone(&self.loader);
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = piece.clone();

        let run = async move {
            if cancel.is_cancelled() {
                return LoadSettlement::Aborted;
            }
            match weak.upgrade() {
                Some(inner) => {
                    inner.loader_calls.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        cache = %inner.config.label,
                        key = ?params,
                        start = ?piece.start,
                        end = ?piece.end,
                        "invoking loader"
                    );
                }
                None => return LoadSettlement::Aborted,
            }

            let (start, end) = (piece.start.clone(), piece.end.clone());
            let load = loader.load(start, end, params.clone(), ctx.clone());
            let result = match future::select(load, Box::pin(cancel.cancelled())).await {
                Either::Left((result, _)) => Some(result),
                Either::Right(_) => None,
            };

            let partial = ctx.is_partial();
            match weak.upgrade() {
                Some(inner) => inner.settle_load(key_id, load_id, &params, &piece, result, partial),
                None => LoadSettlement::Aborted,
            }
        };

        let handle = run.boxed().shared();
        state.insert_load(
            &self.ops,
            InFlightLoad {
                id: load_id,
                interval,
                token,
                handle: handle.clone(),
            },
        );
        handle
    }

    /// Fold one finished load into its key's state.
    ///
    /// A load that is no longer registered was aborted or evicted while it
    /// ran; its result is dropped.
    fn settle_load(
        &self,
        key_id: KeyId,
        load_id: u64,
        params: &K,
        piece: &Interval<P>,
        result: Option<std::result::Result<Vec<V>, LoadError>>,
        partial: bool,
    ) -> LoadSettlement {
        let ops = &self.ops;
        let settlement = {
            let mut table = self.table.lock();
            let Some(state) = table.keys.slot_mut(key_id) else {
                trace!(
                    cache = %self.config.label,
                    key = ?params,
                    "ignoring settlement for evicted key"
                );
                return LoadSettlement::Aborted;
            };
            if state.take_load(load_id).is_none() {
                trace!(
                    cache = %self.config.label,
                    key = ?params,
                    start = ?piece.start,
                    end = ?piece.end,
                    "ignoring stale settlement"
                );
                return LoadSettlement::Aborted;
            }

            match result {
                None => LoadSettlement::Aborted,
                Some(Ok(values)) => {
                    let pieces = std::slice::from_ref(piece);
                    state.partial = ops.subtract_all(&state.partial, pieces);
                    if partial {
                        state.partial = merge_in(ops, &state.partial, piece);
                    }
                    state.loaded = merge_in(ops, &state.loaded, piece);

                    // Partial answers overlapping fresher data are re-derived on next read
                    state.records.retain(|record| match &record.state {
                        RecordState::Resolved(slice) => {
                            !(slice.is_partial() && ops.overlaps(&record.interval, piece))
                        }
                        _ => true,
                    });

                    let returned = values.len();
                    let inserted = state.values.merge(values);
                    debug!(
                        cache = %self.config.label,
                        key = ?params,
                        start = ?piece.start,
                        end = ?piece.end,
                        returned,
                        inserted,
                        partial,
                        "load settled"
                    );
                    LoadSettlement::Loaded { partial }
                }
                Some(Err(err)) => {
                    state.failed = merge_in(ops, &state.failed, piece);
                    warn!(
                        cache = %self.config.label,
                        key = ?params,
                        start = ?piece.start,
                        end = ?piece.end,
                        error = %err,
                        "load failed"
                    );
                    LoadSettlement::Failed(err)
                }
            }
        };

        self.notify(params, piece);
        settlement
    }

    /// Settle a record once every load it waited on has finished.
    fn finish_record(
        &self,
        key: &K,
        target: &Interval<P>,
        record_id: u64,
        settlements: Vec<LoadSettlement>,
    ) -> Settlement<V> {
        let ops = &self.ops;
        let mut partial = false;
        let mut aborted = false;
        let mut failure = None;
        for settlement in settlements {
            match settlement {
                LoadSettlement::Loaded { partial: p } => partial |= p,
                LoadSettlement::Failed(err) => {
                    failure.get_or_insert(err);
                }
                LoadSettlement::Aborted => aborted = true,
            }
        }

        let settlement = {
            let mut table = self.table.lock();
            let Some(state) = table.keys.get_mut(key) else {
                return Settlement::Aborted;
            };
            let pos = match state.find_record(ops, target) {
                Ok(pos) if state.records[pos].id == record_id => pos,
                _ => return Settlement::Aborted,
            };

            if aborted {
                state.records.remove(pos);
                Settlement::Aborted
            } else {
                let (settlement, record_state) = match failure {
                    Some(err) => {
                        let err = CacheError::Loader(err);
                        (Settlement::Rejected(err.clone()), RecordState::Rejected(err))
                    }
                    None => {
                        let values = state.values.slice(&target.start, &target.end).to_vec();
                        let slice = Slice::new(values, partial);
                        (Settlement::Resolved(slice.clone()), RecordState::Resolved(slice))
                    }
                };
                state.records[pos].state = record_state;
                settlement
            }
        };

        trace!(
            cache = %self.config.label,
            key = ?key,
            start = ?target.start,
            end = ?target.end,
            "record settled"
        );
        self.notify(key, target);
        settlement
    }

    /// Recompute and deliver status to every subscription overlapping `affected`.
    fn notify(&self, key: &K, affected: &Interval<P>) {
        let _ordered = self.delivery.lock();
        let deliveries = {
            let table = self.table.lock();
            let entries = table.subscriptions.search(key, affected);
            table.statuses(&self.ops, key, entries)
        };
        deliver(deliveries);
    }

    /// Recompute and deliver status to every subscription under `key`.
    fn notify_all(&self, key: &K) {
        let _ordered = self.delivery.lock();
        let deliveries = {
            let table = self.table.lock();
            let entries = table.subscriptions.entries_for(key);
            table.statuses(&self.ops, key, entries)
        };
        deliver(deliveries);
    }
}

fn deliver(deliveries: Vec<(Status, Vec<StatusCallback>)>) {
    for (status, callbacks) in deliveries {
        for callback in callbacks {
            callback(status);
        }
    }
}

fn merge_in<P: Clone>(
    ops: &IntervalOps<P>,
    set: &[Interval<P>],
    interval: &Interval<P>,
) -> Vec<Interval<P>> {
    let mut all = Vec::with_capacity(set.len() + 1);
    all.extend_from_slice(set);
    all.push(interval.clone());
    ops.merge_all(&all)
}
