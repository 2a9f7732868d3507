//! Per-key state and the arena that owns it.

use super::load::InFlightLoad;
use super::record::Record;
use crate::classify::CachedIntervals;
use crate::index::{PointIndex, SortedValues};
use crate::interval::{Interval, IntervalOps};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Everything the cache knows about one key.
pub(crate) struct KeyState<P, V> {
    pub loaded: Vec<Interval<P>>,
    pub partial: Vec<Interval<P>>,
    pub failed: Vec<Interval<P>>,
    pub values: SortedValues<P, V>,
    /// Sorted by interval; at most one load per exact sub-interval.
    pub loads: Vec<InFlightLoad<P>>,
    /// Sorted by interval; one record per exact request.
    pub records: Vec<Record<P, V>>,
}

impl<P: Clone, V> KeyState<P, V> {
    pub fn new(index: PointIndex<P, V>) -> Self {
        Self {
            loaded: Vec::new(),
            partial: Vec::new(),
            failed: Vec::new(),
            values: SortedValues::new(index),
            loads: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Snapshot of the four interval sets. Pending is derived from in-flight loads.
    pub fn intervals(&self, ops: &IntervalOps<P>) -> CachedIntervals<P> {
        let in_flight: Vec<Interval<P>> =
            self.loads.iter().map(|load| load.interval.clone()).collect();
        CachedIntervals {
            loaded: self.loaded.clone(),
            partial: self.partial.clone(),
            failed: self.failed.clone(),
            pending: ops.merge_all(&in_flight),
        }
    }

    pub fn find_record(
        &self,
        ops: &IntervalOps<P>,
        interval: &Interval<P>,
    ) -> Result<usize, usize> {
        self.records
            .binary_search_by(|record| ops.compare(&record.interval, interval))
    }

    pub fn insert_record(&mut self, ops: &IntervalOps<P>, record: Record<P, V>) {
        match self.find_record(ops, &record.interval) {
            Ok(pos) => self.records[pos] = record,
            Err(pos) => self.records.insert(pos, record),
        }
    }

    pub fn insert_load(&mut self, ops: &IntervalOps<P>, load: InFlightLoad<P>) {
        let pos = self
            .loads
            .partition_point(|existing| ops.compare(&existing.interval, &load.interval).is_lt());
        self.loads.insert(pos, load);
    }

    /// Remove the load with this id. `None` means it was aborted or evicted.
    pub fn take_load(&mut self, load_id: u64) -> Option<InFlightLoad<P>> {
        let pos = self.loads.iter().position(|load| load.id == load_id)?;
        Some(self.loads.remove(pos))
    }

    /// In-flight loads covering some of `piece`.
    pub fn loads_overlapping<'a>(
        &'a self,
        ops: &'a IntervalOps<P>,
        piece: &'a Interval<P>,
    ) -> impl Iterator<Item = &'a InFlightLoad<P>> + 'a {
        self.loads.iter().filter(move |load| ops.overlaps(&load.interval, piece))
    }
}

/// Arena slot handle for a key's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct KeyId(usize);

/// Key-to-state map backed by an arena, so loads can refer back to their
/// key's state by integer handle.
pub(crate) struct KeyTable<K, S> {
    slots: FxHashMap<K, KeyId>,
    arena: Vec<Option<S>>,
    free: Vec<usize>,
}

impl<K: Hash + Eq + Clone, S> KeyTable<K, S> {
    pub fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
            arena: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, key: &K) -> Option<&S> {
        let id = self.slots.get(key)?;
        self.arena.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut S> {
        let id = self.slots.get(key)?;
        self.arena.get_mut(id.0)?.as_mut()
    }

    pub fn slot_mut(&mut self, id: KeyId) -> Option<&mut S> {
        self.arena.get_mut(id.0)?.as_mut()
    }

    pub fn get_or_insert_with(&mut self, key: &K, make: impl FnOnce() -> S) -> (KeyId, &mut S) {
        let id = match self.slots.get(key) {
            Some(&id) => id,
            None => {
                let id = self.allocate();
                self.slots.insert(key.clone(), id);
                id
            }
        };
        (id, self.arena[id.0].get_or_insert_with(make))
    }

    fn allocate(&mut self) -> KeyId {
        match self.free.pop() {
            Some(idx) => KeyId(idx),
            None => {
                self.arena.push(None);
                KeyId(self.arena.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<S> {
        let id = self.slots.remove(key)?;
        let state = self.arena.get_mut(id.0)?.take();
        self.free.push(id.0);
        state
    }

    pub fn drain(&mut self) -> Vec<(K, S)> {
        let slots = std::mem::take(&mut self.slots);
        let drained = slots
            .into_iter()
            .filter_map(|(key, id)| self.arena.get_mut(id.0)?.take().map(|state| (key, state)))
            .collect();
        self.arena.clear();
        self.free.clear();
        drained
    }

    pub fn values(&self) -> impl Iterator<Item = &S> {
        self.arena.iter().flatten()
    }
}
