//! Sorted value index: binary search over values ordered by a projected point.
//!
//! Every value a loader returns is positioned by a caller-supplied
//! `point_of(value)` projection. [`SortedValues`] keeps one ascending,
//! point-deduplicated array per cache key and answers range slices from it.

use crate::point::PointOrder;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, RangeInclusive};
use std::sync::Arc;

type PointFn<P, V> = dyn Fn(&V) -> P + Send + Sync;

/// Binary search over a slice of values, keyed by their projected point.
pub struct PointIndex<P, V> {
    order: PointOrder<P>,
    point_of: Arc<PointFn<P, V>>,
}

impl<P, V> Clone for PointIndex<P, V> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            point_of: Arc::clone(&self.point_of),
        }
    }
}

impl<P, V> fmt::Debug for PointIndex<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointIndex").finish_non_exhaustive()
    }
}

impl<P, V> PointIndex<P, V> {
    pub fn new<F>(order: PointOrder<P>, point_of: F) -> Self
    where
        F: Fn(&V) -> P + Send + Sync + 'static,
    {
        Self {
            order,
            point_of: Arc::new(point_of),
        }
    }

    #[inline]
    pub fn order(&self) -> &PointOrder<P> {
        &self.order
    }

    /// Position of a value in the point domain.
    #[inline]
    pub fn point_of(&self, value: &V) -> P {
        (self.point_of)(value)
    }

    #[inline]
    fn compare_at(&self, values: &[V], idx: usize, target: &P) -> Ordering {
        self.order.compare(&self.point_of(&values[idx]), target)
    }

    /// Index of the value whose point equals `target`.
    pub fn find_exact(&self, values: &[V], target: &P) -> Option<usize> {
        values
            .binary_search_by(|value| self.order.compare(&self.point_of(value), target))
            .ok()
    }

    /// Index of the value closest to `target`.
    ///
    /// When the search lands between two values, the one at the smaller
    /// comparator distance wins; equal distances resolve to the lower index.
    pub fn find_nearest(&self, values: &[V], target: &P) -> Option<usize> {
        if values.is_empty() {
            return None;
        }

        let mut lo = 0usize;
        let mut hi = values.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.compare_at(values, mid, target) {
                Ordering::Equal => return Some(mid),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }

        // lo is the first index past target; candidates are lo - 1 and lo
        if lo == 0 {
            return Some(0);
        }
        if lo == values.len() {
            return Some(lo - 1);
        }

        let below = self.order.distance(&self.point_of(&values[lo - 1]), target);
        let above = self.order.distance(&self.point_of(&values[lo]), target);
        if below <= above {
            Some(lo - 1)
        } else {
            Some(lo)
        }
    }

    /// Index of the last value at or before `target`.
    pub fn find_nearest_at_or_before(&self, values: &[V], target: &P) -> Option<usize> {
        let idx = self.find_nearest(values, target)?;
        if self.compare_at(values, idx, target) == Ordering::Greater {
            idx.checked_sub(1)
        } else {
            Some(idx)
        }
    }

    /// Index of the first value at or after `target`.
    pub fn find_nearest_at_or_after(&self, values: &[V], target: &P) -> Option<usize> {
        let idx = self.find_nearest(values, target)?;
        if self.compare_at(values, idx, target) == Ordering::Less {
            let next = idx + 1;
            (next < values.len()).then_some(next)
        } else {
            Some(idx)
        }
    }

    /// Lowest index at which `target` could be inserted keeping the slice sorted.
    pub fn insertion_index(&self, values: &[V], target: &P) -> usize {
        values.partition_point(|value| self.order.less_than(&self.point_of(value), target))
    }

    /// Inclusive index range of values whose points fall within `[start, end]`.
    pub fn range(&self, values: &[V], start: &P, end: &P) -> Option<RangeInclusive<usize>> {
        let first = self.find_nearest_at_or_after(values, start)?;
        let last = self.find_nearest_at_or_before(values, end)?;
        (first <= last).then_some(first..=last)
    }

    /// Contiguous slice of values whose points fall within `[start, end]`.
    pub fn slice<'a>(&self, values: &'a [V], start: &P, end: &P) -> &'a [V] {
        match self.range(values, start, end) {
            Some(range) => &values[range],
            None => &[],
        }
    }
}

/// The ascending, point-deduplicated array of every value loaded for a key.
///
/// Only grows; cleared on eviction.
#[derive(Debug)]
pub struct SortedValues<P, V> {
    index: PointIndex<P, V>,
    values: Vec<V>,
}

impl<P, V> SortedValues<P, V> {
    pub fn new(index: PointIndex<P, V>) -> Self {
        Self {
            index,
            values: Vec::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> &PointIndex<P, V> {
        &self.index
    }

    #[inline]
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Values within `[start, end]`.
    pub fn slice(&self, start: &P, end: &P) -> &[V] {
        self.index.slice(&self.values, start, end)
    }

    /// Merge a loaded batch into the index.
    ///
    /// The batch is sorted first. Values whose point is already present are
    /// dropped, keeping the resident copy; adjacent sub-loads commonly both
    /// return the value sitting on their shared boundary. Returns the number
    /// of values actually inserted.
    pub fn merge(&mut self, mut batch: Vec<V>) -> usize {
        let index = &self.index;
        let order = index.order();

        batch.sort_by(|a, b| order.compare(&index.point_of(a), &index.point_of(b)));
        batch.dedup_by(|later, earlier| {
            order.equals(&index.point_of(later), &index.point_of(earlier))
        });

        if batch.is_empty() {
            return 0;
        }

        // Common scroll-forward case: everything lands past the resident tail
        let appends = match (self.values.last(), batch.first()) {
            (Some(last), Some(first)) => {
                order.less_than(&index.point_of(last), &index.point_of(first))
            }
            _ => true,
        };

        if appends {
            let inserted = batch.len();
            self.values.extend(batch);
            inserted
        } else {
            let existing = std::mem::take(&mut self.values);
            let (merged, inserted) = merge_sorted(index, existing, batch);
            self.values = merged;
            inserted
        }
    }
}

/// Linear merge of two sorted, deduplicated runs; `existing` wins on equal points.
fn merge_sorted<P, V>(
    index: &PointIndex<P, V>,
    existing: Vec<V>,
    batch: Vec<V>,
) -> (Vec<V>, usize) {
    let order = index.order();
    let mut merged = Vec::with_capacity(existing.len() + batch.len());
    let mut added = 0;

    let mut left = existing.into_iter().peekable();
    let mut right = batch.into_iter().peekable();

    loop {
        let step = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => order.compare(&index.point_of(a), &index.point_of(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match step {
            Ordering::Less => merged.extend(left.next()),
            Ordering::Greater => {
                merged.extend(right.next());
                added += 1;
            }
            Ordering::Equal => {
                merged.extend(left.next());
                right.next();
            }
        }
    }

    (merged, added)
}

/// A contiguous run of values returned from every read path.
///
/// `partial` is set when any sub-load contributing to the run was flagged
/// incomplete by its loader.
#[derive(Debug)]
pub struct Slice<V> {
    values: Arc<[V]>,
    partial: bool,
}

impl<V> Clone for Slice<V> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
            partial: self.partial,
        }
    }
}

impl<V: PartialEq> PartialEq for Slice<V> {
    fn eq(&self, other: &Self) -> bool {
        self.partial == other.partial && self.values[..] == other.values[..]
    }
}

impl<V> Slice<V> {
    pub fn new(values: Vec<V>, partial: bool) -> Self {
        Self {
            values: values.into(),
            partial,
        }
    }

    pub fn complete(values: Vec<V>) -> Self {
        Self::new(values, false)
    }

    pub fn partial(values: Vec<V>) -> Self {
        Self::new(values, true)
    }

    /// True if this slice is known to be incomplete.
    #[inline]
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    #[inline]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.values.to_vec()
    }
}

impl<V> Deref for Slice<V> {
    type Target = [V];

    fn deref(&self) -> &[V] {
        &self.values
    }
}

/// True if the slice was assembled from at least one partial load.
#[inline]
pub fn is_partial_result<V>(slice: &Slice<V>) -> bool {
    slice.is_partial()
}
