//! Interval classification: which parts of a request must be loaded, which
//! are already in flight, and whether failed or partial data is involved.
//!
//! Pure and synchronous. The orchestrator runs it once per new request
//! against a snapshot of the key's interval sets, and again for every
//! status query.

use crate::interval::{Interval, IntervalOps};

/// The four interval sets tracked per cache key.
///
/// Each list is sorted and merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIntervals<P> {
    /// Fully resident in the value index.
    pub loaded: Vec<Interval<P>>,
    /// Resident but flagged incomplete by the loader. Always covered by `loaded`.
    pub partial: Vec<Interval<P>>,
    /// A load over these intervals errored.
    pub failed: Vec<Interval<P>>,
    /// Currently being loaded.
    pub pending: Vec<Interval<P>>,
}

impl<P> Default for CachedIntervals<P> {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            partial: Vec::new(),
            failed: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<P> CachedIntervals<P> {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
            && self.partial.is_empty()
            && self.failed.is_empty()
            && self.pending.is_empty()
    }
}

/// Result of classifying a target interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<P> {
    /// Sub-intervals nobody has loaded or is loading. Merged.
    pub missing: Vec<Interval<P>>,
    /// Sub-intervals already in flight; await rather than refetch.
    pub pending: Vec<Interval<P>>,
    pub contains_failed_results: bool,
    pub contains_partial_results: bool,
}

impl<P> Classification<P> {
    fn resolved(contains_failed_results: bool, contains_partial_results: bool) -> Self {
        Self {
            missing: Vec::new(),
            pending: Vec::new(),
            contains_failed_results,
            contains_partial_results,
        }
    }

    /// True if nothing needs loading or awaiting.
    pub fn is_resolved(&self) -> bool {
        self.missing.is_empty() && self.pending.is_empty()
    }
}

/// Subscriber-visible status of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    NotFound,
    Pending,
    Resolved,
    Rejected,
}

impl Status {
    /// Pending wins over rejected, rejected over not-found.
    pub fn from_classification<P>(classification: &Classification<P>) -> Self {
        if !classification.pending.is_empty() {
            Status::Pending
        } else if classification.contains_failed_results {
            Status::Rejected
        } else if !classification.missing.is_empty() {
            Status::NotFound
        } else {
            Status::Resolved
        }
    }
}

/// Classify `target` against a key's cached interval sets.
///
/// A partial interval that intersects the target without being identical to
/// it is not trusted: its overlap with the target is treated as unloaded so
/// the narrower (or wider) request gets a chance at a complete answer.
/// Only an identical partial interval is served as-is, flagged partial.
pub fn classify<P: Clone>(
    ops: &IntervalOps<P>,
    cached: &CachedIntervals<P>,
    target: &Interval<P>,
) -> Classification<P> {
    let targets = std::slice::from_ref(target);

    let retry_partial = cached
        .partial
        .iter()
        .any(|p| !ops.equals(p, target) && ops.intersects(p, target));

    let partial_overlap = ops.intersect_all(&cached.partial, targets);
    let contains_failed_results = !ops.intersect_all(&cached.failed, targets).is_empty();
    let contains_partial_results = !retry_partial && !partial_overlap.is_empty();

    // Untrusted partial coverage is carved out of `loaded` so it gets refetched
    let remaining = if retry_partial {
        let trusted = ops.subtract_all(&cached.loaded, &partial_overlap);
        ops.subtract_all(targets, &trusted)
    } else {
        ops.subtract_all(targets, &cached.loaded)
    };

    if remaining.is_empty() {
        return Classification::resolved(contains_failed_results, contains_partial_results);
    }

    let parts = ops.separate_all(&cached.pending, &remaining);
    let missing = ops.merge_all(&parts.b_only);

    // A pending sliver that sits entirely inside something we must fetch from
    // scratch anyway (typically a single shared boundary point) isn't worth awaiting
    let pending = parts
        .intersection
        .into_iter()
        .filter(|p| !missing.iter().any(|m| ops.contains(m, p)))
        .collect();

    Classification {
        missing,
        pending,
        contains_failed_results,
        contains_partial_results,
    }
}
