//! Point ordering: typed predicates over a caller-supplied comparator.
//!
//! Points are opaque to the cache. Everything the cache knows about them comes
//! from a three-way comparator handed in at construction time. The comparator
//! may return any signed magnitude (for numbers, `a - b` is typical); the
//! predicates here normalize it to an [`Ordering`]. The raw magnitude is kept
//! around because nearest-point search uses it as a distance.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type CompareFn<P> = dyn Fn(&P, &P) -> i64 + Send + Sync;

/// Three-way comparator over points of type `P`.
///
/// The comparator must be antisymmetric and transitive. This is the caller's
/// obligation; nothing here verifies it.
pub struct PointOrder<P> {
    compare: Arc<CompareFn<P>>,
}

impl<P> Clone for PointOrder<P> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<P> fmt::Debug for PointOrder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PointOrder")
    }
}

impl<P: Ord + 'static> Default for PointOrder<P> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<P> PointOrder<P> {
    /// Wrap a difference-style comparator.
    ///
    /// Negative means `a < b`, zero means equal, positive means `a > b`.
    /// The magnitude doubles as the distance between the two points.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&P, &P) -> i64 + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Comparator backed by the type's own [`Ord`] impl.
    ///
    /// Distances collapse to `{-1, 0, 1}`, so nearest-point ties always
    /// resolve toward the lower index.
    pub fn natural() -> Self
    where
        P: Ord + 'static,
    {
        Self::new(|a: &P, b: &P| match a.cmp(b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    }

    /// Raw comparator output, not normalized.
    #[inline]
    pub fn compare_raw(&self, a: &P, b: &P) -> i64 {
        (self.compare)(a, b)
    }

    /// Absolute distance between two points under the comparator.
    #[inline]
    pub fn distance(&self, a: &P, b: &P) -> u64 {
        self.compare_raw(a, b).unsigned_abs()
    }

    /// Normalized three-way comparison.
    #[inline]
    pub fn compare(&self, a: &P, b: &P) -> Ordering {
        self.compare_raw(a, b).cmp(&0)
    }

    /// Comparison normalized to `-1`, `0` or `1`.
    #[inline]
    pub fn signum(&self, a: &P, b: &P) -> i8 {
        self.compare_raw(a, b).signum() as i8
    }

    #[inline]
    pub fn equals(&self, a: &P, b: &P) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    #[inline]
    pub fn less_than(&self, a: &P, b: &P) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    #[inline]
    pub fn greater_than(&self, a: &P, b: &P) -> bool {
        self.compare(a, b) == Ordering::Greater
    }

    #[inline]
    pub fn less_or_equal(&self, a: &P, b: &P) -> bool {
        self.compare(a, b) != Ordering::Greater
    }

    #[inline]
    pub fn greater_or_equal(&self, a: &P, b: &P) -> bool {
        self.compare(a, b) != Ordering::Less
    }

    /// The smaller of two points (the first one on ties).
    #[inline]
    pub fn min<'a>(&self, a: &'a P, b: &'a P) -> &'a P {
        if self.greater_than(a, b) {
            b
        } else {
            a
        }
    }

    /// The larger of two points (the first one on ties).
    #[inline]
    pub fn max<'a>(&self, a: &'a P, b: &'a P) -> &'a P {
        if self.less_than(a, b) {
            b
        } else {
            a
        }
    }
}
