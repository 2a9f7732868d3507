//! Interval algebra over comparator-ordered points.
//!
//! Intervals are inclusive `[start, end]` pairs. Touching intervals (one's
//! end equals the other's start) intersect and merge. Subtraction keeps the
//! shared boundary point on both sides of a cut, so `[2, 5] - [1, 4]` is
//! `[4, 5]`: the cache treats the domain as continuous and dedupes values that
//! land on a boundary twice.
//!
//! All set operations are O(n + m) sweep-lines over sorted, merged inputs.

use crate::point::PointOrder;
use std::cmp::Ordering;
use std::fmt;

/// An inclusive interval `[start, end]`. `start == end` is a single point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval<P> {
    pub start: P,
    pub end: P,
}

impl<P> Interval<P> {
    /// Create a new interval. Bounds are not validated; see [`IntervalOps::checked`].
    #[inline]
    pub fn new(start: P, end: P) -> Self {
        Self { start, end }
    }

    /// A single-point interval.
    #[inline]
    pub fn point(at: P) -> Self
    where
        P: Clone,
    {
        Self {
            start: at.clone(),
            end: at,
        }
    }
}

impl<P: fmt::Display> fmt::Display for Interval<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Exact partition of two interval sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separated<P> {
    /// Parts covered only by the left input.
    pub a_only: Vec<Interval<P>>,
    /// Parts covered only by the right input.
    pub b_only: Vec<Interval<P>>,
    /// Parts covered by both.
    pub intersection: Vec<Interval<P>>,
}

impl<P> Default for Separated<P> {
    fn default() -> Self {
        Self {
            a_only: Vec::new(),
            b_only: Vec::new(),
            intersection: Vec::new(),
        }
    }
}

/// Interval operations bound to a point comparator.
#[derive(Debug, Clone)]
pub struct IntervalOps<P> {
    order: PointOrder<P>,
}

impl<P: Clone> IntervalOps<P> {
    pub fn new(order: PointOrder<P>) -> Self {
        Self { order }
    }

    /// The underlying point comparator.
    #[inline]
    pub fn order(&self) -> &PointOrder<P> {
        &self.order
    }

    /// Build an interval, rejecting `start > end`.
    pub fn checked(&self, start: P, end: P) -> Option<Interval<P>> {
        if self.order.greater_than(&start, &end) {
            None
        } else {
            Some(Interval::new(start, end))
        }
    }

    /// Lexicographic `(start, end)` comparison.
    #[inline]
    pub fn compare(&self, a: &Interval<P>, b: &Interval<P>) -> Ordering {
        self.order
            .compare(&a.start, &b.start)
            .then_with(|| self.order.compare(&a.end, &b.end))
    }

    #[inline]
    pub fn equals(&self, a: &Interval<P>, b: &Interval<P>) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// True if `a` covers all of `b`.
    #[inline]
    pub fn contains(&self, a: &Interval<P>, b: &Interval<P>) -> bool {
        self.order.less_or_equal(&a.start, &b.start) && self.order.greater_or_equal(&a.end, &b.end)
    }

    /// True if `a` and `b` share at least one point. Touching counts.
    #[inline]
    pub fn intersects(&self, a: &Interval<P>, b: &Interval<P>) -> bool {
        self.order.greater_or_equal(&a.end, &b.start)
            && self.order.greater_or_equal(&b.end, &a.start)
    }

    /// True if `a` and `b` share more than a boundary point, or if one of them
    /// is a single point lying inside the other.
    pub fn overlaps(&self, a: &Interval<P>, b: &Interval<P>) -> bool {
        if !self.intersects(a, b) {
            return false;
        }
        let lo = self.order.max(&a.start, &b.start);
        let hi = self.order.min(&a.end, &b.end);
        self.order.less_than(lo, hi) || self.is_point(a) || self.is_point(b)
    }

    #[inline]
    pub fn is_point(&self, interval: &Interval<P>) -> bool {
        self.order.equals(&interval.start, &interval.end)
    }

    /// Stable sort by `(start, end)`.
    pub fn sort(&self, mut intervals: Vec<Interval<P>>) -> Vec<Interval<P>> {
        intervals.sort_by(|a, b| self.compare(a, b));
        intervals
    }

    /// Merge two intervals.
    ///
    /// Returns one interval spanning both if they intersect or touch,
    /// otherwise both, ordered by start.
    pub fn merge(&self, a: &Interval<P>, b: &Interval<P>) -> Vec<Interval<P>> {
        if self.intersects(a, b) {
            let start = self.order.min(&a.start, &b.start).clone();
            let end = self.order.max(&a.end, &b.end).clone();
            vec![Interval::new(start, end)]
        } else if self.compare(a, b) == Ordering::Greater {
            vec![b.clone(), a.clone()]
        } else {
            vec![a.clone(), b.clone()]
        }
    }

    /// Coalesce intervals into the minimal sorted, non-overlapping cover.
    ///
    /// Input need not be sorted. A stable sort of already-sorted input is linear.
    pub fn merge_all(&self, intervals: &[Interval<P>]) -> Vec<Interval<P>> {
        if intervals.is_empty() {
            return Vec::new();
        }

        let sorted = self.sort(intervals.to_vec());
        let mut result: Vec<Interval<P>> = Vec::with_capacity(sorted.len());

        for interval in sorted {
            // Sorted by start, so intersecting means current.end >= interval.start
            if let Some(current) = result.last_mut() {
                if self.order.greater_or_equal(&current.end, &interval.start) {
                    if self.order.greater_than(&interval.end, &current.end) {
                        current.end = interval.end;
                    }
                    continue;
                }
            }
            result.push(interval);
        }

        result
    }

    /// Partition two single intervals.
    pub fn separate(&self, a: &Interval<P>, b: &Interval<P>) -> Separated<P> {
        self.separate_all(std::slice::from_ref(a), std::slice::from_ref(b))
    }

    /// Partition two sorted, internally merged interval lists.
    ///
    /// Results are undefined if either input overlaps itself or is unsorted.
    pub fn separate_all(&self, a: &[Interval<P>], b: &[Interval<P>]) -> Separated<P> {
        Separated {
            a_only: self.subtract_all(a, b),
            b_only: self.subtract_all(b, a),
            intersection: self.intersect_all(a, b),
        }
    }

    /// Parts of `a` not covered by `b`. Both inputs sorted and merged.
    ///
    /// Cut boundaries are kept on the remaining side, and zero-length
    /// leftovers are dropped unless the source interval was a single point
    /// that nothing in `b` touched.
    pub fn subtract_all(&self, a: &[Interval<P>], b: &[Interval<P>]) -> Vec<Interval<P>> {
        let mut result = Vec::new();
        let mut j = 0;

        for current in a {
            // b intervals ending before this one can't touch anything later either
            while j < b.len() && self.order.less_than(&b[j].end, &current.start) {
                j += 1;
            }

            let mut cursor = current.start.clone();
            let mut touched = false;
            let mut exhausted = false;

            for cut in b[j..]
                .iter()
                .take_while(|cut| self.order.less_or_equal(&cut.start, &current.end))
            {
                touched = true;
                if self.order.greater_than(&cut.start, &cursor) {
                    result.push(Interval::new(cursor.clone(), cut.start.clone()));
                }
                if self.order.greater_than(&cut.end, &cursor) {
                    cursor = cut.end.clone();
                }
                if self.order.greater_or_equal(&cursor, &current.end) {
                    exhausted = true;
                    break;
                }
            }

            if !touched {
                result.push(current.clone());
            } else if !exhausted {
                result.push(Interval::new(cursor, current.end.clone()));
            }
        }

        result
    }

    /// Pairwise intersections of two sorted, merged lists.
    ///
    /// Touching intervals intersect in a single point.
    pub fn intersect_all(&self, a: &[Interval<P>], b: &[Interval<P>]) -> Vec<Interval<P>> {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            let lo = self.order.max(&a[i].start, &b[j].start);
            let hi = self.order.min(&a[i].end, &b[j].end);
            if self.order.less_or_equal(lo, hi) {
                result.push(Interval::new(lo.clone(), hi.clone()));
            }

            match self.order.compare(&a[i].end, &b[j].end) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }

        result
    }
}
