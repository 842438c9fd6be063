// Pair filters - cheap predicates that drop candidate pairs before scoring
use crate::record::Record;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

pub trait PairFilter: Send + Sync + fmt::Debug {
    /// True when the pair must not be scored
    fn reject(&self, a: &Record, b: &Record) -> bool;

    /// Fields this filter reads
    fn fields(&self) -> Vec<&str>;
}

/// Rejects pairs whose values for `field` are both present and different.
/// Absent values never reject.
#[derive(Debug, Clone)]
pub struct DissimilarFilter {
    field: String,
}

impl DissimilarFilter {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl PairFilter for DissimilarFilter {
    fn reject(&self, a: &Record, b: &Record) -> bool {
        let (va, vb) = (a.get(&self.field), b.get(&self.field));
        if va.is_missing() || vb.is_missing() {
            return false;
        }
        !va.same_as(vb)
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }
}

/// Rejects pairs whose `[start, end)` ranges do not overlap.
///
/// Two half-open ranges overlap iff `start_a < end_b && start_b < end_a`.
/// A pair with any absent or incomparable bound is kept.
#[derive(Debug, Clone)]
pub struct NonOverlappingFilter {
    start: String,
    end: String,
}

impl NonOverlappingFilter {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    fn overlaps(&self, a: &Record, b: &Record) -> Option<bool> {
        let (start_a, end_a) = (a.get(&self.start), a.get(&self.end));
        let (start_b, end_b) = (b.get(&self.start), b.get(&self.end));
        if [start_a, end_a, start_b, end_b].iter().any(|v| v.is_missing()) {
            return None;
        }
        let a_before_b_ends = start_a.compare(end_b)? == Ordering::Less;
        let b_before_a_ends = start_b.compare(end_a)? == Ordering::Less;
        Some(a_before_b_ends && b_before_a_ends)
    }
}

impl PairFilter for NonOverlappingFilter {
    fn reject(&self, a: &Record, b: &Record) -> bool {
        matches!(self.overlaps(a, b), Some(false))
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.start.as_str(), self.end.as_str()]
    }
}

/// Inverts another filter
#[derive(Debug)]
pub struct NotFilter {
    inner: Box<dyn PairFilter>,
}

impl NotFilter {
    pub fn new(inner: Box<dyn PairFilter>) -> Self {
        Self { inner }
    }
}

impl PairFilter for NotFilter {
    fn reject(&self, a: &Record, b: &Record) -> bool {
        !self.inner.reject(a, b)
    }

    fn fields(&self) -> Vec<&str> {
        self.inner.fields()
    }
}

/// Ordered list of filters evaluated with short-circuit semantics
#[derive(Debug, Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn PairFilter>>,
    rejected: AtomicU64,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn PairFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.filters.iter().flat_map(|f| f.fields()).collect()
    }

    /// True when the pair survives every filter
    pub fn accepts(&self, a: &Record, b: &Record) -> bool {
        let rejected = self.filters.iter().any(|f| f.reject(a, b));
        if rejected {
            self.rejected.fetch_add(1, AtomicOrdering::Relaxed);
        }
        !rejected
    }

    /// Pairs rejected since the last reset
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(AtomicOrdering::Relaxed)
    }

    pub fn reset_count(&self) {
        self.rejected.store(0, AtomicOrdering::Relaxed);
    }
}

impl From<Vec<Box<dyn PairFilter>>> for FilterChain {
    fn from(filters: Vec<Box<dyn PairFilter>>) -> Self {
        Self {
            filters,
            rejected: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(key: &str, agency: &str, start: i64, end: i64) -> Record {
        Record::new(key)
            .with_field("agency", agency)
            .with_field("start", start)
            .with_field("end", end)
    }

    #[test]
    fn test_chain_count_resets() {
        let chain = FilterChain::from(vec![Box::new(DissimilarFilter::new("agency")) as Box<dyn PairFilter>]);
        let (a, b) = (span("1", "p", 0, 1), span("2", "q", 0, 1));
        assert!(!chain.accepts(&a, &b));
        assert!(!chain.accepts(&a, &b));
        assert_eq!(chain.rejected_count(), 2);
        chain.reset_count();
        assert_eq!(chain.rejected_count(), 0);
        assert!(!chain.accepts(&a, &b));
        assert_eq!(chain.rejected_count(), 1);
    }

    #[test]
    fn test_dissimilar_filter() {
        let f = DissimilarFilter::new("agency");
        assert!(!f.reject(&span("1", "slidell pd", 0, 1), &span("2", "slidell pd", 0, 1)));
        assert!(f.reject(&span("1", "gretna pd", 0, 1), &span("2", "slidell pd", 0, 1)));
        assert!(!f.reject(&Record::new("3"), &span("2", "slidell pd", 0, 1)));
    }

    #[test]
    fn test_non_overlapping_filter_half_open() {
        let f = NonOverlappingFilter::new("start", "end");
        // touching ranges do not overlap
        assert!(f.reject(&span("1", "x", 0, 10), &span("2", "x", 10, 20)));
        assert!(!f.reject(&span("1", "x", 0, 10), &span("2", "x", 5, 15)));
        assert!(!f.reject(&span("1", "x", 10, 14), &span("2", "x", 3, 16)));
        assert!(f.reject(&span("1", "x", 10, 12), &span("2", "x", 13, 16)));
        assert!(f.reject(&span("1", "x", 0, 10), &span("2", "x", 23, 26)));
    }

    #[test]
    fn test_non_overlapping_filter_keeps_incomplete_ranges() {
        let f = NonOverlappingFilter::new("start", "end");
        let open = Record::new("3").with_field("start", 50i64);
        assert!(!f.reject(&span("1", "x", 0, 10), &open));
    }

    #[test]
    fn test_not_filter_inverts() {
        let f = NotFilter::new(Box::new(DissimilarFilter::new("agency")));
        assert!(f.reject(&span("1", "a", 0, 1), &span("2", "a", 0, 1)));
        assert!(!f.reject(&span("1", "a", 0, 1), &span("2", "b", 0, 1)));
        assert_eq!(f.fields(), vec!["agency"]);
    }

    #[test]
    fn test_chain_short_circuits_and_counts() {
        let chain = FilterChain::from(vec![
            Box::new(DissimilarFilter::new("agency")) as Box<dyn PairFilter>,
            Box::new(NonOverlappingFilter::new("start", "end")),
        ]);
        assert!(!chain.accepts(&span("1", "x", 0, 10), &span("2", "x", 10, 20)));
        assert!(chain.accepts(&span("1", "x", 0, 10), &span("2", "x", 5, 15)));
        assert!(!chain.accepts(&span("1", "x", 0, 10), &span("2", "y", 5, 15)));
        assert_eq!(chain.rejected_count(), 2);
        assert_eq!(chain.fields(), vec!["agency", "start", "end"]);
    }
}
