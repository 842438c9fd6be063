//! Scored-pair table
//!
//! Immutable once built. Pairs are kept in descending score order, ties
//! broken by dataset positions so every query sees one deterministic order.

use matchx_similarity::ScoreStats;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

/// A candidate pair that survived filtering, with its final score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPair {
    pub score: f64,
    pub left: usize,
    pub right: usize,
    /// Variant of the right-hand record that produced `score`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
}

impl ScoredPair {
    fn order(&self, other: &Self) -> Ordering {
        OrderedFloat(other.score)
            .cmp(&OrderedFloat(self.score))
            .then(self.left.cmp(&other.left))
            .then(self.right.cmp(&other.right))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairTable {
    pairs: Vec<ScoredPair>,
}

impl PairTable {
    pub fn new(mut pairs: Vec<ScoredPair>) -> Self {
        pairs.par_sort_unstable_by(ScoredPair::order);
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn as_slice(&self) -> &[ScoredPair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredPair> {
        self.pairs.iter()
    }

    /// Pairs scoring at least `min_score`
    pub fn at_least(&self, min_score: f64) -> &[ScoredPair] {
        let end = self.pairs.partition_point(|p| p.score >= min_score);
        &self.pairs[..end]
    }

    /// Pairs with `lower <= score <= upper`, highest first
    pub fn within(&self, lower: f64, upper: f64) -> &[ScoredPair] {
        let start = self.pairs.partition_point(|p| p.score > upper);
        let end = self.pairs.partition_point(|p| p.score >= lower);
        if start >= end {
            return &[];
        }
        &self.pairs[start..end]
    }

    /// Pairs with `lower < score <= upper`, highest first
    pub fn within_exclusive(&self, lower: f64, upper: f64) -> &[ScoredPair] {
        let start = self.pairs.partition_point(|p| p.score > upper);
        let end = self.pairs.partition_point(|p| p.score > lower);
        if start >= end {
            return &[];
        }
        &self.pairs[start..end]
    }

    pub fn stats(&self) -> ScoreStats {
        ScoreStats::compute(self.pairs.iter().map(|p| p.score))
    }
}

impl<'a> IntoIterator for &'a PairTable {
    type Item = &'a ScoredPair;
    type IntoIter = std::slice::Iter<'a, ScoredPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
