//! Candidate pair generation
//!
//! Buckets every record by its index keys and emits the pairs that share a
//! bucket: the A x B cross product per bucket in match mode, every
//! unordered 2-combination per bucket in dedup mode.

use ahash::{AHashMap, AHashSet};
use matchx_core::{BucketKey, Dataset, Index, IndexKeyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed at construction; decides pair generation and query shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Two datasets, pairs are (left, right)
    Match,
    /// One dataset, pairs are unordered and never self-pairs
    Dedup,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Match => write!(f, "match"),
            Mode::Dedup => write!(f, "dedup"),
        }
    }
}

#[derive(Debug, Default)]
struct Bucket {
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Candidate pairs by dataset position, plus bucket statistics
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    /// `(left_pos, right_pos)`; in dedup mode `left_pos < right_pos`
    pub pairs: Vec<(usize, usize)>,
    pub buckets: usize,
    pub largest_bucket: usize,
    /// Records with no bucket key at all
    pub unbucketed: usize,
}

pub struct Pairer<'a> {
    index: &'a dyn Index,
}

impl<'a> Pairer<'a> {
    pub fn new(index: &'a dyn Index) -> Self {
        Self { index }
    }

    /// Pairs across two datasets
    pub fn match_pairs(&self, left: &Dataset, right: &Dataset) -> Result<Candidates, IndexKeyError> {
        let mut buckets: AHashMap<BucketKey, Bucket> = AHashMap::new();
        let mut unbucketed = self.bucket(left, &mut buckets, |b| &mut b.left)?;
        unbucketed += self.bucket(right, &mut buckets, |b| &mut b.right)?;

        let mut seen = self.seen_set();
        let mut pairs = Vec::new();
        for bucket in buckets.values() {
            for &a in &bucket.left {
                for &b in &bucket.right {
                    if Self::first_time(&mut seen, a, b) {
                        pairs.push((a, b));
                    }
                }
            }
        }

        Ok(Self::candidates(pairs, &buckets, unbucketed))
    }

    /// Unordered pairs within one dataset
    pub fn dedup_pairs(&self, dataset: &Dataset) -> Result<Candidates, IndexKeyError> {
        let mut buckets: AHashMap<BucketKey, Bucket> = AHashMap::new();
        let unbucketed = self.bucket(dataset, &mut buckets, |b| &mut b.left)?;

        let mut seen = self.seen_set();
        let mut pairs = Vec::new();
        for bucket in buckets.values() {
            // members are pushed in position order, so i < j implies a < b
            for (i, &a) in bucket.left.iter().enumerate() {
                for &b in &bucket.left[i + 1..] {
                    if Self::first_time(&mut seen, a, b) {
                        pairs.push((a, b));
                    }
                }
            }
        }

        Ok(Self::candidates(pairs, &buckets, unbucketed))
    }

    /// Adds every record of `dataset` to its buckets and returns how many
    /// records got no key.
    fn bucket<F>(
        &self,
        dataset: &Dataset,
        buckets: &mut AHashMap<BucketKey, Bucket>,
        side: F,
    ) -> Result<usize, IndexKeyError>
    where
        F: Fn(&mut Bucket) -> &mut Vec<usize>,
    {
        let mut unbucketed = 0;
        for (pos, record) in dataset.iter().enumerate() {
            let mut keys = self.index.bucket_keys(record)?;
            if keys.is_empty() {
                unbucketed += 1;
                continue;
            }
            if keys.len() > 1 {
                keys.sort();
                keys.dedup();
            }
            for key in keys {
                side(buckets.entry(key).or_default()).push(pos);
            }
        }
        Ok(unbucketed)
    }

    /// Cross-bucket de-duplication is only needed when a record can own
    /// several keys.
    fn seen_set(&self) -> Option<AHashSet<(usize, usize)>> {
        if self.index.single_key() {
            None
        } else {
            Some(AHashSet::new())
        }
    }

    fn first_time(seen: &mut Option<AHashSet<(usize, usize)>>, a: usize, b: usize) -> bool {
        match seen {
            Some(set) => set.insert((a, b)),
            None => true,
        }
    }

    fn candidates(
        pairs: Vec<(usize, usize)>,
        buckets: &AHashMap<BucketKey, Bucket>,
        unbucketed: usize,
    ) -> Candidates {
        Candidates {
            pairs,
            buckets: buckets.len(),
            largest_bucket: buckets
                .values()
                .map(|b| b.left.len() + b.right.len())
                .max()
                .unwrap_or(0),
            unbucketed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchx_core::{ColumnsIndex, FieldValue, MultiIndex, NoopIndex, Record};

    fn dataset(name: &str, rows: &[(&str, &str, &str)]) -> Dataset {
        let records = rows
            .iter()
            .map(|(key, city, zip)| Record::new(*key).with_field("city", *city).with_field("zip", *zip))
            .collect();
        Dataset::new(name, records).unwrap()
    }

    fn sorted(mut pairs: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
        pairs.sort();
        pairs
    }

    #[test]
    fn test_noop_index_cross_product() {
        let a = dataset("a", &[("1", "x", "1"), ("2", "y", "2"), ("3", "z", "3")]);
        let b = dataset("b", &[("4", "x", "1"), ("5", "y", "2")]);
        let candidates = Pairer::new(&NoopIndex).match_pairs(&a, &b).unwrap();
        assert_eq!(candidates.pairs.len(), 6);
        assert_eq!(candidates.buckets, 1);
        assert_eq!(candidates.largest_bucket, 5);

        let dedup = Pairer::new(&NoopIndex).dedup_pairs(&a).unwrap();
        assert_eq!(sorted(dedup.pairs), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_columns_index_blocks() {
        let a = dataset("a", &[("1", "x", "1"), ("2", "x", "2"), ("3", "z", "3")]);
        let b = dataset("b", &[("4", "x", "9"), ("5", "q", "2")]);
        let index = ColumnsIndex::new(["city"]);
        let candidates = Pairer::new(&index).match_pairs(&a, &b).unwrap();
        assert_eq!(sorted(candidates.pairs), vec![(0, 0), (1, 0)]);

        let dedup = Pairer::new(&index).dedup_pairs(&a).unwrap();
        assert_eq!(dedup.pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_missing_values_share_a_bucket() {
        let records = vec![
            Record::new("1").with_field("city", FieldValue::Null),
            Record::new("2").with_field("name", "b"),
            Record::new("3").with_field("city", "x"),
        ];
        let ds = Dataset::new("people", records).unwrap();
        let dedup = Pairer::new(&ColumnsIndex::new(["city"])).dedup_pairs(&ds).unwrap();
        assert_eq!(dedup.pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_multi_key_pairs_are_emitted_once() {
        // both records agree on city and on zip, so they share two buckets
        let a = dataset("a", &[("1", "x", "1"), ("2", "x", "1"), ("3", "y", "1")]);
        let index = MultiIndex::new(vec![
            Box::new(ColumnsIndex::new(["city"])),
            Box::new(ColumnsIndex::new(["zip"])),
        ]);
        let dedup = Pairer::new(&index).dedup_pairs(&a).unwrap();
        assert_eq!(sorted(dedup.pairs), vec![(0, 1), (0, 2), (1, 2)]);

        let b = dataset("b", &[("4", "x", "1")]);
        let matched = Pairer::new(&index).match_pairs(&a, &b).unwrap();
        assert_eq!(sorted(matched.pairs), vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn test_records_without_keys_are_skipped() {
        let records = vec![
            Record::new("1").with_field("tags", FieldValue::List(vec![])),
            Record::new("2").with_field("tags", FieldValue::List(vec!["a".into(), "b".into()])),
            Record::new("3").with_field("tags", FieldValue::List(vec!["b".into()])),
        ];
        let ds = Dataset::new("tagged", records).unwrap();
        let index = ColumnsIndex::new(["tags"]).index_elements(true);
        let dedup = Pairer::new(&index).dedup_pairs(&ds).unwrap();
        assert_eq!(dedup.pairs, vec![(1, 2)]);
        assert_eq!(dedup.unbucketed, 1);
    }

    #[test]
    fn test_index_key_error_propagates() {
        let records = vec![Record::new("1").with_field("tags", FieldValue::List(vec!["a".into()]))];
        let ds = Dataset::new("tagged", records).unwrap();
        let err = Pairer::new(&ColumnsIndex::new(["tags"])).dedup_pairs(&ds).unwrap_err();
        assert_eq!(err.field, "tags");
    }
}
