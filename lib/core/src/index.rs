//! Blocking indices
//!
//! An index maps every record to zero or more opaque bucket keys. Only
//! records that share at least one key are ever compared, which is what
//! keeps matching away from the full cross product.
//!
//! - [`NoopIndex`] puts every record in one bucket (no blocking at all)
//! - [`ColumnsIndex`] buckets records by the exact values of some columns
//! - [`MultiIndex`] combines several indices with OR / AND semantics

use crate::error::IndexKeyError;
use crate::record::{FieldValue, Record};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use smallvec::{smallvec, SmallVec};
use std::fmt;

/// One component of a bucket key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyAtom {
    /// Absent value. All absent values share one equality class.
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Date(NaiveDate),
    Text(String),
    /// Position of the sub-index that produced the following atoms
    Tag(u32),
}

impl KeyAtom {
    /// Convert a scalar cell into a key atom.
    ///
    /// Integral floats collapse onto `Int` so `1` and `1.0` bucket together.
    /// Lists cannot be keys; callers that want per-element keys must expand
    /// them first.
    pub fn from_value(value: &FieldValue, record: &Record, field: &str) -> Result<Self, IndexKeyError> {
        if value.is_missing() {
            return Ok(KeyAtom::Null);
        }
        Ok(match value {
            FieldValue::Null => KeyAtom::Null,
            FieldValue::Bool(b) => KeyAtom::Bool(*b),
            FieldValue::Int(i) => KeyAtom::Int(*i),
            FieldValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    KeyAtom::Int(*f as i64)
                } else {
                    KeyAtom::Float(OrderedFloat(*f))
                }
            }
            FieldValue::Date(d) => KeyAtom::Date(*d),
            FieldValue::Text(s) => KeyAtom::Text(s.clone()),
            FieldValue::List(_) => {
                return Err(IndexKeyError {
                    key: record.key.clone(),
                    field: field.to_string(),
                    reason: "list values cannot be used as a bucket key".to_string(),
                })
            }
        })
    }
}

/// Opaque, hashable bucket identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(SmallVec<[KeyAtom; 2]>);

impl BucketKey {
    /// The single key every record gets under [`NoopIndex`]
    pub fn universal() -> Self {
        Self(SmallVec::new())
    }

    pub fn from_atoms<I: IntoIterator<Item = KeyAtom>>(atoms: I) -> Self {
        Self(atoms.into_iter().collect())
    }

    pub fn atoms(&self) -> &[KeyAtom] {
        &self.0
    }

    fn tagged(tag: u32, key: BucketKey) -> Self {
        let mut atoms: SmallVec<[KeyAtom; 2]> = smallvec![KeyAtom::Tag(tag)];
        atoms.extend(key.0);
        Self(atoms)
    }

    fn concat(mut self, other: &BucketKey) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }
}

/// Bucket keys of one record, usually exactly one
pub type BucketKeys = SmallVec<[BucketKey; 1]>;

/// Blocking strategy
pub trait Index: Send + Sync + fmt::Debug {
    /// Keys for `record`. An empty result keeps the record out of every pair.
    fn bucket_keys(&self, record: &Record) -> Result<BucketKeys, IndexKeyError>;

    /// Fields this index reads
    fn fields(&self) -> Vec<&str> {
        Vec::new()
    }

    /// True when no record can ever get more than one key. Lets the pairer
    /// skip cross-bucket pair de-duplication.
    fn single_key(&self) -> bool {
        false
    }
}

/// Every record lands in the same bucket. Equivalent to no blocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndex;

impl NoopIndex {
    pub fn new() -> Self {
        Self
    }
}

impl Index for NoopIndex {
    fn bucket_keys(&self, _record: &Record) -> Result<BucketKeys, IndexKeyError> {
        Ok(smallvec![BucketKey::universal()])
    }

    fn single_key(&self) -> bool {
        true
    }
}

/// Buckets records by the exact values of one or more columns.
///
/// Records whose indexed column is absent share the `Null` class, so all
/// records missing a value bucket together.
#[derive(Debug, Clone)]
pub struct ColumnsIndex {
    columns: Vec<String>,
    index_elements: bool,
}

impl ColumnsIndex {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index_elements: false,
        }
    }

    /// Treat list cells as sets of keys: each element yields its own key,
    /// and multiple list columns combine as a cartesian product.
    #[must_use]
    pub fn index_elements(mut self, enabled: bool) -> Self {
        self.index_elements = enabled;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn column_atoms(&self, record: &Record, column: &str) -> Result<Vec<KeyAtom>, IndexKeyError> {
        let value = record.get(column);
        match value {
            FieldValue::List(items) if self.index_elements => items
                .iter()
                .map(|item| KeyAtom::from_value(item, record, column))
                .collect(),
            other => Ok(vec![KeyAtom::from_value(other, record, column)?]),
        }
    }
}

impl Index for ColumnsIndex {
    fn bucket_keys(&self, record: &Record) -> Result<BucketKeys, IndexKeyError> {
        let mut keys: Vec<BucketKey> = vec![BucketKey::universal()];
        for column in &self.columns {
            let atoms = self.column_atoms(record, column)?;
            let mut next = Vec::with_capacity(keys.len() * atoms.len());
            for key in &keys {
                for atom in &atoms {
                    let mut extended = key.clone();
                    extended.0.push(atom.clone());
                    next.push(extended);
                }
            }
            keys = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys.into_iter().collect())
    }

    fn fields(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    fn single_key(&self) -> bool {
        !self.index_elements
    }
}

/// Combines the keys of several indices.
///
/// With `combine_keys == false` the key sets are concatenated (records that
/// share a key under any sub-index are paired). With `combine_keys == true`
/// the final keys are the cartesian product of the sub-index keys (records
/// must share a key under every sub-index).
#[derive(Debug)]
pub struct MultiIndex {
    indices: Vec<Box<dyn Index>>,
    combine_keys: bool,
}

impl MultiIndex {
    pub fn new(indices: Vec<Box<dyn Index>>) -> Self {
        Self {
            indices,
            combine_keys: false,
        }
    }

    #[must_use]
    pub fn combine_keys(mut self, enabled: bool) -> Self {
        self.combine_keys = enabled;
        self
    }
}

impl Index for MultiIndex {
    fn bucket_keys(&self, record: &Record) -> Result<BucketKeys, IndexKeyError> {
        if self.combine_keys {
            let mut keys: Vec<BucketKey> = vec![BucketKey::universal()];
            for (i, index) in self.indices.iter().enumerate() {
                let sub = index.bucket_keys(record)?;
                let mut next = Vec::with_capacity(keys.len() * sub.len());
                for key in &keys {
                    for sub_key in &sub {
                        next.push(key.clone().concat(&BucketKey::tagged(i as u32, sub_key.clone())));
                    }
                }
                keys = next;
            }
            Ok(keys.into_iter().collect())
        } else {
            let mut keys = BucketKeys::new();
            for (i, index) in self.indices.iter().enumerate() {
                for key in index.bucket_keys(record)? {
                    keys.push(BucketKey::tagged(i as u32, key));
                }
            }
            Ok(keys)
        }
    }

    fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.indices.iter().flat_map(|i| i.fields()).collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    fn single_key(&self) -> bool {
        if self.combine_keys {
            self.indices.iter().all(|i| i.single_key())
        } else {
            self.indices.len() <= 1 && self.indices.iter().all(|i| i.single_key())
        }
    }
}
