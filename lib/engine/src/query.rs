//! Query parameters and the row shapes returned by the matcher

use matchx_core::{ConfigurationError, Dataset, FieldValue, RecordKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score window applied by every query.
///
/// A pair qualifies when `lower <= score <= upper`. With
/// `include_exact_matches == false`, pairs scoring exactly 1.0 are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_lower")]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
    #[serde(default = "default_include_exact")]
    pub include_exact_matches: bool,
}

fn default_lower() -> f64 {
    0.7
}

fn default_upper() -> f64 {
    1.0
}

fn default_include_exact() -> bool {
    true
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lower: default_lower(),
            upper: default_upper(),
            include_exact_matches: default_include_exact(),
        }
    }
}

impl Thresholds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ConfigurationError> {
        let thresholds = Self {
            lower,
            upper,
            ..Self::default()
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Everything scoring at least `lower`
    pub fn at_least(lower: f64) -> Self {
        Self {
            lower,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn include_exact_matches(mut self, include: bool) -> Self {
        self.include_exact_matches = include;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.lower) || !in_unit(self.upper) || self.lower > self.upper {
            return Err(ConfigurationError::InvalidParameter(format!(
                "thresholds must satisfy 0 <= lower <= upper <= 1, got lower={} upper={}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.lower && score <= self.upper && (self.include_exact_matches || score < 1.0)
    }
}

/// One record with every column of its dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordRow {
    pub row_key: RecordKey,
    pub values: BTreeMap<String, FieldValue>,
}

impl RecordRow {
    pub fn from_dataset(dataset: &Dataset, pos: usize) -> Self {
        let record = dataset.at(pos);
        Self {
            row_key: record.key.clone(),
            values: dataset
                .columns()
                .iter()
                .map(|c| (c.clone(), record.get(c).clone()))
                .collect(),
        }
    }
}

/// A scored pair with the full values of both records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairRow {
    pub pair_idx: usize,
    pub sim_score: f64,
    pub left: RecordRow,
    pub right: RecordRow,
}

/// Up to `sample_counts` pairs from one score range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRange {
    /// Exclusive, except for the lowest range which includes it
    pub lower: f64,
    pub upper: f64,
    pub pairs: Vec<PairRow>,
}

impl SampleRange {
    /// Label like `"0.95-0.90"`, highest bound first
    pub fn label(&self) -> String {
        format!("{:.2}-{:.2}", self.upper, self.lower)
    }
}

/// How many records a match threshold would pair up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub match_threshold: f64,
    pub matched_pairs: usize,
    pub datasets: Vec<DatasetShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetShare {
    pub dataset: String,
    pub matched_records: usize,
    pub total_records: usize,
    /// `matched_records / total_records`, 0 for an empty dataset
    pub share: f64,
}

impl DatasetShare {
    pub fn new(dataset: &Dataset, matched_records: usize) -> Self {
        let total_records = dataset.len();
        Self {
            dataset: dataset.name().to_string(),
            matched_records,
            total_records,
            share: if total_records == 0 {
                0.0
            } else {
                matched_records as f64 / total_records as f64
            },
        }
    }
}

/// One scored pair inside a cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    pub cluster_idx: usize,
    pub pair_idx: usize,
    pub sim_score: f64,
    pub left: RecordRow,
    pub right: RecordRow,
}
