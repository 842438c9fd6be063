//! # matchX
//!
//! A fast, in-memory entity resolution engine.
//!
//! matchX links records that describe the same real-world entity, either
//! across two datasets (match mode) or within one (dedup mode). Candidate
//! pairs come from blocking indices, are pruned by cheap filters, scored by
//! weighted per-field comparators and cached once, so the same run can be
//! queried at any number of thresholds.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! matchx pairs --config job.json --lower 0.8
//! matchx clusters --config job.json --lower 0.75
//! matchx samples --config job.json --step 0.05 --samples 5
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use matchx::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let left = Dataset::new("crm", vec![
//!     Record::new("c1").with_field("name", "john smith").with_field("zip", "0150"),
//!     Record::new("c2").with_field("name", "mary jones").with_field("zip", "0151"),
//! ]).unwrap();
//! let right = Dataset::new("billing", vec![
//!     Record::new("b1").with_field("name", "jon smith").with_field("zip", "0150"),
//! ]).unwrap();
//!
//! let schema = SimilaritySchema::new(BTreeMap::from([
//!     ("name".to_string(), FieldConfig::jaro_winkler()),
//! ])).unwrap();
//!
//! let matcher = ThresholdMatcher::builder(ColumnsIndex::new(["zip"]))
//!     .schema(schema)
//!     .build_match(left, right)
//!     .unwrap();
//!
//! let pairs = matcher.get_pairs_within_thresholds(&Thresholds::at_least(0.8)).unwrap();
//! assert_eq!(pairs.len(), 1);
//! assert_eq!(pairs[0].right.row_key, RecordKey::from("b1"));
//! ```
//!
//! ## Crate Structure
//!
//! - [`matchx-core`](matchx_core) - records, datasets, blocking indices, filters, variators
//! - [`matchx-similarity`](matchx_similarity) - comparators, schemas, scorers, explanations
//! - [`matchx-engine`](matchx_engine) - pairing, cached scoring, threshold queries, clusters
//! - [`config`] - JSON job files and dataset loading used by the `matchx` binary

pub mod config;

// Re-export core types
pub use matchx_core::{
    ColumnsIndex, Dataset, DissimilarFilter, FieldValue, Index, MultiIndex, NoopIndex, NonOverlappingFilter,
    NotFilter, PairFilter, Record, RecordKey, Swap, Variator,
    Error, Result, ConfigurationError, ComparatorError, IndexKeyError,
};

// Re-export similarity
pub use matchx_similarity::{
    Comparator, FieldConfig, FieldScorer, PairExplanation, PairScorer, SimilarityPipeline, SimilaritySchema,
};

// Re-export engine
pub use matchx_engine::{
    ClusterRow, Decision, MatchOptions, Mode, PairRow, SampleRange, ThresholdMatcher, Thresholds,
};

pub use config::JobConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ColumnsIndex, Dataset, DissimilarFilter, FieldValue, Index, MultiIndex, NoopIndex, NonOverlappingFilter,
        NotFilter, PairFilter, Record, RecordKey, Swap, Variator,
        Comparator, FieldConfig, FieldScorer, PairScorer, SimilarityPipeline, SimilaritySchema,
        ClusterRow, Decision, MatchOptions, Mode, PairRow, ThresholdMatcher, Thresholds,
        JobConfig, Error, Result,
    };
}

/// Built-in field comparators
pub mod comparators {
    pub use matchx_similarity::comparator::*;
}
