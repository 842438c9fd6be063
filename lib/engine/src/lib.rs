//! # matchx Engine
//!
//! Threshold-based entity resolution: blocking, filtering, scoring and
//! clustering on top of [`matchx_core`] and [`matchx_similarity`].
//!
//! A [`ThresholdMatcher`] runs in one of two [`Mode`]s fixed at construction:
//! *match* pairs records across two datasets, *dedup* finds duplicate
//! clusters within one. Scores are computed once, lazily, and every query
//! reads the cached table.
//!
//! ## Example
//!
//! ```rust
//! use matchx_core::{ColumnsIndex, Dataset, Record, RecordKey};
//! use matchx_engine::{ThresholdMatcher, Thresholds};
//! use matchx_similarity::{FieldConfig, SimilaritySchema};
//!
//! let people = Dataset::new("people", vec![
//!     Record::new("1").with_field("city", "oslo").with_field("name", "john smith"),
//!     Record::new("2").with_field("city", "oslo").with_field("name", "jon smith"),
//!     Record::new("3").with_field("city", "rome").with_field("name", "john smith"),
//! ]).unwrap();
//!
//! let schema = SimilaritySchema::new(
//!     [("name".to_string(), FieldConfig::jaro_winkler())].into(),
//! ).unwrap();
//!
//! let matcher = ThresholdMatcher::builder(ColumnsIndex::new(["city"]))
//!     .schema(schema)
//!     .build_dedup(people)
//!     .unwrap();
//!
//! let clusters = matcher
//!     .get_index_clusters_within_thresholds(&Thresholds::default())
//!     .unwrap();
//! assert_eq!(clusters, vec![vec![RecordKey::from("1"), RecordKey::from("2")]]);
//! ```

pub mod cluster;
pub mod matcher;
pub mod pairer;
pub mod query;
pub mod table;

pub use cluster::{build_clusters, Cluster};
pub use matcher::{MatchOptions, MatcherBuilder, ThresholdMatcher};
pub use pairer::{Candidates, Mode, Pairer};
pub use query::{ClusterRow, DatasetShare, Decision, PairRow, RecordRow, SampleRange, Thresholds};
pub use table::{PairTable, ScoredPair};
