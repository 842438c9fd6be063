//! # matchx Similarity
//!
//! Turns a pair of records into one similarity score.
//!
//! ## Features
//!
//! - **Comparators**: per-field similarity functions (string metrics, dates, numbers)
//! - **Similarity Schema**: which fields matter, how to compare them and their weights
//! - **Scorers**: weighted field aggregate plus composable max/min/override scorers
//! - **Pipeline**: best score over the original pairing and every variant
//! - **Explainability**: per-field breakdown of a pair's score
//!
//! ## Example
//!
//! ```rust
//! use matchx_core::Record;
//! use matchx_similarity::{FieldConfig, SimilarityPipeline, SimilaritySchema};
//! use std::collections::BTreeMap;
//!
//! let mut fields = BTreeMap::new();
//! fields.insert("first".to_string(), FieldConfig::jaro_winkler());
//! fields.insert("last".to_string(), FieldConfig::jaro_winkler().weight(2.0));
//! let schema = SimilaritySchema::new(fields).unwrap();
//!
//! let pipeline = SimilarityPipeline::from_schema(schema);
//! let a = Record::new("a").with_field("first", "john").with_field("last", "smith");
//! let b = Record::new("b").with_field("first", "jon").with_field("last", "smith");
//! let score = pipeline.score_pair(&a, &b).unwrap();
//! assert!(score.score > 0.9);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Comparator  │────>│   Schema    │────>│   Scorer    │
//! │ (per field) │     │  (weights)  │     │ (aggregate) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Explain    │<────│  Pipeline   │
//!                     │ (per field) │     │ (variants)  │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod comparator;
pub mod explain;
pub mod pipeline;
pub mod schema;
pub mod scorer;

// Re-export main types for convenience
pub use comparator::{
    AbsoluteNumerical, Comparator, DateSimilarity, Exact, FnComparator, JaroWinkler, Levenshtein,
    RelativeNumerical, TokenJaccard, Trigram,
};
pub use explain::{PairExplanation, ScoreStats};
pub use pipeline::{PairScore, SimilarityPipeline};
pub use schema::{ComparatorSpec, FieldConfig, FieldSpec, SimilaritySchema};
pub use scorer::{
    AbsoluteScorer, AlterFn, AlterScorer, FieldScorer, FnScorer, MaxScorer, MinScorer, PairScorer,
};
