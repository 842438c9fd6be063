//! # matchx Core
//!
//! Core data model and blocking primitives for the matchx entity resolution
//! engine.
//!
//! - [`Record`] / [`Dataset`] - keyed rows and the ordered collections holding them
//! - [`Index`] - blocking strategies mapping a record to bucket keys
//! - [`PairFilter`] / [`FilterChain`] - cheap pre-scoring pair rejection
//! - [`Variator`] - alternate record views scored alongside the original
//! - [`UnionFind`] - disjoint-set arena used for clustering
//!
//! ## Example
//!
//! ```rust
//! use matchx_core::{ColumnsIndex, Dataset, Index, Record};
//!
//! let people = Dataset::new("people", vec![
//!     Record::new("1").with_field("city", "oslo").with_field("name", "ann"),
//!     Record::new("2").with_field("city", "oslo").with_field("name", "anne"),
//!     Record::new("3").with_field("city", "rome").with_field("name", "bo"),
//! ]).unwrap();
//!
//! let index = ColumnsIndex::new(["city"]);
//! let a = index.bucket_keys(people.at(0)).unwrap();
//! let b = index.bucket_keys(people.at(1)).unwrap();
//! assert_eq!(a, b);
//! ```

pub mod dataset;
pub mod error;
pub mod filter;
pub mod graph;
pub mod index;
pub mod record;
pub mod variator;

pub use dataset::Dataset;
pub use error::{
    CompareFailure, ComparatorError, ConfigurationError, Error, IndexKeyError, Result,
};
pub use filter::{DissimilarFilter, FilterChain, NonOverlappingFilter, NotFilter, PairFilter};
pub use graph::{NodeId, UnionFind};
pub use index::{BucketKey, BucketKeys, ColumnsIndex, Index, KeyAtom, MultiIndex, NoopIndex};
pub use record::{FieldValue, Record, RecordKey};
pub use variator::{Swap, Variator};
