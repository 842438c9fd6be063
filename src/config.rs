//! JSON job configuration
//!
//! A job file names the dataset(s), the record key field, the blocking index,
//! the field comparators and optional filters/variator. Relative dataset
//! paths are resolved against the directory of the job file.
//!
//! ```json
//! {
//!   "left": { "path": "officers.jsonl" },
//!   "key_field": "uid",
//!   "index": { "type": "columns", "columns": ["last_name"] },
//!   "fields": {
//!     "first_name": { "comparator": { "type": "jaro_winkler" } },
//!     "birth_date": { "comparator": { "type": "date" }, "weight": 0.5 }
//!   },
//!   "filters": [ { "type": "dissimilar", "field": "agency" } ],
//!   "variator": { "type": "swap", "column_a": "first_name", "column_b": "last_name" }
//! }
//! ```

use matchx_core::{
    ColumnsIndex, ConfigurationError, Dataset, DissimilarFilter, Error, FieldValue, Index, MultiIndex, NoopIndex,
    NonOverlappingFilter, NotFilter, PairFilter, Record, RecordKey, Result, Swap, Variator,
};
use matchx_engine::{MatchOptions, ThresholdMatcher, Thresholds};
use matchx_similarity::{FieldSpec, SimilaritySchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A complete matching job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub left: DatasetSource,
    /// Present for match mode, absent for dedup mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<DatasetSource>,
    #[serde(default = "default_key_field")]
    pub key_field: String,
    #[serde(default)]
    pub index: IndexSpec,
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variator: Option<VariatorSpec>,
    #[serde(default)]
    pub options: MatchOptions,
    /// Default thresholds for CLI queries
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_key_field() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSource {
    pub path: PathBuf,
    /// Defaults to the file stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DatasetSource {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string())
        })
    }
}

/// Serializable blocking index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexSpec {
    #[default]
    Noop,
    Columns {
        columns: Vec<String>,
        #[serde(default)]
        index_elements: bool,
    },
    Multi {
        indices: Vec<IndexSpec>,
        #[serde(default)]
        combine_keys: bool,
    },
}

impl IndexSpec {
    pub fn build(&self) -> Box<dyn Index> {
        match self {
            IndexSpec::Noop => Box::new(NoopIndex),
            IndexSpec::Columns {
                columns,
                index_elements,
            } => Box::new(ColumnsIndex::new(columns.iter().cloned()).index_elements(*index_elements)),
            IndexSpec::Multi { indices, combine_keys } => Box::new(
                MultiIndex::new(indices.iter().map(IndexSpec::build).collect()).combine_keys(*combine_keys),
            ),
        }
    }
}

/// Serializable pair filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    Dissimilar { field: String },
    NonOverlapping { start: String, end: String },
    Not { filter: Box<FilterSpec> },
}

impl FilterSpec {
    pub fn build(&self) -> Box<dyn PairFilter> {
        match self {
            FilterSpec::Dissimilar { field } => Box::new(DissimilarFilter::new(field.clone())),
            FilterSpec::NonOverlapping { start, end } => Box::new(NonOverlappingFilter::new(start.clone(), end.clone())),
            FilterSpec::Not { filter } => Box::new(NotFilter::new(filter.build())),
        }
    }
}

/// Serializable variator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariatorSpec {
    Swap { column_a: String, column_b: String },
}

impl VariatorSpec {
    pub fn build(&self) -> Arc<dyn Variator> {
        match self {
            VariatorSpec::Swap { column_a, column_b } => Arc::new(Swap::new(column_a.clone(), column_b.clone())),
        }
    }
}

impl JobConfig {
    /// Parse a job file. Relative dataset paths become relative to the
    /// file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config: JobConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |source: &mut DatasetSource| {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        };
        resolve(&mut self.left);
        if let Some(right) = self.right.as_mut() {
            resolve(right);
        }
    }

    pub fn schema(&self) -> Result<SimilaritySchema> {
        Ok(SimilaritySchema::from_specs(self.fields.clone())?)
    }

    /// Load the datasets and assemble the matcher. Nothing is scored yet.
    pub fn build_matcher(&self) -> Result<ThresholdMatcher> {
        let mut builder = ThresholdMatcher::boxed_builder(self.index.build())
            .schema(self.schema()?)
            .options(self.options);
        for filter in &self.filters {
            builder = builder.boxed_filter(filter.build());
        }
        if let Some(variator) = &self.variator {
            builder = builder.shared_variator(variator.build());
        }

        let left = load_dataset(&self.left.path, self.left.name(), &self.key_field)?;
        match &self.right {
            Some(source) => {
                let right = load_dataset(&source.path, source.name(), &self.key_field)?;
                builder.build_match(left, right)
            }
            None => builder.build_dedup(left),
        }
    }
}

/// Read a dataset from a JSON array of objects or from JSON lines.
/// `key_field` is taken out of each object and becomes the record key.
pub fn load_dataset<P: AsRef<Path>>(path: P, name: impl Into<String>, key_field: &str) -> Result<Dataset> {
    let text = fs::read_to_string(path.as_ref())?;
    let objects: Vec<Map<String, Value>> = if text.trim_start().starts_with('[') {
        serde_json::from_str(&text)?
    } else {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };

    let records = objects
        .into_iter()
        .enumerate()
        .map(|(row, object)| record_from_object(row, object, key_field))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::new(name, records)?)
}

fn record_from_object(row: usize, mut object: Map<String, Value>, key_field: &str) -> Result<Record> {
    let key = match object.remove(key_field) {
        Some(Value::String(s)) => RecordKey::String(s),
        Some(Value::Number(n)) if n.as_u64().is_some() => RecordKey::Integer(n.as_u64().unwrap_or_default()),
        Some(other) => {
            return Err(invalid(format!(
                "row {}: key field '{}' must be a string or a non-negative integer, got {}",
                row, key_field, other
            )))
        }
        None => return Err(invalid(format!("row {}: key field '{}' is missing", row, key_field))),
    };

    let mut record = Record::new(key);
    for (field, value) in object {
        record.set(field, FieldValue::from(value));
    }
    Ok(record)
}

fn invalid(reason: String) -> Error {
    ConfigurationError::InvalidParameter(reason).into()
}
