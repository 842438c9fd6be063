use crate::record::RecordKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Index key error: {0}")]
    IndexKey(#[from] IndexKeyError),

    #[error("Comparator error: {0}")]
    Comparator(#[from] ComparatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Raised while a matcher is being assembled, before any pair is scored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Field map cannot be empty")]
    EmptyFieldMap,

    #[error("Field '{0}' has negative weight")]
    NegativeWeight(String),

    #[error("Field '{0}' has a weight that is not a finite number")]
    InvalidWeight(String),

    #[error("Total weight cannot be zero")]
    ZeroTotalWeight,

    #[error("Field '{field}' not found in dataset '{dataset}'")]
    UnknownField { field: String, dataset: String },

    #[error("Key '{key}' appears more than once in dataset '{dataset}'")]
    DuplicateKey { key: RecordKey, dataset: String },

    #[error("Columns of dataset '{left}' and dataset '{right}' are not equal")]
    ColumnMismatch { left: String, right: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A blocking key could not be hashed or compared for some record.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("record '{key}', field '{field}': {reason}")]
pub struct IndexKeyError {
    pub key: RecordKey,
    pub field: String,
    pub reason: String,
}

/// A comparator failed for one value pair. Aborts the whole computation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field '{field}' on pair ('{left}', '{right}'): {reason}")]
pub struct ComparatorError {
    pub field: String,
    pub left: RecordKey,
    pub right: RecordKey,
    pub reason: String,
}

/// Failure reported by a comparator before the pipeline attaches the
/// field name and record keys.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct CompareFailure(pub String);

impl CompareFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn attach(self, field: &str, left: &RecordKey, right: &RecordKey) -> ComparatorError {
        ComparatorError {
            field: field.to_string(),
            left: left.clone(),
            right: right.clone(),
            reason: self.0,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
