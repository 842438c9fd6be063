//! Similarity Schema definitions
//!
//! Declares which fields take part in scoring, the comparator used for each
//! field and the field's weight in the aggregate. The serializable
//! [`FieldSpec`] / [`ComparatorSpec`] mirror lets a schema be written as JSON.

use crate::comparator::{
    AbsoluteNumerical, Comparator, DateSimilarity, Exact, JaroWinkler, Levenshtein,
    RelativeNumerical, TokenJaccard, Trigram,
};
use matchx_core::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field name -> (comparator, weight)
#[derive(Debug, Clone)]
pub struct SimilaritySchema {
    fields: BTreeMap<String, FieldConfig>,
}

impl SimilaritySchema {
    /// Create a schema and validate its weights
    pub fn new(fields: BTreeMap<String, FieldConfig>) -> Result<Self, ConfigurationError> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    /// Build from serialized field specs
    pub fn from_specs(specs: BTreeMap<String, FieldSpec>) -> Result<Self, ConfigurationError> {
        let fields = specs
            .into_iter()
            .map(|(name, spec)| Ok((name, spec.build()?)))
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;
        Self::new(fields)
    }

    /// Checks that the schema is non-empty and that weights are finite,
    /// non-negative and not all zero.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.fields.is_empty() {
            return Err(ConfigurationError::EmptyFieldMap);
        }

        for (name, config) in &self.fields {
            if !config.weight.is_finite() {
                return Err(ConfigurationError::InvalidWeight(name.clone()));
            }
            if config.weight < 0.0 {
                return Err(ConfigurationError::NegativeWeight(name.clone()));
            }
        }

        let weight_sum: f64 = self.fields.values().map(|f| f.weight).sum();
        if weight_sum <= 0.0 {
            return Err(ConfigurationError::ZeroTotalWeight);
        }
        Ok(())
    }

    /// Fields in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldConfig)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this schema with one field's weight replaced
    pub fn with_weight(&self, field: &str, weight: f64) -> Result<Self, ConfigurationError> {
        let mut fields = self.fields.clone();
        let config = fields
            .get_mut(field)
            .ok_or_else(|| ConfigurationError::InvalidParameter(format!("field '{}' is not in the schema", field)))?;
        config.weight = weight;
        Self::new(fields)
    }
}

/// Comparator and weight for one field
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub comparator: Arc<dyn Comparator>,
    pub weight: f64,
}

impl FieldConfig {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn new(comparator: Arc<dyn Comparator>, weight: f64) -> Self {
        Self { comparator, weight }
    }

    /// Any comparator with the default weight
    pub fn with_comparator<C: Comparator + 'static>(comparator: C) -> Self {
        Self::new(Arc::new(comparator), Self::DEFAULT_WEIGHT)
    }

    pub fn exact() -> Self {
        Self::with_comparator(Exact)
    }

    pub fn levenshtein() -> Self {
        Self::with_comparator(Levenshtein)
    }

    pub fn jaro_winkler() -> Self {
        Self::with_comparator(JaroWinkler::default())
    }

    pub fn trigram() -> Self {
        Self::with_comparator(Trigram)
    }

    pub fn date() -> Self {
        Self::with_comparator(DateSimilarity::default())
    }

    pub fn relative() -> Self {
        Self::with_comparator(RelativeNumerical)
    }

    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Serializable field configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub comparator: ComparatorSpec,

    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    FieldConfig::DEFAULT_WEIGHT
}

impl FieldSpec {
    pub fn build(&self) -> Result<FieldConfig, ConfigurationError> {
        Ok(FieldConfig::new(self.comparator.build()?, self.weight))
    }
}

/// Serializable choice of built-in comparator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComparatorSpec {
    Exact,
    Levenshtein,
    JaroWinkler {
        #[serde(default = "default_prefix_weight")]
        prefix_weight: f64,
    },
    Trigram,
    TokenJaccard,
    Date {
        #[serde(default = "default_days_max_diff")]
        days_max_diff: u32,
    },
    AbsoluteNumerical {
        d_max: f64,
    },
    RelativeNumerical,
}

fn default_prefix_weight() -> f64 {
    JaroWinkler::DEFAULT_PREFIX_WEIGHT
}

fn default_days_max_diff() -> u32 {
    DateSimilarity::DEFAULT_DAYS_MAX_DIFF
}

impl ComparatorSpec {
    pub fn build(&self) -> Result<Arc<dyn Comparator>, ConfigurationError> {
        Ok(match *self {
            ComparatorSpec::Exact => Arc::new(Exact),
            ComparatorSpec::Levenshtein => Arc::new(Levenshtein),
            ComparatorSpec::JaroWinkler { prefix_weight } => Arc::new(JaroWinkler::new(prefix_weight)?),
            ComparatorSpec::Trigram => Arc::new(Trigram),
            ComparatorSpec::TokenJaccard => Arc::new(TokenJaccard),
            ComparatorSpec::Date { days_max_diff } => Arc::new(DateSimilarity::new(days_max_diff)?),
            ComparatorSpec::AbsoluteNumerical { d_max } => Arc::new(AbsoluteNumerical::new(d_max)?),
            ComparatorSpec::RelativeNumerical => Arc::new(RelativeNumerical),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BTreeMap<String, FieldConfig> {
        let mut fields = BTreeMap::new();
        fields.insert("last".to_string(), FieldConfig::jaro_winkler().weight(2.0));
        fields.insert("first".to_string(), FieldConfig::jaro_winkler());
        fields
    }

    #[test]
    fn test_schema_creation() {
        let schema = SimilaritySchema::new(fields()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["first", "last"]);
        assert_eq!(schema.get_field("last").unwrap().weight, 2.0);
    }

    #[test]
    fn test_empty_schema_error() {
        assert!(matches!(
            SimilaritySchema::new(BTreeMap::new()),
            Err(ConfigurationError::EmptyFieldMap)
        ));
    }

    #[test]
    fn test_weight_errors() {
        let mut negative = fields();
        negative.insert("age".to_string(), FieldConfig::relative().weight(-0.5));
        assert!(matches!(
            SimilaritySchema::new(negative),
            Err(ConfigurationError::NegativeWeight(ref f)) if f == "age"
        ));

        let mut nan = fields();
        nan.insert("age".to_string(), FieldConfig::relative().weight(f64::NAN));
        assert!(matches!(SimilaritySchema::new(nan), Err(ConfigurationError::InvalidWeight(_))));

        let zero: BTreeMap<_, _> = [("a".to_string(), FieldConfig::exact().weight(0.0))].into();
        assert!(matches!(SimilaritySchema::new(zero), Err(ConfigurationError::ZeroTotalWeight)));
    }

    #[test]
    fn test_with_weight() {
        let schema = SimilaritySchema::new(fields()).unwrap();
        let heavier = schema.with_weight("first", 5.0).unwrap();
        assert_eq!(heavier.get_field("first").unwrap().weight, 5.0);
        assert_eq!(schema.get_field("first").unwrap().weight, 1.0);
        assert!(schema.with_weight("middle", 1.0).is_err());
    }

    #[test]
    fn test_specs_from_json() {
        let specs: BTreeMap<String, FieldSpec> = serde_json::from_str(
            r#"{
                "first": {"comparator": {"type": "jaro_winkler"}},
                "born": {"comparator": {"type": "date", "days_max_diff": 10}, "weight": 0.5},
                "age": {"comparator": {"type": "absolute_numerical", "d_max": 5}}
            }"#,
        )
        .unwrap();
        assert_eq!(
            specs["first"].comparator,
            ComparatorSpec::JaroWinkler { prefix_weight: 0.1 }
        );
        assert_eq!(specs["first"].weight, 1.0);
        let schema = SimilaritySchema::from_specs(specs).unwrap();
        assert_eq!(schema.get_field("born").unwrap().weight, 0.5);

        let bad: BTreeMap<String, FieldSpec> =
            serde_json::from_str(r#"{"age": {"comparator": {"type": "absolute_numerical", "d_max": 0}}}"#)
                .unwrap();
        assert!(matches!(
            SimilaritySchema::from_specs(bad),
            Err(ConfigurationError::InvalidParameter(_))
        ));
    }
}
