//! Pair scorers
//!
//! A scorer turns two records into one similarity score. [`FieldScorer`]
//! is the weighted field-by-field aggregate; the other scorers compose or
//! override it.

use crate::schema::SimilaritySchema;
use ahash::AHashMap;
use matchx_core::{ComparatorError, FieldValue, Record, RecordKey};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Comparator output this close outside [0, 1] is treated as rounding noise
const SCORE_EPSILON: f64 = 1e-9;

pub trait PairScorer: Send + Sync + fmt::Debug {
    /// Score in [0, 1], or `None` when the scorer refuses to score the pair
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError>;

    /// Fields this scorer reads
    fn fields(&self) -> Vec<&str>;

    /// Per-field scores, for explanations. `None` marks an indeterminate field.
    fn field_scores(&self, _a: &Record, _b: &Record) -> Result<BTreeMap<String, Option<f64>>, ComparatorError> {
        Ok(BTreeMap::new())
    }
}

/// Weighted arithmetic mean of per-field comparator scores.
///
/// A field whose value is absent on either side, or whose comparator cannot
/// decide, is left out of both the numerator and the denominator. The pair
/// is indeterminate when no field is left.
#[derive(Debug, Clone)]
pub struct FieldScorer {
    schema: SimilaritySchema,
}

impl FieldScorer {
    pub fn new(schema: SimilaritySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SimilaritySchema {
        &self.schema
    }

    fn field_score(&self, field: &str, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let Some(config) = self.schema.get_field(field) else {
            return Ok(None);
        };
        let (va, vb) = (a.get(field), b.get(field));
        if va.is_missing() || vb.is_missing() {
            return Ok(None);
        }

        let score = config
            .comparator
            .compare(va, vb)
            .map_err(|e| e.attach(field, &a.key, &b.key))?;

        match score {
            None => Ok(None),
            Some(s) => checked_score(s).map(Some).ok_or_else(|| ComparatorError {
                field: field.to_string(),
                left: a.key.clone(),
                right: b.key.clone(),
                reason: format!("comparator returned {} which is outside [0, 1]", s),
            }),
        }
    }
}

/// `None` for NaN or values outside [0, 1] beyond rounding noise
pub(crate) fn checked_score(score: f64) -> Option<f64> {
    if score.is_nan() || score < -SCORE_EPSILON || score > 1.0 + SCORE_EPSILON {
        return None;
    }
    Some(score.clamp(0.0, 1.0))
}

impl PairScorer for FieldScorer {
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for (field, config) in self.schema.iter() {
            if let Some(score) = self.field_score(field, a, b)? {
                weighted_sum += score * config.weight;
                weight_sum += config.weight;
            }
        }

        if weight_sum <= 0.0 {
            return Ok(None);
        }
        Ok(Some((weighted_sum / weight_sum).clamp(0.0, 1.0)))
    }

    fn fields(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    fn field_scores(&self, a: &Record, b: &Record) -> Result<BTreeMap<String, Option<f64>>, ComparatorError> {
        self.schema
            .field_names()
            .map(|field| Ok((field.to_string(), self.field_score(field, a, b)?)))
            .collect()
    }
}

/// Fixed score for pairs agreeing on one field, e.g. a shared national id.
/// Refuses every other pair.
#[derive(Debug, Clone)]
pub struct AbsoluteScorer {
    field: String,
    score: f64,
}

impl AbsoluteScorer {
    pub fn new(field: impl Into<String>, score: f64) -> Result<Self, matchx_core::ConfigurationError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(matchx_core::ConfigurationError::InvalidParameter(format!(
                "absolute score must be in [0, 1], got {}",
                score
            )));
        }
        Ok(Self {
            field: field.into(),
            score,
        })
    }
}

impl PairScorer for AbsoluteScorer {
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let (va, vb) = (a.get(&self.field), b.get(&self.field));
        if va.is_missing() || vb.is_missing() || !va.same_as(vb) {
            return Ok(None);
        }
        Ok(Some(self.score))
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.field.as_str()]
    }
}

fn child_scores<'a>(
    children: &'a [Box<dyn PairScorer>],
    a: &'a Record,
    b: &'a Record,
) -> impl Iterator<Item = Result<Option<f64>, ComparatorError>> + 'a {
    children.iter().map(move |s| s.score(a, b))
}

/// Highest score among children that do not refuse
#[derive(Debug)]
pub struct MaxScorer {
    children: Vec<Box<dyn PairScorer>>,
}

impl MaxScorer {
    pub fn new(children: Vec<Box<dyn PairScorer>>) -> Self {
        Self { children }
    }
}

impl PairScorer for MaxScorer {
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let mut best: Option<f64> = None;
        for score in child_scores(&self.children, a, b) {
            if let Some(s) = score? {
                best = Some(best.map_or(s, |m| m.max(s)));
            }
        }
        Ok(best)
    }

    fn fields(&self) -> Vec<&str> {
        self.children.iter().flat_map(|s| s.fields()).collect()
    }
}

/// Lowest score among children that do not refuse
#[derive(Debug)]
pub struct MinScorer {
    children: Vec<Box<dyn PairScorer>>,
}

impl MinScorer {
    pub fn new(children: Vec<Box<dyn PairScorer>>) -> Self {
        Self { children }
    }
}

impl PairScorer for MinScorer {
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let mut worst: Option<f64> = None;
        for score in child_scores(&self.children, a, b) {
            if let Some(s) = score? {
                worst = Some(worst.map_or(s, |w| w.min(s)));
            }
        }
        Ok(worst)
    }

    fn fields(&self) -> Vec<&str> {
        self.children.iter().flat_map(|s| s.fields()).collect()
    }
}

pub type AlterFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Rewrites the inner score when both records map to the same value in a
/// side table keyed by record key (e.g. both belong to the same household).
pub struct AlterScorer {
    inner: Box<dyn PairScorer>,
    values: AHashMap<RecordKey, FieldValue>,
    alter: AlterFn,
}

impl AlterScorer {
    pub fn new<F>(inner: Box<dyn PairScorer>, values: AHashMap<RecordKey, FieldValue>, alter: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            inner,
            values,
            alter: Arc::new(alter),
        }
    }

    fn applies(&self, a: &Record, b: &Record) -> bool {
        match (self.values.get(&a.key), self.values.get(&b.key)) {
            (Some(va), Some(vb)) => !va.is_missing() && va.same_as(vb),
            _ => false,
        }
    }
}

impl fmt::Debug for AlterScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlterScorer")
            .field("inner", &self.inner)
            .field("values", &self.values.len())
            .finish()
    }
}

impl PairScorer for AlterScorer {
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        let score = self.inner.score(a, b)?;
        match score {
            Some(s) if self.applies(a, b) => Ok(Some((self.alter)(s).clamp(0.0, 1.0))),
            other => Ok(other),
        }
    }

    fn fields(&self) -> Vec<&str> {
        self.inner.fields()
    }

    fn field_scores(&self, a: &Record, b: &Record) -> Result<BTreeMap<String, Option<f64>>, ComparatorError> {
        self.inner.field_scores(a, b)
    }
}

/// Adapts a closure into a scorer
pub struct FnScorer<F> {
    fields: Vec<String>,
    func: F,
}

impl<F> FnScorer<F>
where
    F: Fn(&Record, &Record) -> Result<Option<f64>, ComparatorError> + Send + Sync,
{
    pub fn new<I, S>(fields: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnScorer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScorer").field("fields", &self.fields).finish()
    }
}

impl<F> PairScorer for FnScorer<F>
where
    F: Fn(&Record, &Record) -> Result<Option<f64>, ComparatorError> + Send + Sync,
{
    fn score(&self, a: &Record, b: &Record) -> Result<Option<f64>, ComparatorError> {
        (self.func)(a, b)
    }

    fn fields(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::FnComparator;
    use crate::schema::FieldConfig;
    use matchx_core::CompareFailure;

    fn person(key: &str, first: Option<&str>, last: Option<&str>) -> Record {
        Record::new(key)
            .with_field("first", first)
            .with_field("last", last)
    }

    fn exact_schema(weights: &[(&str, f64)]) -> SimilaritySchema {
        let fields = weights
            .iter()
            .map(|(f, w)| (f.to_string(), FieldConfig::exact().weight(*w)))
            .collect();
        SimilaritySchema::new(fields).unwrap()
    }

    #[test]
    fn test_weighted_mean() {
        let scorer = FieldScorer::new(exact_schema(&[("first", 1.0), ("last", 3.0)]));
        let a = person("1", Some("ann"), Some("lee"));
        let b = person("2", Some("bob"), Some("lee"));
        assert_eq!(scorer.score(&a, &b).unwrap(), Some(0.75));
    }

    #[test]
    fn test_missing_fields_are_excluded() {
        let scorer = FieldScorer::new(exact_schema(&[("first", 1.0), ("last", 1.0)]));
        let a = person("1", Some("ann"), None);
        let b = person("2", Some("ann"), Some("lee"));
        // only `first` is determinate
        assert_eq!(scorer.score(&a, &b).unwrap(), Some(1.0));

        let empty = person("3", None, None);
        assert_eq!(scorer.score(&a, &empty).unwrap(), None);
    }

    #[test]
    fn test_field_scores() {
        let scorer = FieldScorer::new(exact_schema(&[("first", 1.0), ("last", 1.0)]));
        let a = person("1", Some("ann"), None);
        let b = person("2", Some("amy"), Some("lee"));
        let scores = scorer.field_scores(&a, &b).unwrap();
        assert_eq!(scores["first"], Some(0.0));
        assert_eq!(scores["last"], None);
    }

    #[test]
    fn test_comparator_failure_carries_pair() {
        let failing = FnComparator::new("boom", |_a: &FieldValue, _b: &FieldValue| {
            Err(CompareFailure::new("boom"))
        });
        let fields = [("first".to_string(), FieldConfig::with_comparator(failing))].into();
        let scorer = FieldScorer::new(SimilaritySchema::new(fields).unwrap());
        let err = scorer
            .score(&person("1", Some("a"), None), &person("2", Some("b"), None))
            .unwrap_err();
        assert_eq!(err.field, "first");
        assert_eq!(err.left, RecordKey::from("1"));
        assert_eq!(err.right, RecordKey::from("2"));
    }

    #[test]
    fn test_out_of_range_comparator_is_an_error() {
        let broken = FnComparator::new("broken", |_a: &FieldValue, _b: &FieldValue| Ok(Some(1.5)));
        let fields = [("first".to_string(), FieldConfig::with_comparator(broken))].into();
        let scorer = FieldScorer::new(SimilaritySchema::new(fields).unwrap());
        assert!(scorer
            .score(&person("1", Some("a"), None), &person("2", Some("b"), None))
            .is_err());
    }

    #[test]
    fn test_absolute_scorer() {
        let scorer = AbsoluteScorer::new("ssn", 1.0).unwrap();
        let a = Record::new("1").with_field("ssn", "123");
        let b = Record::new("2").with_field("ssn", "123");
        let c = Record::new("3").with_field("ssn", "999");
        assert_eq!(scorer.score(&a, &b).unwrap(), Some(1.0));
        assert_eq!(scorer.score(&a, &c).unwrap(), None);
        assert_eq!(scorer.score(&a, &Record::new("4")).unwrap(), None);
        assert!(AbsoluteScorer::new("ssn", 1.2).is_err());
    }

    #[test]
    fn test_max_and_min_skip_refusals() {
        let names = || Box::new(FieldScorer::new(exact_schema(&[("first", 1.0), ("last", 1.0)]))) as Box<dyn PairScorer>;
        let ssn = || Box::new(AbsoluteScorer::new("ssn", 1.0).unwrap()) as Box<dyn PairScorer>;

        let a = person("1", Some("ann"), Some("lee")).with_field("ssn", "1");
        let b = person("2", Some("ann"), Some("kim")).with_field("ssn", "1");
        let c = person("3", Some("ann"), Some("kim")).with_field("ssn", "2");

        let max = MaxScorer::new(vec![names(), ssn()]);
        assert_eq!(max.score(&a, &b).unwrap(), Some(1.0));
        assert_eq!(max.score(&a, &c).unwrap(), Some(0.5));

        let min = MinScorer::new(vec![names(), ssn()]);
        assert_eq!(min.score(&a, &b).unwrap(), Some(0.5));
        assert_eq!(min.score(&a, &c).unwrap(), Some(0.5));
        assert_eq!(min.fields(), vec!["first", "last", "ssn"]);
    }

    #[test]
    fn test_alter_scorer() {
        let mut households = AHashMap::new();
        households.insert(RecordKey::from("1"), FieldValue::from("h1"));
        households.insert(RecordKey::from("2"), FieldValue::from("h1"));
        households.insert(RecordKey::from("3"), FieldValue::from("h2"));
        let inner = Box::new(FieldScorer::new(exact_schema(&[("first", 1.0), ("last", 1.0)])));
        let scorer = AlterScorer::new(inner, households, |s| s * 0.5);

        let a = person("1", Some("ann"), Some("lee"));
        let b = person("2", Some("ann"), Some("lee"));
        let c = person("3", Some("ann"), Some("lee"));
        assert_eq!(scorer.score(&a, &b).unwrap(), Some(0.5));
        assert_eq!(scorer.score(&a, &c).unwrap(), Some(1.0));
    }

    #[test]
    fn test_fn_scorer() {
        let scorer = FnScorer::new(["first"], |a: &Record, b: &Record| {
            Ok(Some(if a.get("first").same_as(b.get("first")) { 0.9 } else { 0.1 }))
        });
        let a = person("1", Some("ann"), None);
        assert_eq!(scorer.score(&a, &a).unwrap(), Some(0.9));
        assert_eq!(scorer.fields(), vec!["first"]);
    }
}
