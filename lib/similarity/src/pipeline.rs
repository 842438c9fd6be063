//! Similarity pipeline
//!
//! Scores a pair once as given and once per variant of the right-hand
//! record, keeping the maximum. An indeterminate score counts as 0.

use crate::schema::SimilaritySchema;
use crate::scorer::{checked_score, FieldScorer, PairScorer};
use matchx_core::{ComparatorError, Record, Variator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Final score of a pair and the variant that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    pub score: f64,
    /// `None` when the original pairing scored highest
    pub variant: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SimilarityPipeline {
    scorer: Arc<dyn PairScorer>,
    variator: Option<Arc<dyn Variator>>,
}

impl SimilarityPipeline {
    pub fn new(scorer: Arc<dyn PairScorer>) -> Self {
        Self { scorer, variator: None }
    }

    /// Pipeline over the weighted field scorer
    pub fn from_schema(schema: SimilaritySchema) -> Self {
        Self::new(Arc::new(FieldScorer::new(schema)))
    }

    #[must_use]
    pub fn with_variator(mut self, variator: Arc<dyn Variator>) -> Self {
        self.variator = Some(variator);
        self
    }

    pub fn scorer(&self) -> &dyn PairScorer {
        self.scorer.as_ref()
    }

    pub fn variator(&self) -> Option<&dyn Variator> {
        self.variator.as_deref()
    }

    /// Variants of `record`, empty without a variator
    pub fn variants(&self, record: &Record) -> Vec<Record> {
        self.variator
            .as_ref()
            .map(|v| v.variants(record))
            .unwrap_or_default()
    }

    /// Fields read by the scorer and the variator
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = self.scorer.fields();
        if let Some(variator) = &self.variator {
            fields.extend(variator.fields());
        }
        fields
    }

    pub fn score_pair(&self, a: &Record, b: &Record) -> Result<PairScore, ComparatorError> {
        self.score_with_variants(a, b, &self.variants(b))
    }

    /// Like [`score_pair`](Self::score_pair) with the variants of `b`
    /// already generated. Lets callers build them once per record.
    pub fn score_with_variants(
        &self,
        a: &Record,
        b: &Record,
        variants: &[Record],
    ) -> Result<PairScore, ComparatorError> {
        let mut best = PairScore {
            score: self.checked(a, b)?,
            variant: None,
        };

        for (i, variant) in variants.iter().enumerate() {
            let score = self.checked(a, variant)?;
            if score > best.score {
                best = PairScore {
                    score,
                    variant: Some(i),
                };
            }
        }
        Ok(best)
    }

    fn checked(&self, a: &Record, b: &Record) -> Result<f64, ComparatorError> {
        match self.scorer.score(a, b)? {
            None => Ok(0.0),
            Some(s) => checked_score(s).ok_or_else(|| ComparatorError {
                field: "score".to_string(),
                left: a.key.clone(),
                right: b.key.clone(),
                reason: format!("scorer returned {} which is outside [0, 1]", s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldConfig;
    use crate::scorer::FnScorer;
    use matchx_core::{RecordKey, Swap};

    fn pipeline() -> SimilarityPipeline {
        let fields = [
            ("first".to_string(), FieldConfig::exact()),
            ("last".to_string(), FieldConfig::exact()),
        ]
        .into();
        SimilarityPipeline::from_schema(SimilaritySchema::new(fields).unwrap())
    }

    fn person(key: &str, first: &str, last: &str) -> Record {
        Record::new(key).with_field("first", first).with_field("last", last)
    }

    #[test]
    fn test_out_of_range_scorer_output_is_an_error() {
        for bad in [f64::NAN, 1.5, -0.2] {
            let p = SimilarityPipeline::new(Arc::new(FnScorer::new(["first"], move |_: &Record, _: &Record| {
                Ok(Some(bad))
            })));
            let err = p.score_pair(&person("1", "ann", "lee"), &person("2", "ann", "lee")).unwrap_err();
            assert_eq!(err.left, RecordKey::from("1"));
            assert_eq!(err.right, RecordKey::from("2"));
            assert!(err.reason.contains("outside [0, 1]"));
        }

        let p = SimilarityPipeline::new(Arc::new(FnScorer::new(["first"], |_: &Record, _: &Record| {
            Ok(Some(1.0 + 1e-12))
        })));
        let score = p.score_pair(&person("1", "ann", "lee"), &person("2", "ann", "lee")).unwrap();
        assert_eq!(score.score, 1.0);
    }

    #[test]
    fn test_out_of_range_variant_score_is_an_error() {
        let p = SimilarityPipeline::new(Arc::new(FnScorer::new(["first", "last"], |_: &Record, b: &Record| {
            if b.get("first").as_text().as_deref() == Some("ann") {
                Ok(Some(2.0))
            } else {
                Ok(Some(0.5))
            }
        })))
        .with_variator(Arc::new(Swap::new("first", "last")));
        let err = p.score_pair(&person("1", "ann", "lee"), &person("2", "lee", "ann")).unwrap_err();
        assert_eq!(err.right, RecordKey::from("2"));
    }

    #[test]
    fn test_without_variator() {
        let p = pipeline();
        let score = p.score_pair(&person("1", "ann", "lee"), &person("2", "lee", "ann")).unwrap();
        assert_eq!(score, PairScore { score: 0.0, variant: None });
    }

    #[test]
    fn test_swap_variant_wins() {
        let p = pipeline().with_variator(Arc::new(Swap::new("first", "last")));
        let a = person("1", "ann", "lee");
        let score = p.score_pair(&a, &person("2", "lee", "ann")).unwrap();
        assert_eq!(score, PairScore { score: 1.0, variant: Some(0) });

        // the original pairing wins ties
        let score = p.score_pair(&a, &person("3", "ann", "lee")).unwrap();
        assert_eq!(score, PairScore { score: 1.0, variant: None });
    }

    #[test]
    fn test_indeterminate_is_zero() {
        let p = pipeline();
        let score = p.score_pair(&Record::new("1"), &person("2", "ann", "lee")).unwrap();
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_fields_include_variator() {
        let p = pipeline().with_variator(Arc::new(Swap::new("first", "middle")));
        assert_eq!(p.fields(), vec!["first", "last", "first", "middle"]);
    }
}
