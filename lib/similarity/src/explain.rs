//! Explainability for pair scores
//!
//! Breaks a pair's final score down into per-field scores of the pairing
//! that won, so a reviewer can see why two records matched.

use crate::pipeline::{PairScore, SimilarityPipeline};
use matchx_core::{ComparatorError, Record, RecordKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// A pair score with its per-field breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairExplanation {
    pub left: RecordKey,
    pub right: RecordKey,
    /// Final score, the maximum over the original and every variant
    pub score: f64,
    /// Variant of the right-hand record that produced `score`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
    /// Per-field scores of the winning pairing; `null` for indeterminate fields
    pub explain: BTreeMap<String, Option<f64>>,
}

impl PairExplanation {
    pub fn compute(pipeline: &SimilarityPipeline, a: &Record, b: &Record) -> Result<Self, ComparatorError> {
        let variants = pipeline.variants(b);
        let PairScore { score, variant } = pipeline.score_with_variants(a, b, &variants)?;
        let winner = variant.and_then(|i| variants.get(i)).unwrap_or(b);

        Ok(Self {
            left: a.key.clone(),
            right: b.key.clone(),
            score,
            variant,
            explain: pipeline.scorer().field_scores(a, winner)?,
        })
    }

    /// Field with the highest determinate score; the first in name order on ties
    pub fn top_contributing_field(&self) -> Option<&str> {
        self.explain
            .iter()
            .filter_map(|(name, score)| score.map(|s| (name, s)))
            .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
            .map(|(name, _)| name.as_str())
    }
}

/// Summary statistics over a set of pair scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStats {
    pub count: usize,
    pub avg_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
}

impl ScoreStats {
    pub fn compute<I: IntoIterator<Item = f64>>(scores: I) -> Self {
        let mut count = 0;
        let mut sum = 0.0;
        let mut best = f64::NEG_INFINITY;
        let mut worst = f64::INFINITY;
        for score in scores {
            count += 1;
            sum += score;
            best = best.max(score);
            worst = worst.min(score);
        }

        if count == 0 {
            return Self {
                count: 0,
                avg_score: 0.0,
                best_score: 0.0,
                worst_score: 0.0,
            };
        }
        Self {
            count,
            avg_score: sum / count as f64,
            best_score: best,
            worst_score: worst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldConfig, SimilaritySchema};
    use matchx_core::Swap;
    use std::sync::Arc;

    fn pipeline() -> SimilarityPipeline {
        let fields = [
            ("first".to_string(), FieldConfig::exact()),
            ("last".to_string(), FieldConfig::exact()),
            ("city".to_string(), FieldConfig::exact()),
        ]
        .into();
        SimilarityPipeline::from_schema(SimilaritySchema::new(fields).unwrap())
            .with_variator(Arc::new(Swap::new("first", "last")))
    }

    #[test]
    fn test_explanation_uses_winning_variant() {
        let a = Record::new("a").with_field("first", "ann").with_field("last", "lee");
        let b = Record::new("b")
            .with_field("first", "lee")
            .with_field("last", "ann")
            .with_field("city", "oslo");
        let explained = PairExplanation::compute(&pipeline(), &a, &b).unwrap();

        assert_eq!(explained.score, 1.0);
        assert_eq!(explained.variant, Some(0));
        assert_eq!(explained.explain["first"], Some(1.0));
        assert_eq!(explained.explain["city"], None);
        assert_eq!(explained.top_contributing_field(), Some("first"));
    }

    #[test]
    fn test_explanation_serialization() {
        let a = Record::new("a").with_field("first", "ann");
        let b = Record::new(7u64).with_field("first", "bob");
        let explained = PairExplanation::compute(&pipeline(), &a, &b).unwrap();
        let json = serde_json::to_value(&explained).unwrap();

        assert_eq!(json["left"], "a");
        assert_eq!(json["right"], 7);
        assert_eq!(json["score"], 0.0);
        assert!(json.get("variant").is_none());
        assert!(json["explain"]["last"].is_null());
    }

    #[test]
    fn test_score_stats() {
        let stats = ScoreStats::compute([0.5, 1.0, 0.75]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.avg_score, 0.75);
        assert_eq!(stats.best_score, 1.0);
        assert_eq!(stats.worst_score, 0.5);
        assert_eq!(ScoreStats::compute(Vec::new()).count, 0);
    }
}
