//! Field comparators
//!
//! A comparator scores two present field values. All built-ins return a
//! similarity in [0.0, 1.0] where 1.0 means identical. Absent values never
//! reach a comparator; the pipeline drops those fields before calling it.

use chrono::Datelike;
use matchx_core::{CompareFailure, FieldValue};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// Similarity of two field values.
///
/// `Ok(None)` means the comparator cannot decide for this pair; the field
/// is then left out of the aggregate, exactly like an absent value.
pub trait Comparator: Send + Sync + fmt::Debug {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure>;
}

fn text_of(value: &FieldValue) -> Result<Cow<'_, str>, CompareFailure> {
    value
        .as_text()
        .ok_or_else(|| CompareFailure::new(format!("expected text, got {}", value.kind())))
}

fn number_of(value: &FieldValue) -> Result<f64, CompareFailure> {
    value
        .as_f64()
        .ok_or_else(|| CompareFailure::new(format!("expected a number, got {} '{}'", value.kind(), value)))
}

/// 1.0 if the values are equal, 0.0 otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl Comparator for Exact {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        Ok(Some(if a.same_as(b) { 1.0 } else { 0.0 }))
    }
}

/// Normalized Levenshtein similarity between the textual forms
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Comparator for Levenshtein {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        Ok(Some(strsim::normalized_levenshtein(&text_of(a)?, &text_of(b)?)))
    }
}

/// Jaro-Winkler similarity. Rewards a shared prefix of up to four
/// characters, which suits personal names.
#[derive(Debug, Clone, Copy)]
pub struct JaroWinkler {
    prefix_weight: f64,
}

impl JaroWinkler {
    pub const DEFAULT_PREFIX_WEIGHT: f64 = 0.1;
    const MAX_PREFIX: usize = 4;

    /// `prefix_weight` must lie in [0.0, 0.25] for scores to stay within [0, 1]
    pub fn new(prefix_weight: f64) -> Result<Self, matchx_core::ConfigurationError> {
        if !(0.0..=0.25).contains(&prefix_weight) {
            return Err(matchx_core::ConfigurationError::InvalidParameter(format!(
                "jaro-winkler prefix weight must be within [0, 0.25], got {}",
                prefix_weight
            )));
        }
        Ok(Self { prefix_weight })
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let jaro = strsim::jaro(a, b);
        let prefix = a
            .chars()
            .zip(b.chars())
            .take(Self::MAX_PREFIX)
            .take_while(|(x, y)| x == y)
            .count();
        jaro + prefix as f64 * self.prefix_weight * (1.0 - jaro)
    }
}

impl Default for JaroWinkler {
    fn default() -> Self {
        Self {
            prefix_weight: Self::DEFAULT_PREFIX_WEIGHT,
        }
    }
}

impl Comparator for JaroWinkler {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        Ok(Some(self.similarity(&text_of(a)?, &text_of(b)?)))
    }
}

/// Character trigram Jaccard similarity, case-insensitive
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigram;

impl Comparator for Trigram {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        Ok(Some(trigram_similarity(&text_of(a)?, &text_of(b)?)))
    }
}

/// Jaccard similarity of lowercase whitespace tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenJaccard;

impl Comparator for TokenJaccard {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        Ok(Some(jaccard_tokens(&text_of(a)?, &text_of(b)?)))
    }
}

/// Date similarity.
///
/// - Less than `days_max_diff` days apart: `1 - days / days_max_diff`
/// - Same year with month and day transposed: 0.5
/// - Same year and day: Levenshtein similarity of the `YYYYMMDD` forms
/// - Otherwise 0.0
#[derive(Debug, Clone, Copy)]
pub struct DateSimilarity {
    days_max_diff: u32,
}

impl DateSimilarity {
    pub const DEFAULT_DAYS_MAX_DIFF: u32 = 30;

    pub fn new(days_max_diff: u32) -> Result<Self, matchx_core::ConfigurationError> {
        if days_max_diff == 0 {
            return Err(matchx_core::ConfigurationError::InvalidParameter(
                "days_max_diff must be positive".to_string(),
            ));
        }
        Ok(Self { days_max_diff })
    }
}

impl Default for DateSimilarity {
    fn default() -> Self {
        Self {
            days_max_diff: Self::DEFAULT_DAYS_MAX_DIFF,
        }
    }
}

impl Comparator for DateSimilarity {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        let da = a
            .as_date()
            .ok_or_else(|| CompareFailure::new(format!("expected a date, got {} '{}'", a.kind(), a)))?;
        let db = b
            .as_date()
            .ok_or_else(|| CompareFailure::new(format!("expected a date, got {} '{}'", b.kind(), b)))?;

        let days = (da - db).num_days().unsigned_abs();
        if days < u64::from(self.days_max_diff) {
            return Ok(Some(1.0 - days as f64 / f64::from(self.days_max_diff)));
        }
        if da.year() == db.year() && da.month() == db.day() && da.day() == db.month() {
            return Ok(Some(0.5));
        }
        if da.year() == db.year() && da.day() == db.day() {
            let fa = da.format("%Y%m%d").to_string();
            let fb = db.format("%Y%m%d").to_string();
            return Ok(Some(strsim::normalized_levenshtein(&fa, &fb)));
        }
        Ok(Some(0.0))
    }
}

/// `max(0, 1 - |a - b| / d_max)`
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteNumerical {
    d_max: f64,
}

impl AbsoluteNumerical {
    pub fn new(d_max: f64) -> Result<Self, matchx_core::ConfigurationError> {
        if !(d_max.is_finite() && d_max > 0.0) {
            return Err(matchx_core::ConfigurationError::InvalidParameter(format!(
                "d_max must be a positive number, got {}",
                d_max
            )));
        }
        Ok(Self { d_max })
    }
}

impl Comparator for AbsoluteNumerical {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        let diff = (number_of(a)? - number_of(b)?).abs();
        Ok(Some((1.0 - diff / self.d_max).max(0.0)))
    }
}

/// `max(0, 1 - |a - b| / max(|a|, |b|))`, 1.0 when both are zero
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeNumerical;

impl Comparator for RelativeNumerical {
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        let (a, b) = (number_of(a)?, number_of(b)?);
        let max = a.abs().max(b.abs());
        if max == 0.0 {
            return Ok(Some(1.0));
        }
        Ok(Some((1.0 - (a - b).abs() / max).max(0.0)))
    }
}

/// Adapts a closure into a comparator
pub struct FnComparator<F> {
    name: &'static str,
    func: F,
}

impl<F> FnComparator<F>
where
    F: Fn(&FieldValue, &FieldValue) -> Result<Option<f64>, CompareFailure> + Send + Sync,
{
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComparator").field("name", &self.name).finish()
    }
}

impl<F> Comparator for FnComparator<F>
where
    F: Fn(&FieldValue, &FieldValue) -> Result<Option<f64>, CompareFailure> + Send + Sync,
{
    fn compare(&self, a: &FieldValue, b: &FieldValue) -> Result<Option<f64>, CompareFailure> {
        (self.func)(a, b)
    }
}

/// Jaccard similarity between lowercase whitespace token sets
fn jaccard_tokens(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

/// Jaccard similarity between padded character trigram sets
fn trigram_similarity(a: &str, b: &str) -> f64 {
    let trigrams_a = generate_trigrams(&a.to_lowercase());
    let trigrams_b = generate_trigrams(&b.to_lowercase());

    let intersection = trigrams_a.intersection(&trigrams_b).count();
    let union = trigrams_a.union(&trigrams_b).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

fn generate_trigrams(s: &str) -> HashSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();
    chars.windows(3).map(|w| w.iter().collect::<String>()).collect()
}
