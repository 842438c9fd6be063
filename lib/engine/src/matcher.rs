//! Threshold matcher
//!
//! Drives blocking, filtering and scoring once, caches the sorted result and
//! answers every query from that cache. No threshold is needed up front, so
//! one computed table can be inspected at many thresholds.

use crate::cluster::{build_clusters, Cluster};
use crate::pairer::{Candidates, Mode, Pairer};
use crate::query::{ClusterRow, DatasetShare, Decision, PairRow, RecordRow, SampleRange, Thresholds};
use crate::table::{PairTable, ScoredPair};
use ahash::AHashSet;
use matchx_core::{
    ComparatorError, ConfigurationError, Dataset, FilterChain, Index, PairFilter, Record, RecordKey, Result,
    Variator,
};
use matchx_similarity::{FieldScorer, PairExplanation, PairScorer, SimilarityPipeline, SimilaritySchema};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Blocking is reported as non-discriminating when one bucket holds every
/// record of a dataset at least this large.
const NON_DISCRIMINATING_MIN_RECORDS: usize = 1_000;

/// Upper limit on the number of score ranges one sampling query may build
const MAX_SAMPLE_RANGES: usize = 10_000;

/// Tunables for the scoring run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Score candidate pairs on the rayon thread pool
    pub parallel: bool,
    /// Log progress every this many scored pairs; 0 disables it
    pub progress_log_every: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            progress_log_every: 0,
        }
    }
}

/// Assembles a [`ThresholdMatcher`]
#[derive(Debug)]
pub struct MatcherBuilder {
    index: Box<dyn Index>,
    scorer: Option<Arc<dyn PairScorer>>,
    filters: Vec<Box<dyn PairFilter>>,
    variator: Option<Arc<dyn Variator>>,
    options: MatchOptions,
}

impl MatcherBuilder {
    fn new(index: Box<dyn Index>) -> Self {
        Self {
            index,
            scorer: None,
            filters: Vec::new(),
            variator: None,
            options: MatchOptions::default(),
        }
    }

    /// Score pairs with the weighted field aggregate over `schema`
    #[must_use]
    pub fn schema(self, schema: SimilaritySchema) -> Self {
        self.scorer(FieldScorer::new(schema))
    }

    #[must_use]
    pub fn scorer<S: PairScorer + 'static>(self, scorer: S) -> Self {
        self.shared_scorer(Arc::new(scorer))
    }

    #[must_use]
    pub fn shared_scorer(mut self, scorer: Arc<dyn PairScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Appends a filter; filters run in the order they were added
    #[must_use]
    pub fn filter<F: PairFilter + 'static>(self, filter: F) -> Self {
        self.boxed_filter(Box::new(filter))
    }

    #[must_use]
    pub fn boxed_filter(mut self, filter: Box<dyn PairFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn variator<V: Variator + 'static>(self, variator: V) -> Self {
        self.shared_variator(Arc::new(variator))
    }

    #[must_use]
    pub fn shared_variator(mut self, variator: Arc<dyn Variator>) -> Self {
        self.variator = Some(variator);
        self
    }

    #[must_use]
    pub fn options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Match records of `left` against records of `right`
    pub fn build_match(self, left: Dataset, right: Dataset) -> Result<ThresholdMatcher> {
        left.require_same_columns(&right)?;
        self.build(Mode::Match, left, Some(right))
    }

    /// Find duplicates within `dataset`
    pub fn build_dedup(self, dataset: Dataset) -> Result<ThresholdMatcher> {
        self.build(Mode::Dedup, dataset, None)
    }

    fn build(self, mode: Mode, left: Dataset, right: Option<Dataset>) -> Result<ThresholdMatcher> {
        let scorer = self.scorer.ok_or(ConfigurationError::EmptyFieldMap)?;
        let mut pipeline = SimilarityPipeline::new(scorer);
        if let Some(variator) = self.variator {
            pipeline = pipeline.with_variator(variator);
        }
        let filters = FilterChain::from(self.filters);

        let referenced = self
            .index
            .fields()
            .into_iter()
            .chain(filters.fields())
            .chain(pipeline.fields());
        left.require_fields(referenced)?;
        // match mode already checked that both sides share columns

        Ok(ThresholdMatcher {
            mode,
            left,
            right,
            index: self.index,
            filters,
            pipeline,
            options: self.options,
            cache: RwLock::new(None),
        })
    }
}

/// Entity resolution over one dataset (dedup) or two (match)
#[derive(Debug)]
pub struct ThresholdMatcher {
    mode: Mode,
    left: Dataset,
    right: Option<Dataset>,
    index: Box<dyn Index>,
    filters: FilterChain,
    pipeline: SimilarityPipeline,
    options: MatchOptions,
    cache: RwLock<Option<Arc<PairTable>>>,
}

impl ThresholdMatcher {
    pub fn builder<I: Index + 'static>(index: I) -> MatcherBuilder {
        MatcherBuilder::new(Box::new(index))
    }

    pub fn boxed_builder(index: Box<dyn Index>) -> MatcherBuilder {
        MatcherBuilder::new(index)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn left(&self) -> &Dataset {
        &self.left
    }

    /// The right-hand dataset; the only dataset in dedup mode
    pub fn right(&self) -> &Dataset {
        self.right.as_ref().unwrap_or(&self.left)
    }

    /// True once the pair table has been computed
    pub fn is_scored(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Pairs rejected by the filter chain in the latest scoring run
    pub fn rejected_pairs(&self) -> u64 {
        self.filters.rejected_count()
    }

    /// Score every candidate pair, once. Later calls return the cached table.
    pub fn compute(&self) -> Result<Arc<PairTable>> {
        if let Some(table) = self.cache.read().as_ref() {
            return Ok(Arc::clone(table));
        }

        let mut cache = self.cache.write();
        if let Some(table) = cache.as_ref() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.score_all_pairs()?);
        *cache = Some(Arc::clone(&table));
        Ok(table)
    }

    fn candidates(&self) -> Result<Candidates> {
        let pairer = Pairer::new(self.index.as_ref());
        let candidates = match &self.right {
            Some(right) => pairer.match_pairs(&self.left, right)?,
            None => pairer.dedup_pairs(&self.left)?,
        };

        debug!(
            "Blocking produced {} buckets (largest {}, {} records without a key)",
            candidates.buckets, candidates.largest_bucket, candidates.unbucketed
        );
        let total_records = self.left.len() + self.right.as_ref().map_or(0, Dataset::len);
        if !self.index.fields().is_empty()
            && total_records >= NON_DISCRIMINATING_MIN_RECORDS
            && candidates.largest_bucket == total_records
        {
            warn!(
                "Index {:?} put all {} records in one bucket; scoring the full cross product",
                self.index, total_records
            );
        }
        Ok(candidates)
    }

    fn score_all_pairs(&self) -> Result<PairTable> {
        let started = Instant::now();
        self.filters.reset_count();
        let candidates = self.candidates()?;
        info!(
            "Scoring {} candidate pairs in {} mode",
            candidates.pairs.len(),
            self.mode
        );

        let right = self.right();
        let variants: Vec<Vec<Record>> = if self.pipeline.variator().is_some() {
            right.iter().map(|r| self.pipeline.variants(r)).collect()
        } else {
            Vec::new()
        };
        let no_variants: &[Record] = &[];

        let progress = AtomicUsize::new(0);
        let score = |&(l, r): &(usize, usize)| -> std::result::Result<Option<ScoredPair>, ComparatorError> {
            self.log_progress(&progress, candidates.pairs.len());
            let (a, b) = (self.left.at(l), right.at(r));
            if !self.filters.accepts(a, b) {
                return Ok(None);
            }
            let vs = variants.get(r).map_or(no_variants, Vec::as_slice);
            let scored = self.pipeline.score_with_variants(a, b, vs)?;
            Ok(Some(ScoredPair {
                score: scored.score,
                left: l,
                right: r,
                variant: scored.variant,
            }))
        };

        let scored: Vec<ScoredPair> = if self.options.parallel {
            candidates
                .pairs
                .par_iter()
                .map(score)
                .filter_map(std::result::Result::transpose)
                .collect::<std::result::Result<_, _>>()?
        } else {
            candidates
                .pairs
                .iter()
                .map(score)
                .filter_map(std::result::Result::transpose)
                .collect::<std::result::Result<_, _>>()?
        };

        debug!("Filters rejected {} pairs", self.filters.rejected_count());
        let table = PairTable::new(scored);
        info!(
            "Scored {} of {} candidate pairs in {:?}",
            table.len(),
            candidates.pairs.len(),
            started.elapsed()
        );
        Ok(table)
    }

    fn log_progress(&self, progress: &AtomicUsize, total: usize) {
        let every = self.options.progress_log_every;
        if every == 0 {
            return;
        }
        let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
        if done % every == 0 {
            info!("Scoring pairs: {}/{}", done, total);
        }
    }

    fn require_mode(&self, mode: Mode, query: &str) -> Result<()> {
        if self.mode != mode {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{} is only available in {} mode, this matcher runs in {} mode",
                query, mode, self.mode
            ))
            .into());
        }
        Ok(())
    }

    fn pair_row(&self, pair_idx: usize, pair: &ScoredPair) -> PairRow {
        PairRow {
            pair_idx,
            sim_score: pair.score,
            left: RecordRow::from_dataset(&self.left, pair.left),
            right: RecordRow::from_dataset(self.right(), pair.right),
        }
    }

    fn keys(&self, pair: &ScoredPair) -> (RecordKey, RecordKey) {
        (
            self.left.at(pair.left).key.clone(),
            self.right().at(pair.right).key.clone(),
        )
    }

    /// Qualifying pairs, highest score first
    fn qualifying(table: &PairTable, thresholds: &Thresholds) -> Vec<ScoredPair> {
        table
            .within(thresholds.lower, thresholds.upper)
            .iter()
            .filter(|p| thresholds.contains(p.score))
            .copied()
            .collect()
    }

    /// Every pair scoring at least `min_score`, numbered in descending score
    /// order, with the values of both records.
    pub fn get_all_pairs(&self, min_score: f64) -> Result<Vec<PairRow>> {
        self.get_pairs_within_thresholds(&Thresholds::at_least(min_score))
    }

    pub fn get_pairs_within_thresholds(&self, thresholds: &Thresholds) -> Result<Vec<PairRow>> {
        thresholds.validate()?;
        let table = self.compute()?;
        Ok(Self::qualifying(&table, thresholds)
            .iter()
            .enumerate()
            .map(|(idx, pair)| self.pair_row(idx, pair))
            .collect())
    }

    /// Up to `sample_counts` pairs from each `step`-wide score range of
    /// [0, 1], highest range first.
    pub fn get_sample_pairs(&self, step: f64, sample_counts: usize) -> Result<Vec<SampleRange>> {
        self.get_sample_pairs_within(&Thresholds::at_least(0.0), step, sample_counts)
    }

    /// Ranges run from `upper` down to `lower`. Each range is `(lo, hi]`
    /// except the lowest, which also includes `lower`.
    pub fn get_sample_pairs_within(
        &self,
        thresholds: &Thresholds,
        step: f64,
        sample_counts: usize,
    ) -> Result<Vec<SampleRange>> {
        thresholds.validate()?;
        if !(step > 0.0 && step.is_finite()) {
            return Err(ConfigurationError::InvalidParameter(format!("step must be positive, got {}", step)).into());
        }
        let table = self.compute()?;

        let span = thresholds.upper - thresholds.lower;
        let count = ((span / step) - 1e-9).ceil().max(1.0);
        if count > MAX_SAMPLE_RANGES as f64 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "step {} splits [{}, {}] into more than {} ranges",
                step, thresholds.lower, thresholds.upper, MAX_SAMPLE_RANGES
            ))
            .into());
        }
        let count = count as usize;

        // Neighbouring ranges share one boundary value, so no score falls
        // into two ranges or between them.
        let bounds: Vec<f64> = (0..=count)
            .map(|k| {
                if k == count {
                    thresholds.lower
                } else {
                    (thresholds.upper - k as f64 * step).max(thresholds.lower)
                }
            })
            .collect();

        let mut ranges = Vec::new();
        for i in 0..count {
            let (upper, lower) = (bounds[i], bounds[i + 1]);
            let last = i + 1 == count;

            let slice = if last {
                table.within(lower, upper)
            } else {
                table.within_exclusive(lower, upper)
            };
            let pairs = slice
                .iter()
                .filter(|p| thresholds.contains(p.score))
                .take(sample_counts)
                .enumerate()
                .map(|(idx, pair)| self.pair_row(idx, pair))
                .collect();
            ranges.push(SampleRange { lower, upper, pairs });
        }
        Ok(ranges)
    }

    /// Raw key pairs inside the thresholds, highest score first. In dedup
    /// mode clusters are usually the better view, since they follow
    /// transitive links.
    pub fn get_index_pairs_within_thresholds(&self, thresholds: &Thresholds) -> Result<Vec<(RecordKey, RecordKey)>> {
        thresholds.validate()?;
        if self.mode == Mode::Dedup {
            debug!("Index pairs requested in dedup mode; clusters follow transitive links, pairs do not");
        }
        let table = self.compute()?;
        Ok(Self::qualifying(&table, thresholds)
            .iter()
            .map(|p| self.keys(p))
            .collect())
    }

    /// Key pairs at or above each of several cutoffs, from one cached table.
    /// Results follow the order of `cutoffs`.
    pub fn get_index_pairs_above(&self, cutoffs: &[f64]) -> Result<Vec<(f64, Vec<(RecordKey, RecordKey)>)>> {
        cutoffs
            .iter()
            .map(|&cutoff| {
                let pairs = self.get_index_pairs_within_thresholds(&Thresholds::at_least(cutoff))?;
                Ok((cutoff, pairs))
            })
            .collect()
    }

    /// Greedy one-to-one assignment: walking pairs from the highest score
    /// down, a pair is kept only if neither record is already taken.
    pub fn get_one_to_one_pairs(&self, thresholds: &Thresholds) -> Result<Vec<PairRow>> {
        self.require_mode(Mode::Match, "one-to-one pairs")?;
        thresholds.validate()?;
        let table = self.compute()?;

        let mut taken_left = AHashSet::new();
        let mut taken_right = AHashSet::new();
        Ok(Self::qualifying(&table, thresholds)
            .iter()
            .filter(|p| {
                if taken_left.contains(&p.left) || taken_right.contains(&p.right) {
                    return false;
                }
                taken_left.insert(p.left);
                taken_right.insert(p.right);
                true
            })
            .enumerate()
            .map(|(idx, pair)| self.pair_row(idx, pair))
            .collect())
    }

    /// Pairs at or above `match_threshold` and the share of each dataset
    /// they cover.
    pub fn decision(&self, match_threshold: f64) -> Result<Decision> {
        Thresholds::at_least(match_threshold).validate()?;
        let table = self.compute()?;
        let matched = table.at_least(match_threshold);

        let mut datasets = Vec::new();
        match &self.right {
            Some(right) => {
                let left_records: AHashSet<usize> = matched.iter().map(|p| p.left).collect();
                let right_records: AHashSet<usize> = matched.iter().map(|p| p.right).collect();
                datasets.push(DatasetShare::new(&self.left, left_records.len()));
                datasets.push(DatasetShare::new(right, right_records.len()));
            }
            None => {
                let records: AHashSet<usize> = matched.iter().flat_map(|p| [p.left, p.right]).collect();
                datasets.push(DatasetShare::new(&self.left, records.len()));
            }
        }

        Ok(Decision {
            match_threshold,
            matched_pairs: matched.len(),
            datasets,
        })
    }

    /// Per-field breakdown of one pair's score. Recomputed on every call and
    /// independent of blocking and filters. In dedup mode variants are
    /// taken from `right_key`.
    pub fn explain(&self, left_key: &RecordKey, right_key: &RecordKey) -> Result<PairExplanation> {
        let a = Self::lookup(&self.left, left_key)?;
        let b = Self::lookup(self.right(), right_key)?;
        Ok(PairExplanation::compute(&self.pipeline, a, b)?)
    }

    fn lookup<'d>(dataset: &'d Dataset, key: &RecordKey) -> Result<&'d Record> {
        dataset.get(key).ok_or_else(|| {
            ConfigurationError::InvalidParameter(format!(
                "key '{}' not found in dataset '{}'",
                key,
                dataset.name()
            ))
            .into()
        })
    }

    fn clusters(&self, thresholds: &Thresholds) -> Result<Vec<Cluster>> {
        self.require_mode(Mode::Dedup, "clusters")?;
        thresholds.validate()?;
        let table = self.compute()?;
        let edges: Vec<ScoredPair> = table.within(thresholds.lower, thresholds.upper).to_vec();

        let mut clusters = build_clusters(self.left.len(), &edges);
        if !thresholds.include_exact_matches {
            clusters.retain(|c| !c.all_exact());
        }
        Ok(clusters)
    }

    /// Key sets of the clusters inside the thresholds
    pub fn get_index_clusters_within_thresholds(&self, thresholds: &Thresholds) -> Result<Vec<Vec<RecordKey>>> {
        Ok(self
            .clusters(thresholds)?
            .into_iter()
            .map(|c| c.members.iter().map(|&m| self.left.at(m).key.clone()).collect())
            .collect())
    }

    /// One row per scored pair inside each cluster. Clusters are numbered by
    /// their best pair score, pairs by score within the cluster.
    pub fn get_clusters_within_threshold(&self, thresholds: &Thresholds) -> Result<Vec<ClusterRow>> {
        let clusters = self.clusters(thresholds)?;
        let mut rows = Vec::new();
        for (cluster_idx, cluster) in clusters.iter().enumerate() {
            for (pair_idx, pair) in cluster.pairs.iter().enumerate() {
                rows.push(ClusterRow {
                    cluster_idx,
                    pair_idx,
                    sim_score: pair.score,
                    left: RecordRow::from_dataset(&self.left, pair.left),
                    right: RecordRow::from_dataset(&self.left, pair.right),
                });
            }
        }
        Ok(rows)
    }
}
