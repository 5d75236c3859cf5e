//! Learned leaf router
//!
//! Given a trained [`Model`], the router guesses which leaf of the ordered
//! store holds a key with a single linear interpolation over the boundary
//! domain, in O(1) instead of walking the store's internal tree. A guess is
//! only a hint: callers must validate it through the store's authoritative
//! lookup and report the outcome back through the feedback methods.
//!
//! Mutation (`clear_samples`, `add_leaf`, `harvest`, `train`, `reset_model`,
//! `record_prediction`) needs `&mut self` and therefore a single owner.
//! Prediction and interval validation take `&self` and may run from any
//! number of threads once training is done.

use tracing::{debug, info};

use crate::config::{Interpolation, RouterConfig};
use crate::model::{Cluster, LeafHandle, Model};
use crate::stats::{FeedbackTally, PredictionOutcome, RouterStats};
use crate::storage::LeafChain;

/// Minimal interface of a learned key-order predictor
pub trait LearnedIndex {
    /// Predict an approximate position for `key` in key order
    fn predict(&self, key: &[u8]) -> Option<u64>;

    /// Incremental training hook. Does nothing unless overridden.
    fn observe(&mut self, _key: &[u8]) {}

    /// Whether predictions are currently available
    fn ready(&self) -> bool {
        false
    }
}

/// Classify a prediction against the leaf the authoritative lookup found.
///
/// Absent handles are misses. A prediction whose next sibling is the
/// correct leaf is a neighbor hit.
pub fn classify_prediction<C: LeafChain>(
    chain: &C,
    predicted: Option<C::Handle>,
    actual: Option<C::Handle>,
) -> PredictionOutcome {
    match (predicted, actual) {
        (Some(p), Some(a)) if p == a => PredictionOutcome::Hit,
        (Some(p), Some(a)) if chain.safe_next(p) == Some(a) => PredictionOutcome::NeighborHit,
        _ => PredictionOutcome::Miss,
    }
}

/// Interpolation-based leaf router
#[derive(Debug, Clone)]
pub struct LearnedRouter<H> {
    model: Model<H>,
    config: RouterConfig,
    enabled: bool,
    stats: RouterStats,
}

impl<H: LeafHandle> Default for LearnedRouter<H> {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl<H: LeafHandle> LearnedRouter<H> {
    /// Create an untrained router
    pub fn new(config: RouterConfig) -> Self {
        Self {
            model: Model::new(),
            enabled: config.enabled,
            config,
            stats: RouterStats::default(),
        }
    }

    /// Router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Trained model
    pub fn model(&self) -> &Model<H> {
        &self.model
    }

    // ---- Model store ----------------------------------------------------

    /// Drop all samples, untrain, and zero the counters
    pub fn clear_samples(&mut self) {
        self.model.clear();
        self.stats.reset();
    }

    /// Queue one `(boundary key, leaf)` sample for the next training pass
    pub fn add_leaf(&mut self, boundary_key: u64, leaf: H) {
        self.model.add_leaf(boundary_key, leaf);
    }

    /// Return to the empty, untrained state
    pub fn reset_model(&mut self) {
        self.clear_samples();
    }

    /// Replace the samples with every leaf of `chain`, walked head to tail.
    ///
    /// Returns the number of leaves collected. Leaves without a first key
    /// are skipped.
    pub fn harvest<C>(&mut self, chain: &C) -> usize
    where
        C: LeafChain<Handle = H>,
    {
        self.clear_samples();

        let mut count = 0;
        let mut leaf = chain.head();
        while let Some(handle) = leaf {
            if let Some(key) = chain.first_key_u64(handle) {
                self.add_leaf(key, handle);
                count += 1;
            }
            leaf = chain.safe_next(handle);
        }

        info!(leaves = count, "harvested leaf samples");
        count
    }

    /// Train on the queued samples and zero the counters.
    ///
    /// Never fails. With no samples the router stays untrained; callers
    /// that need a model check [`is_trained`](Self::is_trained).
    pub fn train(&mut self) {
        self.model.train();
        self.stats.reset();

        if self.model.is_trained() {
            info!(boundaries = self.model.len(), "learned router trained");
        } else {
            debug!("learned router has no samples to train on");
        }
    }

    // ---- Prediction -----------------------------------------------------

    /// Predict the leaf holding `query_key`
    pub fn predict_leaf(&self, query_key: u64) -> Option<H> {
        self.predict_index(query_key).map(|idx| self.model.leaves()[idx])
    }

    /// Encode a raw key with the configured encoding and predict its leaf
    pub fn predict_key(&self, key: &[u8]) -> Option<H> {
        self.predict_leaf(self.config.encoding.encode(key))
    }

    /// Predict the boundary index for `query_key`.
    ///
    /// Keys at or below the smallest boundary clamp to the first leaf, keys
    /// at or above the largest clamp to the last.
    pub fn predict_index(&self, query_key: u64) -> Option<usize> {
        if !self.available() {
            return None;
        }
        let n = self.model.len();
        let min = self.model.min_key()?;
        let max = self.model.max_key()?;

        if query_key <= min {
            return Some(0);
        }
        if query_key >= max {
            return Some(n - 1);
        }
        Some(self.interpolate(query_key, min, max, n))
    }

    /// Requires `min < q < max`, so the span is never zero
    #[inline]
    fn interpolate(&self, q: u64, min: u64, max: u64, n: usize) -> usize {
        let offset = u128::from(q - min);
        let span = u128::from(max - min);
        let idx = match self.config.interpolation {
            Interpolation::Anchored => offset * (n as u128 - 1) / span,
            Interpolation::Proportional => offset * n as u128 / (span + 1),
        };
        idx.min(n as u128 - 1) as usize
    }

    // ---- Interval validation ----------------------------------------------

    /// Check whether `query_key` falls inside the range owned by its
    /// predecessor boundary.
    ///
    /// Returns `(hit, pos)` where `pos` is the index of the last boundary
    /// `<= query_key` (0 if the key is below every boundary). Reports
    /// `(false, 0)` when no model is available.
    pub fn interval_hit(&self, query_key: u64) -> (bool, usize) {
        if !self.available() {
            return (false, 0);
        }
        let keys = self.model.boundaries();
        let pos = keys.partition_point(|&k| k <= query_key).saturating_sub(1);

        match self.covered_range(pos) {
            Some((lo, hi)) => (query_key >= lo && query_key <= hi, pos),
            None => (false, pos),
        }
    }

    /// Inclusive key range owned by boundary `pos`: up to one below the
    /// next boundary, or unbounded for the last one
    pub fn covered_range(&self, pos: usize) -> Option<(u64, u64)> {
        let keys = self.model.boundaries();
        let lo = *keys.get(pos)?;
        let hi = keys.get(pos + 1).map_or(u64::MAX, |next| next - 1);
        Some((lo, hi))
    }

    /// Emit the interval behind a routed lookup when debugging is on
    pub fn debug_interval(&self, tag: &str, query_key: u64, pos: usize, outcome: PredictionOutcome) {
        if !self.config.debug {
            return;
        }
        if let Some((lo, hi)) = self.covered_range(pos) {
            debug!(tag, q = query_key, pos, min = lo, max = hi, ?outcome, "learned interval");
        }
    }

    // ---- Feedback -----------------------------------------------------------

    /// Count how a prediction compared with the authoritative leaf.
    ///
    /// No-op returning `None` while disabled or untrained.
    pub fn record_prediction<C>(&mut self, chain: &C, predicted: Option<H>, actual: Option<H>) -> Option<PredictionOutcome>
    where
        C: LeafChain<Handle = H>,
    {
        if !self.enabled || !self.model.is_trained() {
            return None;
        }
        let outcome = classify_prediction(chain, predicted, actual);
        self.stats.record(outcome);
        Some(outcome)
    }

    /// Like [`record_prediction`](Self::record_prediction), but counts into
    /// a caller-owned per-thread tally
    pub fn tally_prediction<C>(
        &self,
        tally: &mut FeedbackTally,
        chain: &C,
        predicted: Option<H>,
        actual: Option<H>,
    ) -> Option<PredictionOutcome>
    where
        C: LeafChain<Handle = H>,
    {
        if !self.enabled || !self.model.is_trained() {
            return None;
        }
        let outcome = classify_prediction(chain, predicted, actual);
        tally.record(outcome);
        Some(outcome)
    }

    /// Fold a worker's tally into the router's counters
    pub fn merge_tally(&mut self, tally: FeedbackTally) {
        self.stats.merge(&tally.into_stats());
    }

    /// Current counters
    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Zero the counters
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Print the accuracy report to stdout
    pub fn print_stats(&self) {
        println!("{}", self.stats);
        info!(stats = %self.stats, "learned router accuracy");
    }

    // ---- Control and introspection ----------------------------------------

    /// Switch prediction and validation on or off
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the router answers predictions
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the last training pass produced a model
    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Number of samples, or distinct boundaries once trained
    pub fn num_samples(&self) -> usize {
        self.model.len()
    }

    /// Boundary keys
    pub fn leaf_keys(&self) -> &[u64] {
        self.model.boundaries()
    }

    /// Reserved piecewise segments; always empty
    pub fn clusters(&self) -> &[Cluster<H>] {
        self.model.clusters()
    }

    fn available(&self) -> bool {
        self.enabled && self.model.is_trained() && !self.model.is_empty()
    }
}

impl<H: LeafHandle> LearnedIndex for LearnedRouter<H> {
    fn predict(&self, key: &[u8]) -> Option<u64> {
        self.predict_index(self.config.encoding.encode(key))
            .map(|idx| idx as u64)
    }

    fn ready(&self) -> bool {
        self.available()
    }
}
