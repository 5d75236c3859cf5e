//! Prediction feedback accounting
//!
//! Counters are plain integers. The router owns one [`RouterStats`] that
//! only its single writer updates; worker threads collect into their own
//! [`FeedbackTally`] and the owner merges them once the workers are done.

use std::fmt;

/// Classification of one prediction against the authoritative leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    /// Predicted leaf was the correct leaf
    Hit,
    /// Correct leaf was the predicted leaf's next sibling
    NeighborHit,
    /// Anything else, including absent handles
    Miss,
}

/// Hit, miss and neighbor-hit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct RouterStats {
    /// Exact predictions
    pub hits: u64,
    /// Wrong or absent predictions
    pub misses: u64,
    /// Predictions one leaf short of the correct leaf
    pub neighbor_hits: u64,
}

impl RouterStats {
    /// Count one outcome
    #[inline]
    pub fn record(&mut self, outcome: PredictionOutcome) {
        match outcome {
            PredictionOutcome::Hit => self.hits += 1,
            PredictionOutcome::NeighborHit => self.neighbor_hits += 1,
            PredictionOutcome::Miss => self.misses += 1,
        }
    }

    /// Zero all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &RouterStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.neighbor_hits += other.neighbor_hits;
    }

    /// Total number of recorded outcomes
    pub fn total(&self) -> u64 {
        self.hits + self.misses + self.neighbor_hits
    }

    /// `hits / (hits + misses) * 100`, or 0 when nothing was recorded.
    ///
    /// Neighbor hits are not part of the ratio.
    pub fn accuracy(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for RouterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Router] hits={} misses={} neighbor_hits={} accuracy={:.2}%",
            self.hits,
            self.misses,
            self.neighbor_hits,
            self.accuracy()
        )
    }
}

/// Per-thread feedback accumulator
///
/// Filled through [`LearnedRouter::tally_prediction`](crate::LearnedRouter::tally_prediction)
/// with only shared access to the router, then folded back with
/// [`LearnedRouter::merge_tally`](crate::LearnedRouter::merge_tally).
#[derive(Debug, Clone, Default)]
pub struct FeedbackTally {
    stats: RouterStats,
}

impl FeedbackTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome
    #[inline]
    pub fn record(&mut self, outcome: PredictionOutcome) {
        self.stats.record(outcome);
    }

    /// Counters collected so far
    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Consume the tally, yielding its counters
    pub fn into_stats(self) -> RouterStats {
        self.stats
    }
}
