//! Model store for the learned router
//!
//! The model is built in one offline pass: leaves are appended as
//! `(boundary key, handle)` samples in whatever order the caller harvests
//! them, then [`Model::train`] sorts and deduplicates them into a clean,
//! strictly increasing boundary array that the router can interpolate over.

use std::fmt::Debug;

use tracing::debug;

/// Sample sets at least this large are sorted in parallel when the
/// `parallel` feature is enabled
#[cfg(feature = "parallel")]
const PARALLEL_SORT_THRESHOLD: usize = 1 << 16;

/// Non-owning reference to a leaf in the external store.
///
/// Blanket-implemented; exists so the model and router can name one bound.
pub trait LeafHandle: Copy + Eq + Debug + Send + Sync {}

impl<T: Copy + Eq + Debug + Send + Sync> LeafHandle for T {}

/// Key range served by a representative leaf.
///
/// Reserved for a piecewise model. Training never produces clusters, so
/// [`Model::clusters`] is always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster<H> {
    /// Smallest boundary key in the cluster
    pub min_key: u64,
    /// Largest boundary key in the cluster
    pub max_key: u64,
    /// First boundary index covered
    pub start_idx: usize,
    /// One past the last boundary index covered
    pub end_idx: usize,
    /// Representative leaf
    pub rep: H,
}

/// Trained state of the router: boundary keys paired with leaf handles
///
/// Handles are not owned. They refer into an external store that may
/// split, merge or free leaves after training.
#[derive(Debug, Clone)]
pub struct Model<H> {
    /// Sample keys; strictly increasing once trained
    boundaries: Vec<u64>,
    /// `leaves[i]` is the leaf whose first key is `boundaries[i]`
    leaves: Vec<H>,
    clusters: Vec<Cluster<H>>,
    min_key: u64,
    max_key: u64,
    trained: bool,
}

impl<H> Default for Model<H> {
    fn default() -> Self {
        Self {
            boundaries: Vec::new(),
            leaves: Vec::new(),
            clusters: Vec::new(),
            min_key: 0,
            max_key: 0,
            trained: false,
        }
    }
}

impl<H: LeafHandle> Model<H> {
    /// Create an empty, untrained model
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every sample and return to the untrained state
    pub fn clear(&mut self) {
        self.boundaries.clear();
        self.leaves.clear();
        self.clusters.clear();
        self.min_key = 0;
        self.max_key = 0;
        self.trained = false;
    }

    /// Append one sample. Order and duplicates are resolved by [`train`](Self::train).
    ///
    /// Appending to a trained model invalidates it until the next training pass.
    pub fn add_leaf(&mut self, boundary_key: u64, leaf: H) {
        self.boundaries.push(boundary_key);
        self.leaves.push(leaf);
        self.trained = false;
    }

    /// Sort and deduplicate the samples into a queryable domain.
    ///
    /// Equal keys keep the handle that appeared first in insertion order.
    /// An empty sample set leaves the model untrained.
    pub fn train(&mut self) {
        self.trained = false;
        self.clusters.clear();

        let n = self.boundaries.len();
        if n == 0 {
            return;
        }

        let monotonic = self.boundaries.windows(2).all(|w| w[0] <= w[1]);

        let mut pairs: Vec<(u64, H)> = self
            .boundaries
            .drain(..)
            .zip(self.leaves.drain(..))
            .collect();
        if !monotonic {
            sort_samples(&mut pairs);
        }
        pairs.dedup_by_key(|p| p.0);

        let (boundaries, leaves): (Vec<u64>, Vec<H>) = pairs.into_iter().unzip();
        self.boundaries = boundaries;
        self.leaves = leaves;

        self.min_key = self.boundaries[0];
        self.max_key = self.boundaries[self.boundaries.len() - 1];
        self.trained = true;

        debug!(
            samples = n,
            boundaries = self.boundaries.len(),
            monotonic,
            min_key = self.min_key,
            max_key = self.max_key,
            "trained learned model"
        );
    }

    /// Whether the last training pass produced a usable model
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Number of samples (boundaries once trained)
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Check if the model holds no samples
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Boundary keys
    pub fn boundaries(&self) -> &[u64] {
        &self.boundaries
    }

    /// Leaf handles, aligned with [`boundaries`](Self::boundaries)
    pub fn leaves(&self) -> &[H] {
        &self.leaves
    }

    /// Reserved piecewise segments; always empty
    pub fn clusters(&self) -> &[Cluster<H>] {
        &self.clusters
    }

    /// Smallest boundary key, defined only once trained
    pub fn min_key(&self) -> Option<u64> {
        self.trained.then_some(self.min_key)
    }

    /// Largest boundary key, defined only once trained
    pub fn max_key(&self) -> Option<u64> {
        self.trained.then_some(self.max_key)
    }
}

#[cfg(not(feature = "parallel"))]
fn sort_samples<H>(pairs: &mut [(u64, H)]) {
    pairs.sort_by_key(|p| p.0);
}

#[cfg(feature = "parallel")]
fn sort_samples<H: LeafHandle>(pairs: &mut [(u64, H)]) {
    use rayon::slice::ParallelSliceMut;

    // Both sorts are stable, which the first-occurrence tie-break relies on
    if pairs.len() >= PARALLEL_SORT_THRESHOLD {
        pairs.par_sort_by_key(|p| p.0);
    } else {
        pairs.sort_by_key(|p| p.0);
    }
}
