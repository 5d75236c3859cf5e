//! Storage module
//!
//! An ordered key-value store laid out as a chain of sorted leaves linked
//! through sibling references, plus the [`LeafChain`] view the learned
//! router reads when it harvests boundary keys.

pub mod leaf;
pub mod store;

// Re-export key types
pub use leaf::LeafId;
pub use store::{HintedLookup, LeafStore, ScanIter};

use crate::model::LeafHandle;

/// Read-only view of a store's leaf chain
///
/// Everything the router consumes from the ordered store: a way to start
/// at the smallest leaf, a sibling link, and each leaf's first key in the
/// router's 64-bit domain.
pub trait LeafChain {
    /// Handle naming one leaf
    type Handle: LeafHandle;

    /// Leaf holding the smallest keys, if the store has any leaves
    fn head(&self) -> Option<Self::Handle>;

    /// Next leaf in ascending key order.
    ///
    /// Returns `None` at the tail and for handles the store no longer
    /// recognizes.
    fn safe_next(&self, leaf: Self::Handle) -> Option<Self::Handle>;

    /// The leaf's first key, encoded into the boundary domain
    fn first_key_u64(&self, leaf: Self::Handle) -> Option<u64>;
}
