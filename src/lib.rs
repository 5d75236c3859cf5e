//! Learned Router: interpolation-based leaf prediction for ordered stores
//!
//! This crate provides a small learned index that predicts which leaf of an
//! ordered, leaf-linked store owns a key. The router is a hint: every
//! prediction is validated by the store, so a wrong guess costs a fallback
//! lookup but never a wrong answer.
//!
//! ```
//! use learned_router::{LearnedRouter, LeafStore, RouterConfig, make_key};
//!
//! let mut store = LeafStore::default();
//! for i in 0..1_000 {
//!     store.insert(make_key(i).as_bytes(), b"v").unwrap();
//! }
//!
//! let mut router = LearnedRouter::new(RouterConfig::default());
//! router.harvest(&store);
//! router.train();
//!
//! let key = make_key(421);
//! let hint = router.predict_key(key.as_bytes());
//! let found = store.get_hinted(key.as_bytes(), hint);
//! assert_eq!(found.value, Some(b"v".as_slice()));
//! ```

#![warn(missing_docs)]

/// Router, store and benchmark configuration
pub mod config;

/// Byte key to `u64` encodings
pub mod encoding;

/// Error types
pub mod error;

/// Process-wide runtime switches read from the environment
pub mod flags;

/// Sorted boundary model
pub mod model;

/// Learned leaf router
pub mod router;

/// Prediction outcome counters
pub mod stats;

/// Leaf-linked ordered store
pub mod storage;

/// Benchmark driver
pub mod workload;


// Re-exports
pub use config::{BenchConfig, Interpolation, RouterConfig, StoreConfig};
pub use encoding::{KeyEncoding, make_key};
pub use error::{Error, Result};
pub use flags::RuntimeFlags;
pub use model::{Cluster, LeafHandle, Model};
pub use router::{LearnedIndex, LearnedRouter, classify_prediction};
pub use stats::{FeedbackTally, PredictionOutcome, RouterStats};
pub use storage::{HintedLookup, LeafChain, LeafId, LeafStore};
pub use workload::{BenchReport, MicrobenchReport, Workload, run_benchmark};
