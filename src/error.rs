//! Error types for the leaf store and the benchmark driver
//!
//! The router itself never fails: an unavailable model degrades to "no
//! prediction". Errors only come from store input validation, config
//! validation and caller-imposed policies in the driver.

use thiserror::Error;

/// Errors that can occur outside the router's hint path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A key exceeded the store's configured maximum length
    #[error("key of {len} bytes exceeds the {max} byte limit")]
    KeyTooLong {
        /// Length of the rejected key
        len: usize,
        /// Configured limit
        max: usize,
    },
    /// Configuration error
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    /// Workload name not recognized by the driver
    #[error("unknown workload '{0}' (expected A, B, C or D)")]
    UnknownWorkload(String),
    /// Training finished without producing a usable model
    #[error("router failed to train from {samples} harvested leaves")]
    TrainingFailed {
        /// Number of samples offered to training
        samples: usize,
    },
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
