//! Configuration for the router, the leaf store and the benchmark driver

use crate::encoding::KeyEncoding;
use crate::error::{Error, Result};
use crate::flags::RuntimeFlags;
use crate::workload::Workload;

/// Interpolation used by the router to turn a key into a leaf index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// `(q - min) * (n - 1) / (max - min)`: the line through the first and
    /// last boundary. Exact on uniformly spaced boundaries.
    #[default]
    Anchored,
    /// `(q - min) * n / (max - min + 1)`: spreads the domain over `n`
    /// equal buckets.
    Proportional,
}

/// Configuration for a [`LearnedRouter`](crate::LearnedRouter)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct RouterConfig {
    /// Initial value of the enabled switch
    pub enabled: bool,
    /// Emit interval diagnostics through `tracing`
    pub debug: bool,
    /// Index interpolation strategy
    pub interpolation: Interpolation,
    /// Encoding for raw query keys; must match the store's leaf encoding
    pub encoding: KeyEncoding,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            interpolation: Interpolation::Anchored,
            encoding: KeyEncoding::default(),
        }
    }
}

impl RouterConfig {
    /// Router configuration driven by the runtime switches
    pub fn from_flags(flags: &RuntimeFlags) -> Self {
        Self {
            enabled: flags.learned,
            debug: flags.debug,
            ..Default::default()
        }
    }
}

/// Configuration for a [`LeafStore`](crate::storage::LeafStore)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// Maximum entries per leaf before it splits
    pub leaf_capacity: usize,
    /// Maximum key length in bytes
    pub max_key_len: usize,
    /// Encoding used for leaf boundary keys
    pub encoding: KeyEncoding,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 15,
            max_key_len: 255,
            encoding: KeyEncoding::default(),
        }
    }
}

impl StoreConfig {
    /// Check that the configuration describes a usable store
    pub fn validate(&self) -> Result<()> {
        if self.leaf_capacity < 2 {
            return Err(Error::InvalidConfig(format!(
                "leaf_capacity must be at least 2, got {}",
                self.leaf_capacity
            )));
        }
        if self.max_key_len == 0 {
            return Err(Error::InvalidConfig("max_key_len must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Configuration for a benchmark run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct BenchConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Total operations across all workers (also the preload size)
    pub ops: usize,
    /// Operation mix
    pub workload: Workload,
    /// Runtime switches for the learned path
    pub flags: RuntimeFlags,
    /// Store configuration
    pub store: StoreConfig,
    /// Keys looked up by the learned-vs-baseline microbenchmark
    pub microbench_keys: usize,
    /// Seed for the per-worker random generators
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            ops: 100_000,
            workload: Workload::A,
            flags: RuntimeFlags::default(),
            store: StoreConfig::default(),
            microbench_keys: 50_000,
            seed: 0xdead_beef,
        }
    }
}

impl BenchConfig {
    /// Check that the configuration describes a runnable benchmark
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be at least 1".to_string()));
        }
        if self.ops < self.threads {
            return Err(Error::InvalidConfig(format!(
                "ops ({}) must be at least the thread count ({})",
                self.ops, self.threads
            )));
        }
        self.store.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_config_from_flags() {
        let config = RouterConfig::from_flags(&RuntimeFlags { learned: false, debug: true });
        assert!(!config.enabled);
        assert!(config.debug);
        assert_eq!(config.interpolation, Interpolation::Anchored);
    }

    #[test]
    fn test_store_config_validation() {
        assert!(StoreConfig::default().validate().is_ok());

        let config = StoreConfig { leaf_capacity: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = StoreConfig { max_key_len: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bench_config_validation() {
        assert!(BenchConfig::default().validate().is_ok());

        let config = BenchConfig { threads: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = BenchConfig { threads: 8, ops: 4, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
