//! Engine configuration.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Numeric and parallelization settings for a density-matrix state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Magnitudes below this are dropped from ket-formatted output.
    pub chop_threshold: f64,
    /// Loops over more than `2^parallel_threshold` elements may run in
    /// parallel. Counted in superoperator qubits, i.e. twice the
    /// density-matrix qubits.
    pub parallel_threshold: usize,
    /// Worker threads for data-parallel loops; 1 disables parallelism.
    pub threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chop_threshold: 1e-10,
            parallel_threshold: 14,
            threads: 1,
        }
    }
}

impl EngineConfig {
    /// Set the thread budget.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the parallelization threshold.
    #[must_use]
    pub fn with_parallel_threshold(mut self, qubits: usize) -> Self {
        self.parallel_threshold = qubits;
        self
    }
}

/// Data-parallel execution policy derived from an [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct Parallelism {
    threshold: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl Parallelism {
    /// Run everything on the calling thread.
    pub fn serial() -> Self {
        Self {
            threshold: usize::MAX,
            pool: None,
        }
    }

    /// Build the policy, spawning a dedicated pool when `threads > 1`.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        if config.threads <= 1 {
            return Ok(Self {
                threshold: config.parallel_threshold,
                pool: None,
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        Ok(Self {
            threshold: config.parallel_threshold,
            pool: Some(Arc::new(pool)),
        })
    }

    /// Whether a loop over `len` elements should run in parallel.
    #[inline]
    pub fn enabled_for(&self, len: usize) -> bool {
        self.pool.is_some()
            && u32::try_from(self.threshold)
                .ok()
                .and_then(|t| 1usize.checked_shl(t))
                .is_some_and(|limit| len > limit)
    }

    /// Run `f` inside the pool, or inline when there is none.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::serial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.chop_threshold, 1e-10);
        assert_eq!(config.parallel_threshold, 14);
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"threads": 4}"#).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.parallel_threshold, 14);
    }

    #[test]
    fn test_parallelism_threshold() {
        let serial = Parallelism::from_config(&EngineConfig::default()).unwrap();
        assert!(!serial.enabled_for(1 << 20));

        let config = EngineConfig::default()
            .with_threads(2)
            .with_parallel_threshold(4);
        let parallel = Parallelism::from_config(&config).unwrap();
        assert!(!parallel.enabled_for(16));
        assert!(parallel.enabled_for(17));
        assert_eq!(parallel.install(|| 3 + 4), 7);
    }
}
