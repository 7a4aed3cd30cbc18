//! Batch queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for batching and worker behavior.
///
/// Set once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of jobs dispatched in one batch.
    pub max_batch_size: usize,
    /// Maximum time a queued job waits before its queue is dispatched
    /// under-full (seconds).
    pub max_wait_secs: f64,
    /// Number of concurrent workers.
    pub worker_count: usize,
    /// Whether completed results are cached for identical resubmissions.
    pub cache_results: bool,
    /// Maximum number of cached results before FIFO eviction.
    pub max_cache_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            max_wait_secs: 2.0,
            worker_count: 4,
            cache_results: true,
            max_cache_size: 1000,
        }
    }
}

impl BatchConfig {
    /// Validate the configuration, failing fast before any worker starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.max_batch_size));
        }
        if !self.max_wait_secs.is_finite() || self.max_wait_secs <= 0.0 {
            return Err(ConfigError::InvalidMaxWait(self.max_wait_secs));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.worker_count));
        }
        if self.max_cache_size == 0 {
            return Err(ConfigError::InvalidCacheSize(self.max_cache_size));
        }
        Ok(())
    }

    /// The max wait as a [`Duration`].
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs_f64(self.max_wait_secs)
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_batch_size must be positive, got {0}")]
    InvalidBatchSize(usize),

    #[error("max_wait_secs must be a positive finite number, got {0}")]
    InvalidMaxWait(f64),

    #[error("worker_count must be positive, got {0}")]
    InvalidWorkerCount(usize),

    #[error("max_cache_size must be positive, got {0}")]
    InvalidCacheSize(usize),
}
