//! Aggregate statistics for the batch queue.

use serde::{Deserialize, Serialize};

/// Snapshot of queue-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorStats {
    /// Jobs submitted since startup (cache hits included).
    pub total_jobs: u64,
    /// Jobs that reached Completed.
    pub completed: u64,
    /// Jobs that reached Failed.
    pub failed: u64,
    /// Jobs still queued or processing.
    pub pending: u64,
    /// Batches dispatched to a processor (successful or not).
    pub batches_processed: u64,
    /// Running average number of jobs per batch.
    pub avg_batch_size: f64,
    /// Completed jobs per second of cumulative batch processing time.
    pub throughput: Option<f64>,
    /// Cache hits over all cache lookups.
    pub cache_hit_rate: Option<f64>,
    /// Current number of cached results.
    pub cache_size: usize,
}

impl ProcessorStats {
    /// Total jobs that reached a terminal state.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }

    /// Success rate as a percentage, once anything has been processed.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.processed();
        if total == 0 {
            None
        } else {
            Some((self.completed as f64 / total as f64) * 100.0)
        }
    }
}
