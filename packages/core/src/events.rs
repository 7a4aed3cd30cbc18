//! Event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, Priority, ProcessorStats};

/// Events emitted by the batch queue for real-time observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job was enqueued.
    JobEnqueued { job: Job, timestamp: DateTime<Utc> },
    /// A submission was answered straight from the result cache.
    CacheHit {
        job_id: JobId,
        task_type: String,
        timestamp: DateTime<Utc>,
    },
    /// A batch of jobs was handed to a worker.
    BatchDispatched {
        task_type: String,
        priority: Priority,
        size: usize,
        timestamp: DateTime<Utc>,
    },
    /// A job completed successfully.
    JobCompleted {
        job_id: JobId,
        task_type: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job failed.
    JobFailed {
        job_id: JobId,
        task_type: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// Aggregate statistics changed.
    StatsUpdated {
        stats: ProcessorStats,
        timestamp: DateTime<Utc>,
    },
    /// The worker pool was stopped.
    WorkersStopped { timestamp: DateTime<Utc> },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobEnqueued { timestamp, .. } => *timestamp,
            JobEvent::CacheHit { timestamp, .. } => *timestamp,
            JobEvent::BatchDispatched { timestamp, .. } => *timestamp,
            JobEvent::JobCompleted { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
            JobEvent::StatsUpdated { timestamp, .. } => *timestamp,
            JobEvent::WorkersStopped { timestamp } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            JobEvent::JobEnqueued { job, .. } => Some(job.id),
            JobEvent::CacheHit { job_id, .. } => Some(*job_id),
            JobEvent::JobCompleted { job_id, .. } => Some(*job_id),
            JobEvent::JobFailed { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobEnqueued { job, .. } => {
                format!("Job {} enqueued for '{}'", job.id, job.task_type)
            }
            JobEvent::CacheHit {
                job_id, task_type, ..
            } => format!("Job {} served from cache ('{}')", job_id, task_type),
            JobEvent::BatchDispatched {
                task_type,
                priority,
                size,
                ..
            } => format!("Dispatched {} {} job(s) for '{}'", size, priority, task_type),
            JobEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            JobEvent::JobFailed { job_id, error, .. } => {
                format!("Job {} failed: {}", job_id, error)
            }
            JobEvent::StatsUpdated { stats, .. } => {
                format!("Stats: {} pending", stats.pending)
            }
            JobEvent::WorkersStopped { .. } => "Worker pool stopped".to_string(),
        }
    }
}
