//! Message types for actor communication.

use std::collections::HashMap;

use batch_core::{ConfigError, Job, JobId, Priority, ProcessorStats};
use ractor::RpcReplyPort;

/// Messages for the SchedulerActor.
#[derive(Debug)]
pub enum SchedulerMessage {
    /// Submit one work item. Replies with the created job record, which is
    /// already Completed when served from the result cache.
    Submit {
        task_type: String,
        payload: serde_json::Value,
        priority: Priority,
        metadata: HashMap<String, serde_json::Value>,
        reply: RpcReplyPort<Job>,
    },

    /// Submit several inputs for one task type, preserving order.
    SubmitBatch {
        task_type: String,
        payloads: Vec<serde_json::Value>,
        priority: Priority,
        reply: RpcReplyPort<Vec<JobId>>,
    },

    /// Request the next ready batch for a task type.
    RequestBatch {
        task_type: String,
        worker_id: String,
        reply: RpcReplyPort<Option<Vec<Job>>>,
    },

    /// List the task types that have received submissions.
    TaskTypes { reply: RpcReplyPort<Vec<String>> },

    /// Report a successfully processed batch, outputs zipped per job.
    BatchCompleted {
        task_type: String,
        worker_id: String,
        outputs: Vec<(JobId, serde_json::Value)>,
    },

    /// Report a failed batch; every listed job fails with the same error.
    BatchFailed {
        task_type: String,
        worker_id: String,
        job_ids: Vec<JobId>,
        error: String,
    },

    /// Get a job record by ID.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// Get a statistics snapshot.
    GetStats { reply: RpcReplyPort<ProcessorStats> },

    /// Evict all cached results and reset hit/miss counters.
    ClearCache,

    /// Shutdown the scheduler.
    Shutdown,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Poll for ready batches and execute the first one found.
    Heartbeat,

    /// Shutdown the worker after its current iteration.
    Shutdown,
}

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn actor: {0}")]
    Spawn(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("actor error: {0}")]
    Actor(String),

    #[error("request timed out")]
    Timeout,
}
