//! Public facade over the scheduler and worker actors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use batch_core::{BatchConfig, Job, JobEvent, JobId, JobStatus, Priority, ProcessorStats};
use chrono::Utc;
use futures_util::future::join_all;
use ractor::{Actor, ActorRef, RpcReplyPort};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::messages::{QueueError, SchedulerMessage, WorkerMessage};
use crate::processor::ProcessorRegistry;
use crate::scheduler_actor::{SchedulerActor, SchedulerArgs};
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// How long facade calls wait on the scheduler before timing out.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a running batch queue.
///
/// Construct one per queue with [`BatchQueue::start`] and inject it into
/// callers; there is no global instance.
pub struct BatchQueue {
    scheduler: ActorRef<SchedulerMessage>,
    scheduler_handle: Option<JoinHandle<()>>,
    workers: Vec<(ActorRef<WorkerMessage>, JoinHandle<()>)>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl BatchQueue {
    /// Validate the config, then spawn the scheduler and the worker pool.
    pub async fn start(
        config: BatchConfig,
        processors: ProcessorRegistry,
    ) -> Result<Self, QueueError> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(1024);
        let (scheduler, scheduler_handle) = Actor::spawn(
            None,
            SchedulerActor,
            SchedulerArgs {
                config: config.clone(),
                event_tx: event_tx.clone(),
            },
        )
        .await
        .map_err(|e| QueueError::Spawn(e.to_string()))?;

        let processors = Arc::new(processors);
        let mut workers = Vec::with_capacity(config.worker_count);
        for n in 0..config.worker_count {
            let args = WorkerArgs {
                worker_id: format!("worker-{}", n + 1),
                scheduler: scheduler.clone(),
                processors: processors.clone(),
            };
            let (worker, handle) = Actor::spawn(None, WorkerActor, args)
                .await
                .map_err(|e| QueueError::Spawn(e.to_string()))?;
            workers.push((worker, handle));
        }

        Ok(Self {
            scheduler,
            scheduler_handle: Some(scheduler_handle),
            workers,
            event_tx,
        })
    }

    async fn call<T: Send + 'static>(
        &self,
        build: impl FnOnce(RpcReplyPort<T>) -> SchedulerMessage,
    ) -> Result<T, QueueError> {
        match ractor::rpc::call(&self.scheduler, build, Some(RPC_TIMEOUT)).await {
            Ok(ractor::rpc::CallResult::Success(value)) => Ok(value),
            Ok(ractor::rpc::CallResult::Timeout) => Err(QueueError::Timeout),
            Ok(ractor::rpc::CallResult::SenderError) => {
                Err(QueueError::Actor("reply channel dropped".to_string()))
            }
            Err(e) => Err(QueueError::Actor(e.to_string())),
        }
    }

    /// Submit one work item. The returned record is already Completed when
    /// the result was served from the cache.
    pub async fn submit(
        &self,
        task_type: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Job, QueueError> {
        let task_type = task_type.into();
        self.call(|reply| SchedulerMessage::Submit {
            task_type,
            payload,
            priority,
            metadata,
            reply,
        })
        .await
    }

    /// Submit several inputs for one task type, preserving input order.
    pub async fn submit_batch(
        &self,
        task_type: impl Into<String>,
        payloads: Vec<serde_json::Value>,
        priority: Priority,
    ) -> Result<Vec<JobId>, QueueError> {
        let task_type = task_type.into();
        self.call(|reply| SchedulerMessage::SubmitBatch {
            task_type,
            payloads,
            priority,
            reply,
        })
        .await
    }

    /// Get the full job record, or `None` for an unknown ID.
    pub async fn status(&self, job_id: JobId) -> Result<Option<Job>, QueueError> {
        self.call(|reply| SchedulerMessage::GetJob { job_id, reply })
            .await
    }

    /// Get the stored result for a job.
    ///
    /// `Ok(Some(..))` once completed, `Ok(None)` while the job is still
    /// pending, queued or processing, `Err(JobFailed)` for a failed job.
    pub async fn result(&self, job_id: JobId) -> Result<Option<serde_json::Value>, QueueError> {
        let job = self
            .status(job_id)
            .await?
            .ok_or(QueueError::JobNotFound(job_id))?;
        match job.status {
            JobStatus::Completed { result, .. } => Ok(Some(result)),
            JobStatus::Failed { error, .. } => Err(QueueError::JobFailed(error)),
            _ => Ok(None),
        }
    }

    /// Get a snapshot of queue-wide statistics.
    pub async fn statistics(&self) -> Result<ProcessorStats, QueueError> {
        self.call(|reply| SchedulerMessage::GetStats { reply }).await
    }

    /// Evict all cached results and reset hit/miss counters. Queued and
    /// in-flight jobs are unaffected.
    pub fn clear_cache(&self) -> Result<(), QueueError> {
        self.scheduler
            .send_message(SchedulerMessage::ClearCache)
            .map_err(|e| QueueError::Actor(e.to_string()))
    }

    /// Subscribe to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the worker pool and wait for each worker's current iteration.
    ///
    /// In-flight batches complete normally; still-queued jobs remain queued,
    /// and the scheduler keeps answering queries.
    pub async fn stop_workers(&mut self) {
        for (worker, _) in &self.workers {
            let _ = worker.send_message(WorkerMessage::Shutdown);
        }
        let handles: Vec<JoinHandle<()>> =
            self.workers.drain(..).map(|(_, handle)| handle).collect();
        join_all(handles).await;
        let _ = self.event_tx.send(JobEvent::WorkersStopped {
            timestamp: Utc::now(),
        });
    }

    /// Stop workers, then the scheduler.
    pub async fn shutdown(mut self) {
        self.stop_workers().await;
        let _ = self.scheduler.send_message(SchedulerMessage::Shutdown);
        if let Some(handle) = self.scheduler_handle.take() {
            let _ = handle.await;
        }
    }
}
