//! Scheduler actor owning all mutable queue state.
//!
//! The job registry, per-task-type priority queues, result cache and
//! statistics accumulators live here and are mutated only from this actor's
//! mailbox, so no lock guards any of them.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use batch_core::{
    BatchConfig, Job, JobEvent, JobId, JobStatus, Priority, ProcessorStats, ResultCache,
};
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;

use crate::messages::SchedulerMessage;

/// Four FIFO queues for one task type, one per priority level.
#[derive(Debug, Default)]
struct TaskQueues {
    levels: [VecDeque<JobId>; 4],
}

impl TaskQueues {
    fn level_mut(&mut self, priority: Priority) -> &mut VecDeque<JobId> {
        &mut self.levels[priority as usize]
    }

    fn push(&mut self, priority: Priority, job_id: JobId) {
        self.level_mut(priority).push_back(job_id);
    }
}

/// State for the scheduler actor.
pub struct SchedulerState {
    config: BatchConfig,
    /// All jobs by ID, retained for status queries.
    jobs: HashMap<JobId, Job>,
    /// Priority queues per task type. A task type stays known (and polled
    /// by workers) once it has received a submission.
    queues: HashMap<String, TaskQueues>,
    cache: ResultCache,
    total_jobs: u64,
    completed: u64,
    failed: u64,
    batches_processed: u64,
    batched_jobs: u64,
    processing_time: Duration,
    event_tx: broadcast::Sender<JobEvent>,
}

impl SchedulerState {
    /// Create scheduler state from a validated config.
    pub fn new(config: BatchConfig, event_tx: broadcast::Sender<JobEvent>) -> Self {
        let cache = ResultCache::new(config.cache_results, config.max_cache_size);
        Self {
            config,
            jobs: HashMap::new(),
            queues: HashMap::new(),
            cache,
            total_jobs: 0,
            completed: 0,
            failed: 0,
            batches_processed: 0,
            batched_jobs: 0,
            processing_time: Duration::ZERO,
            event_tx,
        }
    }

    /// Broadcast an event, ignoring missing subscribers.
    fn broadcast(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }

    fn update_stats(&self) {
        self.broadcast(JobEvent::StatsUpdated {
            stats: self.snapshot(),
            timestamp: Utc::now(),
        });
    }

    fn snapshot(&self) -> ProcessorStats {
        let avg_batch_size = if self.batches_processed == 0 {
            0.0
        } else {
            self.batched_jobs as f64 / self.batches_processed as f64
        };
        let processing_secs = self.processing_time.as_secs_f64();
        let throughput = if processing_secs > 0.0 {
            Some(self.completed as f64 / processing_secs)
        } else {
            None
        };
        ProcessorStats {
            total_jobs: self.total_jobs,
            completed: self.completed,
            failed: self.failed,
            pending: self.total_jobs - self.completed - self.failed,
            batches_processed: self.batches_processed,
            avg_batch_size,
            throughput,
            cache_hit_rate: self.cache.hit_rate(),
            cache_size: self.cache.len(),
        }
    }

    /// Create one job: answered from the cache when possible, queued
    /// otherwise.
    fn submit_one(
        &mut self,
        task_type: String,
        payload: serde_json::Value,
        priority: Priority,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Job {
        self.total_jobs += 1;
        let key = ResultCache::key(&task_type, &payload);

        if let Some(result) = self.cache.lookup(key) {
            let now = Utc::now();
            let mut job = Job::new(task_type, payload)
                .with_priority(priority)
                .with_metadata(metadata);
            job.status = JobStatus::Completed {
                started_at: now,
                completed_at: now,
                result,
            };
            job.updated_at = now;
            self.completed += 1;
            self.jobs.insert(job.id, job.clone());

            self.broadcast(JobEvent::CacheHit {
                job_id: job.id,
                task_type: job.task_type.clone(),
                timestamp: now,
            });
            self.broadcast(JobEvent::JobCompleted {
                job_id: job.id,
                task_type: job.task_type.clone(),
                duration_ms: 0,
                timestamp: now,
            });
            self.update_stats();
            return job;
        }

        let mut job = Job::new(task_type, payload)
            .with_priority(priority)
            .with_metadata(metadata);
        job.status = JobStatus::Queued;
        job.updated_at = Utc::now();
        self.jobs.insert(job.id, job.clone());
        self.queues
            .entry(job.task_type.clone())
            .or_default()
            .push(priority, job.id);

        self.broadcast(JobEvent::JobEnqueued {
            job: job.clone(),
            timestamp: job.updated_at,
        });
        self.update_stats();
        job
    }

    /// Select the next ready batch for a task type, if any.
    ///
    /// Levels are scanned Urgent down to Low; only the first non-empty level
    /// is examined. Its queue dispatches when it is full, its oldest job has
    /// waited past the limit, or the level is expedited (High/Urgent).
    fn next_batch(&mut self, task_type: &str) -> Option<Vec<Job>> {
        let queues = self.queues.get_mut(task_type)?;
        let now = Utc::now();
        let max_wait_ms = (self.config.max_wait_secs * 1000.0) as i64;

        for priority in Priority::DESCENDING {
            let level = queues.level_mut(priority);
            if level.is_empty() {
                continue;
            }

            let oldest_wait_ms = level
                .front()
                .and_then(|id| self.jobs.get(id))
                .map(|job| (now - job.created_at).num_milliseconds().max(0))
                .unwrap_or(0);

            let ready = level.len() >= self.config.max_batch_size
                || oldest_wait_ms >= max_wait_ms
                || priority.is_expedited();
            if !ready {
                return None;
            }

            let take = level.len().min(self.config.max_batch_size);
            let mut batch = Vec::with_capacity(take);
            for _ in 0..take {
                let Some(id) = level.pop_front() else { break };
                if let Some(job) = self.jobs.get_mut(&id)
                    && matches!(job.status, JobStatus::Queued)
                {
                    job.status = JobStatus::Processing { started_at: now };
                    job.updated_at = now;
                    batch.push(job.clone());
                }
            }
            if batch.is_empty() {
                return None;
            }
            return Some(batch);
        }

        None
    }

    /// Apply batch outputs to their jobs, in order, and feed the cache.
    fn complete_batch(&mut self, outputs: Vec<(JobId, serde_json::Value)>) {
        let now = Utc::now();
        let mut earliest_start: Option<DateTime<Utc>> = None;
        let mut applied = 0u64;
        let mut events = Vec::with_capacity(outputs.len());

        for (job_id, output) in outputs {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                continue;
            };
            let JobStatus::Processing { started_at } = job.status else {
                continue;
            };

            let key = ResultCache::key(&job.task_type, &job.payload);
            self.cache.insert(key, output.clone());

            job.status = JobStatus::Completed {
                started_at,
                completed_at: now,
                result: output,
            };
            job.updated_at = now;

            earliest_start = Some(earliest_start.map_or(started_at, |e: DateTime<Utc>| {
                e.min(started_at)
            }));
            applied += 1;
            self.completed += 1;
            events.push(JobEvent::JobCompleted {
                job_id,
                task_type: job.task_type.clone(),
                duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
                timestamp: now,
            });
        }

        for event in events {
            self.broadcast(event);
        }
        self.record_batch(applied, earliest_start, now);
    }

    /// Fail every job of a batch with the same captured error.
    fn fail_batch(&mut self, job_ids: Vec<JobId>, error: &str) {
        let now = Utc::now();
        let mut earliest_start: Option<DateTime<Utc>> = None;
        let mut applied = 0u64;
        let mut events = Vec::with_capacity(job_ids.len());

        for job_id in job_ids {
            let Some(job) = self.jobs.get_mut(&job_id) else {
                continue;
            };
            let JobStatus::Processing { started_at } = job.status else {
                continue;
            };

            job.status = JobStatus::Failed {
                started_at,
                failed_at: now,
                error: error.to_string(),
            };
            job.updated_at = now;

            earliest_start = Some(earliest_start.map_or(started_at, |e: DateTime<Utc>| {
                e.min(started_at)
            }));
            applied += 1;
            self.failed += 1;
            events.push(JobEvent::JobFailed {
                job_id,
                task_type: job.task_type.clone(),
                error: error.to_string(),
                timestamp: now,
            });
        }

        for event in events {
            self.broadcast(event);
        }
        self.record_batch(applied, earliest_start, now);
    }

    fn record_batch(
        &mut self,
        applied: u64,
        earliest_start: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        if applied == 0 {
            return;
        }
        self.batches_processed += 1;
        self.batched_jobs += applied;
        if let Some(started_at) = earliest_start {
            self.processing_time += (now - started_at).to_std().unwrap_or_default();
        }
        self.update_stats();
    }
}

/// Arguments for spawning the scheduler actor.
pub struct SchedulerArgs {
    pub config: BatchConfig,
    pub event_tx: broadcast::Sender<JobEvent>,
}

/// Scheduler actor that owns registry, queues, cache and statistics.
pub struct SchedulerActor;

impl Actor for SchedulerActor {
    type Msg = SchedulerMessage;
    type State = SchedulerState;
    type Arguments = SchedulerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting batch scheduler (batch size {}, max wait {}s)",
            args.config.max_batch_size,
            args.config.max_wait_secs
        );
        Ok(SchedulerState::new(args.config, args.event_tx))
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SchedulerMessage::Submit {
                task_type,
                payload,
                priority,
                metadata,
                reply,
            } => {
                let job = state.submit_one(task_type, payload, priority, metadata);
                let _ = reply.send(job);
            }

            SchedulerMessage::SubmitBatch {
                task_type,
                payloads,
                priority,
                reply,
            } => {
                let mut job_ids = Vec::with_capacity(payloads.len());
                for payload in payloads {
                    let job =
                        state.submit_one(task_type.clone(), payload, priority, HashMap::new());
                    job_ids.push(job.id);
                }
                let _ = reply.send(job_ids);
            }

            SchedulerMessage::RequestBatch {
                task_type,
                worker_id,
                reply,
            } => {
                let batch = state.next_batch(&task_type);
                if let Some(jobs) = &batch {
                    tracing::debug!(
                        "Dispatching {} '{}' job(s) to {}",
                        jobs.len(),
                        task_type,
                        worker_id
                    );
                    state.broadcast(JobEvent::BatchDispatched {
                        task_type: task_type.clone(),
                        priority: jobs[0].priority,
                        size: jobs.len(),
                        timestamp: Utc::now(),
                    });
                }
                let _ = reply.send(batch);
            }

            SchedulerMessage::TaskTypes { reply } => {
                let _ = reply.send(state.queues.keys().cloned().collect());
            }

            SchedulerMessage::BatchCompleted {
                task_type,
                worker_id,
                outputs,
            } => {
                tracing::debug!(
                    "{} completed {} '{}' job(s)",
                    worker_id,
                    outputs.len(),
                    task_type
                );
                state.complete_batch(outputs);
            }

            SchedulerMessage::BatchFailed {
                task_type,
                worker_id,
                job_ids,
                error,
            } => {
                tracing::warn!(
                    "{} failed a batch of {} '{}' job(s): {}",
                    worker_id,
                    job_ids.len(),
                    task_type,
                    error
                );
                state.fail_batch(job_ids, &error);
            }

            SchedulerMessage::GetJob { job_id, reply } => {
                let _ = reply.send(state.jobs.get(&job_id).cloned());
            }

            SchedulerMessage::GetStats { reply } => {
                let _ = reply.send(state.snapshot());
            }

            SchedulerMessage::ClearCache => {
                tracing::info!("Clearing result cache ({} entries)", state.cache.len());
                state.cache.clear();
                state.update_stats();
            }

            SchedulerMessage::Shutdown => {
                tracing::info!("Shutting down batch scheduler");
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}
