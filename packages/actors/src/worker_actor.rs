//! Worker actor for executing dispatched batches.

use std::sync::Arc;
use std::time::Duration;

use batch_core::{Job, JobId};
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::{SchedulerMessage, WorkerMessage};
use crate::processor::ProcessorRegistry;

/// How long a worker waits on a scheduler RPC before giving up the attempt.
const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an idle worker sleeps between polls.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Scheduler actor reference.
    pub scheduler: ActorRef<SchedulerMessage>,
    /// Processor registry.
    pub processors: Arc<ProcessorRegistry>,
    /// Whether the worker should continue running.
    pub running: bool,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub scheduler: ActorRef<SchedulerMessage>,
    pub processors: Arc<ProcessorRegistry>,
}

/// Worker actor that polls the scheduler and executes ready batches.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);

        let state = WorkerActorState {
            worker_id: args.worker_id,
            scheduler: args.scheduler,
            processors: args.processors,
            running: true,
        };

        // Drive the poll loop
        let myself_clone = myself.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                if myself_clone.send_message(WorkerMessage::Heartbeat).is_err() {
                    break;
                }
            }
        });

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Heartbeat => {
                if !state.running {
                    myself.stop(None);
                    return Ok(());
                }

                let task_types = ractor::rpc::call(
                    &state.scheduler,
                    |reply| SchedulerMessage::TaskTypes { reply },
                    Some(RPC_TIMEOUT),
                )
                .await;
                let Ok(ractor::rpc::CallResult::Success(task_types)) = task_types else {
                    return Ok(());
                };

                // One batch per heartbeat; remaining types get picked up on
                // the next tick.
                for task_type in task_types {
                    let result = ractor::rpc::call(
                        &state.scheduler,
                        |reply| SchedulerMessage::RequestBatch {
                            task_type: task_type.clone(),
                            worker_id: state.worker_id.clone(),
                            reply,
                        },
                        Some(RPC_TIMEOUT),
                    )
                    .await;

                    if let Ok(ractor::rpc::CallResult::Success(Some(batch))) = result {
                        execute_batch(state, &task_type, batch).await?;
                        break;
                    }
                }
            }

            WorkerMessage::Shutdown => {
                tracing::info!("Shutting down worker: {}", state.worker_id);
                state.running = false;
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}

/// Execute one dispatched batch and report the outcome to the scheduler.
///
/// Runs inline so a dispatched batch always reaches a terminal report, even
/// when a Shutdown is already queued behind the current message.
async fn execute_batch(
    state: &WorkerActorState,
    task_type: &str,
    batch: Vec<Job>,
) -> Result<(), ActorProcessingErr> {
    let job_ids: Vec<JobId> = batch.iter().map(|job| job.id).collect();

    let Some(processor) = state.processors.get(task_type) else {
        tracing::warn!(
            "{}: no processor registered for task type '{}', failing {} job(s)",
            state.worker_id,
            task_type,
            job_ids.len()
        );
        state.scheduler.send_message(SchedulerMessage::BatchFailed {
            task_type: task_type.to_string(),
            worker_id: state.worker_id.clone(),
            job_ids,
            error: format!("no processor registered for task type '{}'", task_type),
        })?;
        return Ok(());
    };

    let inputs: Vec<serde_json::Value> = batch.iter().map(|job| job.payload.clone()).collect();

    match processor.process(inputs).await {
        Ok(outputs) if outputs.len() == job_ids.len() => {
            let outputs = job_ids.into_iter().zip(outputs).collect();
            state.scheduler.send_message(SchedulerMessage::BatchCompleted {
                task_type: task_type.to_string(),
                worker_id: state.worker_id.clone(),
                outputs,
            })?;
        }
        Ok(outputs) => {
            // Contract violation: outputs must match inputs one to one.
            let error = format!(
                "processor for '{}' returned {} outputs for {} inputs",
                task_type,
                outputs.len(),
                job_ids.len()
            );
            state.scheduler.send_message(SchedulerMessage::BatchFailed {
                task_type: task_type.to_string(),
                worker_id: state.worker_id.clone(),
                job_ids,
                error,
            })?;
        }
        Err(error) => {
            state.scheduler.send_message(SchedulerMessage::BatchFailed {
                task_type: task_type.to_string(),
                worker_id: state.worker_id.clone(),
                job_ids,
                error,
            })?;
        }
    }

    Ok(())
}
