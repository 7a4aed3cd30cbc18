//! Actor system for the batch queue.
//!
//! This crate provides the Ractor-based runtime for batching submitted
//! work items and executing them on a worker pool.
//!
//! # Architecture
//!
//! - `SchedulerActor` - Single owner of the job registry, priority queues,
//!   result cache and statistics
//! - `WorkerActor` - Polls the scheduler for ready batches and runs the
//!   registered processor
//! - `BatchQueue` - Facade that spawns both and wraps the message protocol
//!
//! # Usage
//!
//! ```ignore
//! use actors::{BatchQueue, ProcessorRegistry, batch_processor};
//! use batch_core::{BatchConfig, Priority};
//!
//! let mut registry = ProcessorRegistry::new();
//! registry.register(batch_processor!("echo", |inputs| Ok(inputs)));
//!
//! let queue = BatchQueue::start(BatchConfig::default(), registry).await?;
//! let job = queue.submit("echo", payload, Priority::Normal, Default::default()).await?;
//! ```

mod messages;
mod pool;
mod processor;
mod scheduler_actor;
mod worker_actor;

pub use messages::{QueueError, SchedulerMessage, WorkerMessage};
pub use pool::BatchQueue;
pub use processor::{
    BatchProcessor, FnProcessor, ProcessorFuture, ProcessorRegistry, ProcessorResult,
};
pub use scheduler_actor::{SchedulerActor, SchedulerArgs, SchedulerState};
pub use worker_actor::{WorkerActor, WorkerArgs};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
