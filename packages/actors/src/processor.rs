//! Batch processor trait and registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Result type for batch processors: one output per input, in order.
pub type ProcessorResult = Result<Vec<serde_json::Value>, String>;

/// Future type for async batch processors.
pub type ProcessorFuture = Pin<Box<dyn Future<Output = ProcessorResult> + Send>>;

/// Trait for batch processors.
///
/// Implement this trait to define how batches of a task type are processed.
/// The contract is positional: the output vector must have the same length
/// and order as the input vector, or the whole batch fails.
pub trait BatchProcessor: Send + Sync + 'static {
    /// The task type this processor handles.
    fn task_type(&self) -> &str;

    /// Process an ordered batch of inputs.
    fn process(&self, inputs: Vec<serde_json::Value>) -> ProcessorFuture;
}

/// Registry for batch processors.
///
/// Maps task types to their processors for dynamic dispatch.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn BatchProcessor>>,
}

impl ProcessorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Register a processor for a task type.
    pub fn register<P: BatchProcessor>(&mut self, processor: P) {
        let task_type = processor.task_type().to_string();
        self.processors.insert(task_type, Arc::new(processor));
    }

    /// Get a processor for a task type.
    pub fn get(&self, task_type: &str) -> Option<Arc<dyn BatchProcessor>> {
        self.processors.get(task_type).cloned()
    }

    /// Check if a processor exists for a task type.
    pub fn has_processor(&self, task_type: &str) -> bool {
        self.processors.contains_key(task_type)
    }

    /// List all registered task types.
    pub fn task_types(&self) -> Vec<&str> {
        self.processors.keys().map(|s| s.as_str()).collect()
    }
}

/// A simple function-based batch processor.
pub struct FnProcessor<F>
where
    F: Fn(Vec<serde_json::Value>) -> ProcessorFuture + Send + Sync + 'static,
{
    task_type: String,
    process: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(Vec<serde_json::Value>) -> ProcessorFuture + Send + Sync + 'static,
{
    /// Create a new function-based processor.
    pub fn new(task_type: impl Into<String>, process: F) -> Self {
        Self {
            task_type: task_type.into(),
            process,
        }
    }
}

impl<F> BatchProcessor for FnProcessor<F>
where
    F: Fn(Vec<serde_json::Value>) -> ProcessorFuture + Send + Sync + 'static,
{
    fn task_type(&self) -> &str {
        &self.task_type
    }

    fn process(&self, inputs: Vec<serde_json::Value>) -> ProcessorFuture {
        (self.process)(inputs)
    }
}

/// Helper macro for creating batch processors from async closures.
#[macro_export]
macro_rules! batch_processor {
    ($task_type:expr, |$inputs:ident| $body:expr) => {
        $crate::FnProcessor::new($task_type, |$inputs: Vec<::serde_json::Value>| {
            Box::pin(async move { $body })
        })
    };
}
