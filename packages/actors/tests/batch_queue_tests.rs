use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

use actors::{BatchQueue, FnProcessor, ProcessorRegistry, QueueError};
use batch_core::{BatchConfig, Job, JobId, JobStatus, Priority};
use serde_json::{Value, json};

/// Processor that returns every input unchanged.
fn echo_processor(task_type: &str) -> impl actors::BatchProcessor {
    FnProcessor::new(task_type, |inputs: Vec<Value>| {
        Box::pin(async move { Ok(inputs) })
    })
}

/// Processor that fails every batch with a fixed message.
fn failing_processor(task_type: &str, message: &str) -> impl actors::BatchProcessor {
    let message = message.to_string();
    FnProcessor::new(task_type, move |_inputs: Vec<Value>| {
        let message = message.clone();
        Box::pin(async move { Err(message) })
    })
}

async fn await_terminal(queue: &BatchQueue, job_id: JobId, timeout: Duration) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = queue
            .status(job_id)
            .await
            .expect("status query")
            .expect("job exists");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} still {} after {:?}",
            job_id,
            job.status.as_str(),
            timeout
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_urgent_job_dispatches_without_waiting() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("echo"));

    // max_wait is far beyond the test timeout, so completion proves the
    // expedited path
    let config = BatchConfig {
        max_batch_size: 32,
        max_wait_secs: 60.0,
        worker_count: 2,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let payload = json!({ "text": "now please" });
    let job = queue
        .submit("echo", payload.clone(), Priority::Urgent, HashMap::new())
        .await?;
    assert_eq!(job.status.as_str(), "queued");

    let done = await_terminal(&queue, job.id, Duration::from_secs(3)).await;
    assert_eq!(done.result(), Some(&payload));

    let stats = queue.statistics().await?;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.batches_processed, 1);
    assert!((stats.avg_batch_size - 1.0).abs() < f64::EPSILON);
    assert!(stats.throughput.is_some());

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_underfull_queue_waits_for_max_wait() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("sentiment"));

    let config = BatchConfig {
        max_batch_size: 32,
        max_wait_secs: 0.3,
        worker_count: 2,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let mut ids = Vec::new();
    for i in 0..3 {
        let job = queue
            .submit(
                "sentiment",
                json!({ "text": i }),
                Priority::Normal,
                HashMap::new(),
            )
            .await?;
        ids.push(job.id);
    }

    // Under-full and younger than max_wait: nothing can have dispatched yet
    for id in &ids {
        let job = queue.status(*id).await?.expect("job exists");
        assert_eq!(job.status.as_str(), "queued");
    }

    for id in &ids {
        let job = await_terminal(&queue, *id, Duration::from_secs(3)).await;
        assert_eq!(job.status.as_str(), "completed");
    }

    // All three aged past max_wait together, so they left as one batch
    let stats = queue.statistics().await?;
    assert_eq!(stats.batches_processed, 1);
    assert!((stats.avg_batch_size - 3.0).abs() < f64::EPSILON);

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_full_batch_dispatches_promptly_and_preserves_order() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("echo"));

    let config = BatchConfig {
        max_batch_size: 4,
        max_wait_secs: 60.0,
        worker_count: 2,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let payloads: Vec<Value> = (0..6).map(|i| json!({ "n": i })).collect();
    let ids = queue
        .submit_batch("echo", payloads.clone(), Priority::Normal)
        .await?;
    assert_eq!(ids.len(), 6);

    // The first four fill a batch and dispatch despite the huge max_wait
    for (i, id) in ids.iter().take(4).enumerate() {
        let job = await_terminal(&queue, *id, Duration::from_secs(3)).await;
        assert_eq!(job.result(), Some(&payloads[i]), "output order matches input order");
    }

    // The remaining two are under-full and keep waiting
    let stats = queue.statistics().await?;
    assert_eq!(stats.batches_processed, 1);
    assert!((stats.avg_batch_size - 4.0).abs() < f64::EPSILON);
    assert_eq!(stats.pending, 2);
    for id in ids.iter().skip(4) {
        let job = queue.status(*id).await?.expect("job exists");
        assert_eq!(job.status.as_str(), "queued");
    }

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_processor_failure_fails_whole_batch() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(failing_processor("boom", "kaboom"));

    let config = BatchConfig {
        worker_count: 2,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let ids = queue
        .submit_batch("boom", vec![json!(1), json!(2), json!(3)], Priority::Urgent)
        .await?;

    for id in &ids {
        let job = await_terminal(&queue, *id, Duration::from_secs(3)).await;
        let error = job.error().expect("failed job carries an error");
        assert!(error.contains("kaboom"));
    }

    let stats = queue.statistics().await?;
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.pending, 0);

    // get_result surfaces the captured message
    let err = queue.result(ids[0]).await.expect_err("job failed");
    assert!(matches!(err, QueueError::JobFailed(_)));

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_task_type_fails_at_dispatch() -> Result<(), Box<dyn Error>> {
    // Registry knows nothing about "mystery"
    let registry = ProcessorRegistry::new();
    let config = BatchConfig {
        worker_count: 1,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let job = queue
        .submit("mystery", json!({}), Priority::Urgent, HashMap::new())
        .await?;

    let done = await_terminal(&queue, job.id, Duration::from_secs(3)).await;
    let error = done.error().expect("job must not hang silently");
    assert!(error.contains("no processor registered"));

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_cache_hits_complete_immediately() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(actors::batch_processor!("echo", |inputs| Ok(inputs)));

    let config = BatchConfig {
        worker_count: 2,
        cache_results: true,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    let payload = json!({ "text": "hello" });
    let first = queue
        .submit("echo", payload.clone(), Priority::Urgent, HashMap::new())
        .await?;
    await_terminal(&queue, first.id, Duration::from_secs(3)).await;

    // Identical submissions after completion come back already Completed
    for _ in 0..4 {
        let job = queue
            .submit("echo", payload.clone(), Priority::Urgent, HashMap::new())
            .await?;
        assert_eq!(job.status.as_str(), "completed");
        assert_eq!(job.result(), Some(&payload));
    }

    let stats = queue.statistics().await?;
    assert_eq!(stats.total_jobs, 5);
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.cache_size, 1);
    let rate = stats.cache_hit_rate.expect("lookups were made");
    assert!((rate - 0.8).abs() < 1e-9, "4 hits out of 5 lookups");

    // Clearing the cache resets counters; the next submission queues again
    queue.clear_cache()?;
    let stats = queue.statistics().await?;
    assert_eq!(stats.cache_size, 0);
    assert!(stats.cache_hit_rate.is_none());

    let requeued = queue
        .submit("echo", payload.clone(), Priority::Low, HashMap::new())
        .await?;
    assert_eq!(requeued.status.as_str(), "queued");

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_workers_leaves_queued_jobs_queued() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("echo"));

    let config = BatchConfig {
        max_batch_size: 32,
        max_wait_secs: 60.0,
        worker_count: 2,
        ..BatchConfig::default()
    };
    let mut queue = BatchQueue::start(config, registry).await?;

    let ids = queue
        .submit_batch("echo", vec![json!(1), json!(2)], Priority::Normal)
        .await?;

    queue.stop_workers().await;

    // The registry still answers and nothing was dispatched
    for id in &ids {
        let job = queue.status(*id).await?.expect("job exists");
        assert_eq!(job.status.as_str(), "queued");
    }
    let stats = queue.statistics().await?;
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.batches_processed, 0);

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_rejected_at_start() {
    let config = BatchConfig {
        max_batch_size: 0,
        ..BatchConfig::default()
    };
    let result = BatchQueue::start(config, ProcessorRegistry::new()).await;
    assert!(matches!(result, Err(QueueError::Config(_))));
}

#[tokio::test]
async fn test_result_query_states() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("echo"));

    let config = BatchConfig {
        max_batch_size: 32,
        max_wait_secs: 60.0,
        worker_count: 1,
        ..BatchConfig::default()
    };
    let queue = BatchQueue::start(config, registry).await?;

    // Unknown id
    let missing = queue.result(JobId::new()).await;
    assert!(matches!(missing, Err(QueueError::JobNotFound(_))));

    // Queued job has no result yet
    let job = queue
        .submit("echo", json!("later"), Priority::Normal, HashMap::new())
        .await?;
    assert_eq!(queue.result(job.id).await?, None);

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_completed_jobs_stay_terminal() -> Result<(), Box<dyn Error>> {
    let mut registry = ProcessorRegistry::new();
    registry.register(echo_processor("echo"));

    let queue = BatchQueue::start(BatchConfig::default(), registry).await?;

    let payload = json!({ "text": "once" });
    let job = queue
        .submit("echo", payload.clone(), Priority::Urgent, HashMap::new())
        .await?;
    let done = await_terminal(&queue, job.id, Duration::from_secs(3)).await;
    let JobStatus::Completed { completed_at, .. } = done.status else {
        panic!("expected completed status");
    };

    // Give the pool time to do anything it incorrectly might; the record
    // must not move again
    tokio::time::sleep(Duration::from_millis(300)).await;
    let again = queue.status(job.id).await?.expect("job exists");
    let JobStatus::Completed {
        completed_at: later,
        ..
    } = again.status
    else {
        panic!("terminal status changed");
    };
    assert_eq!(completed_at, later);

    queue.shutdown().await;
    Ok(())
}
