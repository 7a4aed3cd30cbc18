use batch_core::{BatchConfig, Job, JobStatus, Priority, ResultCache};
use serde_json::json;

#[test]
fn test_cache_fifo_eviction() {
    let mut cache = ResultCache::new(true, 3);

    let keys: Vec<u64> = (0..4)
        .map(|i| ResultCache::key("sentiment", &json!({ "text": i })))
        .collect();

    for (i, key) in keys.iter().enumerate().take(3) {
        cache.insert(*key, json!({ "score": i }));
    }
    assert_eq!(cache.len(), 3);

    // Inserting a fourth entry evicts the oldest, never grows past capacity
    cache.insert(keys[3], json!({ "score": 3 }));
    assert_eq!(cache.len(), 3);
    assert!(cache.lookup(keys[0]).is_none());
    assert!(cache.lookup(keys[1]).is_some());
    assert!(cache.lookup(keys[3]).is_some());
}

#[test]
fn test_cache_counters_and_clear() {
    let mut cache = ResultCache::new(true, 10);
    let key = ResultCache::key("echo", &json!("hello"));

    assert!(cache.lookup(key).is_none());
    cache.insert(key, json!("HELLO"));
    assert_eq!(cache.lookup(key), Some(json!("HELLO")));
    assert_eq!(cache.lookup(key), Some(json!("HELLO")));

    assert_eq!(cache.hits(), 2);
    assert_eq!(cache.misses(), 1);
    let rate = cache.hit_rate().expect("lookups were made");
    assert!((rate - 2.0 / 3.0).abs() < 1e-9);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 0);
    assert!(cache.hit_rate().is_none());
}

#[test]
fn test_cache_key_distinguishes_task_type_and_payload() {
    let payload = json!({ "text": "same" });
    let a = ResultCache::key("sentiment", &payload);
    let b = ResultCache::key("keywords", &payload);
    let c = ResultCache::key("sentiment", &json!({ "text": "other" }));
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_eq!(a, ResultCache::key("sentiment", &payload));
}

#[test]
fn test_disabled_cache_is_a_noop() {
    let mut cache = ResultCache::new(false, 10);
    let key = ResultCache::key("echo", &json!(1));

    cache.insert(key, json!(2));
    assert!(cache.lookup(key).is_none());
    assert!(cache.is_empty());
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.misses(), 0);
}

#[test]
fn test_config_validation_fails_fast() {
    assert!(BatchConfig::default().validate().is_ok());

    let zero_batch = BatchConfig {
        max_batch_size: 0,
        ..BatchConfig::default()
    };
    assert!(zero_batch.validate().is_err());

    let negative_wait = BatchConfig {
        max_wait_secs: -1.0,
        ..BatchConfig::default()
    };
    assert!(negative_wait.validate().is_err());

    let nan_wait = BatchConfig {
        max_wait_secs: f64::NAN,
        ..BatchConfig::default()
    };
    assert!(nan_wait.validate().is_err());

    let zero_workers = BatchConfig {
        worker_count: 0,
        ..BatchConfig::default()
    };
    assert!(zero_workers.validate().is_err());

    let zero_cache = BatchConfig {
        max_cache_size: 0,
        ..BatchConfig::default()
    };
    assert!(zero_cache.validate().is_err());
}

#[test]
fn test_priority_ordering() {
    assert!(Priority::Low < Priority::Normal);
    assert!(Priority::Normal < Priority::High);
    assert!(Priority::High < Priority::Urgent);

    assert_eq!(Priority::DESCENDING[0], Priority::Urgent);
    assert_eq!(Priority::DESCENDING[3], Priority::Low);

    assert!(Priority::Urgent.is_expedited());
    assert!(Priority::High.is_expedited());
    assert!(!Priority::Normal.is_expedited());
    assert!(!Priority::Low.is_expedited());
}

#[test]
fn test_job_status_helpers() {
    let job = Job::new("sentiment", json!({ "text": "fine" })).with_priority(Priority::High);
    assert_eq!(job.status.as_str(), "pending");
    assert!(!job.status.is_terminal());
    assert!(job.result().is_none());
    assert!(job.error().is_none());

    let now = chrono::Utc::now();
    let completed = JobStatus::Completed {
        started_at: now,
        completed_at: now,
        result: json!("ok"),
    };
    assert!(completed.is_terminal());
    assert_eq!(completed.as_str(), "completed");

    let failed = JobStatus::Failed {
        started_at: now,
        failed_at: now,
        error: "boom".to_string(),
    };
    assert!(failed.is_terminal());
    assert_eq!(failed.as_str(), "failed");
}
