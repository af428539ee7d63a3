//! Integration tests for the cache module
//!
//! These tests verify the complete cache functionality including:
//! - Sharing one cache between spawned tasks
//! - Single-flight loads under real parallelism
//! - Loads that outlive an aborted caller
//! - Background cleanup of expired entries
//! - Timing records around cached loads

use codeassist_core::{
    start_auto_cleanup, AssistError, CacheConfig, InvalidationReason, PerformanceMonitor, TtlCache,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_misses_load_once_per_key() {
    let cache =
        Arc::new(TtlCache::<String, usize>::new("parallel", CacheConfig::results()).unwrap());
    let loads = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            tokio::spawn(async move {
                let key = format!("key{}", i % 4);
                cache
                    .get_or_try_insert_with(key.clone(), move || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(key.len())
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 4);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 4);
    assert_eq!(cache.len().await, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_waiters_share_failure() {
    let cache = Arc::new(
        TtlCache::<&'static str, String>::new("failing", CacheConfig::components()).unwrap(),
    );
    let loads = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            tokio::spawn(async move {
                cache
                    .get_or_try_insert_with("slot", move || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err(AssistError::ConstructionFailure("model weights missing".into()))
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(
            task.await.unwrap(),
            Err(AssistError::ConstructionFailure("model weights missing".into()))
        );
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(cache.is_empty().await);
    assert_eq!(cache.in_flight().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_aborted_caller_does_not_cancel_the_load() {
    let cache = Arc::new(
        TtlCache::<&'static str, String>::new("aborted", CacheConfig::results()).unwrap(),
    );
    let loads = Arc::new(AtomicUsize::new(0));

    let caller = {
        let cache = Arc::clone(&cache);
        let loads = Arc::clone(&loads);
        tokio::spawn(async move {
            cache
                .get_or_try_insert_with("answer", move || async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok("generated".to_string())
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.in_flight().await, 0);
    assert_eq!(cache.get(&"answer").await, Some("generated".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_auto_cleanup_removes_expired_entries() {
    let config = CacheConfig::builder()
        .default_ttl(Duration::from_secs(300))
        .cleanup_interval(Duration::from_secs(60))
        .build();
    let cache = Arc::new(TtlCache::<u32, u32>::new("cleanup", config).unwrap());

    cache.insert(1, 10).await;
    cache.insert(2, 20).await;

    let cleanup = tokio::spawn(start_auto_cleanup(Arc::clone(&cache)));

    tokio::time::sleep(Duration::from_secs(250)).await;
    assert_eq!(cache.len().await, 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(cache.len().await, 0);
    assert_eq!(cache.stats().await.evictions_ttl, 2);

    cleanup.abort();
}

#[tokio::test]
async fn test_single_slot_replacement() {
    let cache = TtlCache::<(), u64>::new("slot", CacheConfig::components()).unwrap();

    cache.insert((), 1).await;
    cache.insert((), 2).await;

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.get(&()).await, Some(2));
    assert_eq!(cache.stats().await.evictions_size, 0);

    let event = cache.clear().await;
    assert_eq!(event.reason, InvalidationReason::Cleared);
    assert_eq!(event.count, 1);
}

#[tokio::test]
async fn test_timing_records_only_wrap_misses() {
    let cache = TtlCache::<String, String>::new("timed", CacheConfig::results()).unwrap();
    let monitor = Arc::new(PerformanceMonitor::new());

    for _ in 0..3 {
        let monitor = Arc::clone(&monitor);
        cache
            .get_or_try_insert_with("query".to_string(), move || async move {
                monitor
                    .track("similarity_search", async { Ok("docs".to_string()) })
                    .await
            })
            .await
            .unwrap();
    }

    let summary = monitor.summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].count, 1);
}
