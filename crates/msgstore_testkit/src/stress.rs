//! Stress tests for the message store.
//!
//! These drive the store from several threads at once, with shard
//! capacities small enough that overflow and recovery run constantly.

use crate::fixtures::{due_entity, NOW};
use msgstore_core::{shard_key, MessageStore, SHARD_COUNT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of the message body in bytes.
    pub body_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            body_size: 128,
        }
    }
}

/// Saves from every thread at once, spreading messages over all shards.
///
/// Returns the result and the identifiers that were saved successfully.
pub fn stress_concurrent_saves(
    store: &MessageStore,
    config: &StressConfig,
) -> (StressTestResult, Vec<String>) {
    let body = vec![0xABu8; config.body_size];
    let start = Instant::now();

    let per_thread: Vec<(usize, Vec<String>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let body = body.clone();
                scope.spawn(move || {
                    let mut failed = 0usize;
                    let mut saved = Vec::with_capacity(config.operations);
                    for i in 0..config.operations {
                        let mut entity = due_entity(t + i, NOW);
                        entity.body.clone_from(&body);
                        let id = entity.message_id.clone();
                        if store.save(entity) {
                            saved.push(id);
                        } else {
                            failed += 1;
                        }
                    }
                    (failed, saved)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect()
    });

    let failed = per_thread.iter().map(|(f, _)| f).sum();
    let saved: Vec<String> = per_thread.into_iter().flat_map(|(_, s)| s).collect();
    let result = StressTestResult::new(saved.len(), failed, start.elapsed());
    (result, saved)
}

/// Runs savers, readers and redelivery scanners side by side.
///
/// Scanners acknowledge every message they are handed by deleting it, the
/// way a broker does once all consumer groups succeeded.
pub fn stress_mixed_operations(store: &MessageStore, config: &StressConfig) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let successful = &successful;
            let failed = &failed;
            scope.spawn(move || {
                for i in 0..config.operations {
                    let ok = match i % 4 {
                        0 | 1 => store.save(due_entity(t * 7 + i, NOW)),
                        2 => {
                            let key = shard_key(i % SHARD_COUNT);
                            let (_, page) = store.page_query_entity(&key, NOW, 0, 16);
                            page.iter().all(|e| store.delete(&e.message_id))
                        }
                        _ => {
                            store.query(&format!("missing{:x}", i % 16));
                            true
                        }
                    };
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Acts as the broker's redelivery sweep until the store and its overflow
/// log are empty or `timeout` passes.
///
/// Every message handed out is acknowledged by deleting it. Returns the
/// identifiers in the order they were delivered.
pub fn redeliver_all(store: &MessageStore, timeout: Duration) -> Vec<String> {
    let deadline = Instant::now() + timeout;
    let mut delivered = Vec::new();

    loop {
        for shard in 0..store.recover_num() {
            let (_, page) = store.page_query_entity(&shard_key(shard), NOW, 0, 64);
            for entity in page {
                store.delete(&entity.message_id);
                delivered.push(entity.message_id);
            }
        }
        if (store.is_empty() && store.segment_count() == 0) || Instant::now() >= deadline {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;

    fn small_config() -> StressConfig {
        StressConfig {
            operations: 300,
            threads: 4,
            body_size: 32,
        }
    }

    fn assert_all_delivered(store: &MessageStore, mut saved: Vec<String>) {
        let mut delivered = redeliver_all(store, Duration::from_secs(10));
        assert_eq!(delivered.len(), saved.len());
        saved.sort();
        delivered.sort();
        assert_eq!(delivered, saved);
    }

    #[test]
    fn test_concurrent_saves_survive_overflow() {
        let store = TestStore::memory(8);
        let (result, saved) = stress_concurrent_saves(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(saved.len(), 1_200);
        assert!(store.stats().overflow_transitions() >= 1);

        assert_all_delivered(&store, saved);
        assert_eq!(store.segment_count(), 0);
    }

    #[test]
    fn test_concurrent_saves_on_disk() {
        let store = TestStore::file(16);
        let (result, saved) = stress_concurrent_saves(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert_all_delivered(&store, saved);
    }

    #[test]
    fn test_mixed_operations() {
        let store = TestStore::memory(8);
        let result = stress_mixed_operations(&store, &small_config());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 1_200);
    }
}
