//! Stress tests for Stowage.
//!
//! These helpers drive a store under heavy load and concurrent access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use stowage_core::{KeyValueStore, Store, Whence};

/// Outcome of one stress run against a store.
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
    /// Tallies a run that took `duration`.
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

    /// Returns true if no operation failed.
    pub fn is_clean(&self) -> bool {
        self.failed_ops == 0
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of each value in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            value_size: 256,
            key_count: 1_000,
        }
    }
}

fn stress_key(i: usize) -> String {
    format!("stress-{i:06}")
}

fn populate(store: &Store, config: &StressConfig) {
    let data = vec![0xABu8; config.value_size];
    for i in 0..config.key_count {
        store
            .put(&stress_key(i), &data)
            .expect("Failed to populate store");
    }
}

/// Run a sequential write stress test.
pub fn stress_sequential_writes(store: &Store, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.put(&stress_key(i % config.key_count), &data) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed put/get/delete stress test.
///
/// Reads of keys deleted earlier in the run count as successful.
pub fn stress_mixed_operations(store: &Store, config: &StressConfig) -> StressTestResult {
    let data = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = stress_key(i % config.key_count);

        let result = match i % 3 {
            0 => store.put(&key, &data).map(|_| ()),
            1 => match store.get(&key) {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map(|_| ()),
            },
            _ => store.delete(&key),
        };

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run concurrent readers, each opening its own cursor and seeking around.
///
/// A read counts as failed if it returns bytes that differ from the
/// stored value.
pub fn stress_concurrent_readers(store: &Store, config: &StressConfig) -> StressTestResult {
    populate(store, config);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = store.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let key_count = config.key_count;
            let value_size = config.value_size as i64;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = stress_key((t * ops_per_thread + i) % key_count);
                    let offset = (i as i64) % value_size.max(1);

                    let ok = store.open(&key).and_then(|mut reader| {
                        reader.seek(offset, Whence::Start)?;
                        let chunk = reader.read_bytes(Some(16))?;
                        reader.close();
                        Ok(chunk.iter().all(|b| *b == 0xAB))
                    });

                    match ok {
                        Ok(true) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run concurrent writers on disjoint keys, then verify every value.
pub fn stress_concurrent_writers(store: &Store, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = store.clone();
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let value_size = config.value_size;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let key = format!("writer-{t}-{i:06}");
                    let data = vec![(t % 256) as u8; value_size];
                    let ok = store
                        .put(&key, &data)
                        .and_then(|_| store.get(&key))
                        .map(|read| read == data);

                    match ok {
                        Ok(true) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;

    fn small_config() -> StressConfig {
        StressConfig {
            operations: 400,
            threads: 4,
            value_size: 64,
            key_count: 50,
        }
    }

    #[test]
    fn memory_sequential_writes() {
        let fixture = TestStore::memory();
        let result = stress_sequential_writes(&fixture.store, &small_config());
        assert!(result.is_clean(), "{result:?}");
        assert_eq!(fixture.keys(None).unwrap().len(), 50);
    }

    #[test]
    fn memory_mixed_operations() {
        let fixture = TestStore::memory();
        let result = stress_mixed_operations(&fixture.store, &small_config());
        assert_eq!(result.total_ops, 400);
        assert_eq!(result.failed_ops, 0);
    }

    #[test]
    fn memory_concurrent_readers() {
        let fixture = TestStore::memory();
        let result = stress_concurrent_readers(&fixture.store, &small_config());
        assert_eq!(result.successful_ops, 400);
    }

    #[test]
    fn file_concurrent_readers() {
        let fixture = TestStore::file();
        let result = stress_concurrent_readers(&fixture.store, &small_config());
        assert!(result.is_clean(), "{result:?}");
        assert_eq!(result.total_ops, 400);
    }

    #[test]
    fn file_concurrent_writers() {
        let fixture = TestStore::file();
        let result = stress_concurrent_writers(&fixture.store, &small_config());
        assert_eq!(result.successful_ops, 400);
        assert_eq!(fixture.keys(None).unwrap().len(), 400);
    }
}
