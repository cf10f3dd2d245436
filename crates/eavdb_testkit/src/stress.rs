//! Stress tests for EavDB.
//!
//! These helpers drive a store under heavy load and concurrent access.

use eavdb_core::{Entity, EntityStore, Filter, FilterItem, IntegerOp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Kind used by every stress helper.
pub const STRESS_KIND: &str = "stress";

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
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of entities written before read tests.
    pub entity_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            entity_count: 1_000,
        }
    }
}

fn stress_entity(n: usize) -> Entity {
    Entity::new(STRESS_KIND)
        .expect("valid kind")
        .with("n", n as i64)
        .with("even", n % 2 == 0)
        .with("label", format!("entity-{n}"))
}

fn populate(store: &EntityStore, count: usize) {
    for n in 0..count {
        let _ = store.put(&mut stress_entity(n));
    }
}

fn tally(result: &eavdb_core::CoreResult<()>, successful: &AtomicUsize, failed: &AtomicUsize) {
    match result {
        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
    };
}

/// Run a sequential put stress test.
pub fn stress_sequential_puts(store: &EntityStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for n in 0..config.operations {
        match store.put(&mut stress_entity(n)) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent query stress test.
///
/// Every thread alternates numeric range queries and id lookups.
pub fn stress_concurrent_queries(store: Arc<EntityStore>, config: &StressConfig) -> StressTestResult {
    populate(&store, config.entity_count);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);
    let entity_count = config.entity_count.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let n = (t * ops_per_thread + i) % entity_count;
                    let result = if i % 2 == 0 {
                        Filter::new(
                            STRESS_KIND,
                            FilterItem::integer("n", IntegerOp::Gt, n as i64),
                        )
                        .and_then(|filter| store.query_first_id(&filter))
                        .map(|_| ())
                    } else {
                        store.get(eavdb_core::EntityId::new(n as i64 + 1)).map(|_| ())
                    };
                    tally(&result, &successful, &failed);
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

/// Run a mixed reader/writer stress test.
///
/// Half of the threads query, the other half put, replace and delete.
pub fn stress_readers_and_writers(
    store: Arc<EntityStore>,
    config: &StressConfig,
) -> StressTestResult {
    populate(&store, config.entity_count);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let threads = config.threads.max(2);
    let ops_per_thread = config.operations / threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let evens = Filter::new(STRESS_KIND, FilterItem::boolean("even", true))
                    .expect("valid filter");
                for i in 0..ops_per_thread {
                    let result = if t % 2 == 0 {
                        store.query_ids(&evens).map(|_| ())
                    } else {
                        store.transaction(|s| {
                            let mut entity = stress_entity(i);
                            let id = s.put(&mut entity)?;
                            entity.set("n", -1);
                            s.put(&mut entity)?;
                            if i % 3 == 0 {
                                s.delete(id)?;
                            }
                            Ok(())
                        })
                    };
                    tally(&result, &successful, &failed);
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

/// Run a transaction abort stress test.
///
/// Every other unit of work fails after writing; its write stays.
pub fn stress_transaction_aborts(store: &EntityStore, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for n in 0..config.operations {
        let should_fail = n % 2 == 0;

        let result = store.transaction(|s| {
            s.put(&mut stress_entity(n))?;
            if should_fail {
                Err(eavdb_core::CoreError::transaction_aborted("intentional"))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
