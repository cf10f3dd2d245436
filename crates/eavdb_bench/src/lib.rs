//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use eavdb_core::{Config, CoreResult, Entity, EntityId, EntityStore};
use eavdb_storage::SqliteBackend;
use rand::Rng;
use tempfile::TempDir;

/// Kind written by every benchmark.
pub const BENCH_KIND: &str = "bench";

/// Generate random payload bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate an entity with random attributes of every type.
///
/// `n` is stored as attribute `n` so range queries have a known
/// selectivity.
pub fn random_entity(n: usize) -> Entity {
    let mut rng = rand::thread_rng();
    let name: String = (0..8)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();
    Entity::new(BENCH_KIND)
        .expect("valid kind")
        .with("n", n as i64)
        .with("score", rng.gen_range(-1_000i64..1_000))
        .with("active", rng.gen_bool(0.5))
        .with("name", name)
        .with_payload(random_data(64))
}

/// Writes `count` random entities in one unit of work.
pub fn populate(store: &EntityStore, count: usize) -> Vec<EntityId> {
    store
        .transaction(|s| {
            (0..count)
                .map(|n| s.put(&mut random_entity(n)))
                .collect::<CoreResult<Vec<_>>>()
        })
        .expect("populate store")
}

/// Opens an in-memory store.
pub fn memory_store() -> EntityStore {
    EntityStore::open_in_memory().expect("open in-memory store")
}

/// Opens a store on an in-memory SQLite database.
pub fn sqlite_store() -> EntityStore {
    let backend = SqliteBackend::open_in_memory().expect("open sqlite in memory");
    EntityStore::open_with_backend(backend, true, Config::default())
}

/// Opens a store on a SQLite file; keep the directory alive while benchmarking.
pub fn sqlite_file_store() -> (EntityStore, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = EntityStore::open(&dir.path().join("bench.eavdb")).expect("open file store");
    (store, dir)
}
