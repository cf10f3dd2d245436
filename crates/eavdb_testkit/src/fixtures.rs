//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use eavdb_core::{Config, EntityStore};
use eavdb_storage::SqliteBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of the database inside a test directory.
const DB_FILE: &str = "test.eavdb";

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: EntityStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a store on the in-memory backend.
    pub fn memory() -> Self {
        Self {
            store: EntityStore::open_in_memory().expect("Failed to open in-memory store"),
            _temp_dir: None,
        }
    }

    /// Creates a store on an in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        let backend = SqliteBackend::open_in_memory().expect("Failed to open SQLite in memory");
        Self {
            store: EntityStore::open_with_backend(backend, true, Config::default()),
            _temp_dir: None,
        }
    }

    /// Creates a store on a SQLite file in a temporary directory.
    pub fn sqlite_file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            EntityStore::open(&temp_dir.path().join(DB_FILE)).expect("Failed to open file store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None otherwise.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join(DB_FILE))
    }

    /// Returns one store of every reference backend, labelled.
    pub fn all_backends() -> Vec<(&'static str, TestStore)> {
        vec![
            ("memory", Self::memory()),
            ("sqlite-memory", Self::sqlite_memory()),
            ("sqlite-file", Self::sqlite_file()),
        ]
    }
}

impl std::ops::Deref for TestStore {
    type Target = EntityStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&EntityStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary SQLite file store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&EntityStore, &Path) -> R,
{
    let test_store = TestStore::sqlite_file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Runs a test once against every reference backend.
///
/// The label of the backend is passed along for assertion messages.
pub fn for_each_backend<F>(mut f: F)
where
    F: FnMut(&str, &EntityStore),
{
    for (label, test_store) in TestStore::all_backends() {
        f(label, &test_store.store);
    }
}

/// Installs a `tracing` subscriber writing to the test output.
///
/// The level comes from `RUST_LOG`. Calling this more than once is fine.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test scenario helpers.
pub mod scenarios {
    use eavdb_core::{Entity, EntityId, EntityStore};

    /// Ids of the entities written by [`people`].
    #[derive(Debug, Clone, Copy)]
    pub struct People {
        /// `person`, name "Alice", age 30, admin.
        pub alice: EntityId,
        /// `person`, name "Bob", age 17, not admin.
        pub bob: EntityId,
        /// `person`, name "Carol", age 45, no admin flag.
        pub carol: EntityId,
        /// `robot`, name "Alice-Bot", age 3.
        pub robot: EntityId,
    }

    /// Writes a small, fixed population of people and one robot.
    pub fn people(store: &EntityStore) -> People {
        let put = |mut entity: Entity| store.put(&mut entity).expect("Failed to put entity");
        let person = |name: &str, age: i64| {
            Entity::new("person")
                .expect("valid kind")
                .with("name", name)
                .with("age", age)
        };

        People {
            alice: put(person("Alice", 30)
                .with("admin", true)
                .with("email", "alice@example.com")),
            bob: put(person("Bob", 17).with("admin", false)),
            carol: put(person("Carol", 45)),
            robot: put(Entity::new("robot")
                .expect("valid kind")
                .with("name", "Alice-Bot")
                .with("age", 3)),
        }
    }

    /// Writes `count` entities of `kind` with an integer attribute `n`
    /// running from 0.
    pub fn numbered(store: &EntityStore, kind: &str, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|n| {
                let mut entity = Entity::new(kind)
                    .expect("valid kind")
                    .with("n", n as i64)
                    .with("label", format!("item-{n}"));
                store.put(&mut entity).expect("Failed to put entity")
            })
            .collect()
    }
}
