//! Units of work.

use crate::error::{CoreError, CoreResult};
use crate::store::EntityStore;
use tracing::{debug, warn};

/// Runs units of work against a store under its exclusive lock.
///
/// The lock is held for the whole unit, even if it only reads, so no other
/// thread observes the store between two of the unit's operations. The unit
/// itself may call any method of the store, including another transaction.
///
/// Writes made before a unit fails are kept: there is no rollback.
///
/// # Example
///
/// ```rust
/// use eavdb_core::{Entity, EntityStore, TransactionRunner};
///
/// let store = EntityStore::open_in_memory().unwrap();
/// let runner = TransactionRunner::new(&store);
///
/// let (a, b) = runner
///     .execute(|store| {
///         let a = store.put(&mut Entity::new("node").unwrap())?;
///         let b = store.put(&mut Entity::new("node").unwrap().with("parent", a.as_i64()))?;
///         Ok((a, b))
///     })
///     .unwrap();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TransactionRunner<'a> {
    store: &'a EntityStore,
}

impl<'a> TransactionRunner<'a> {
    /// Creates a runner for `store`.
    #[must_use]
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// Runs `f` under the exclusive lock and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] if the store is closed. An error
    /// returned by `f` comes back as [`CoreError::Transaction`] with the
    /// original error as its source.
    pub fn execute<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&EntityStore) -> CoreResult<T>,
    {
        let _guard = self.store.write_lock();
        self.store.ensure_open()?;
        debug!("unit of work started");
        let result = f(self.store).map_err(CoreError::into_transaction);
        debug!(ok = result.is_ok(), "unit of work finished");
        result
    }

    /// Runs `f` like [`TransactionRunner::execute`], discarding any error.
    ///
    /// The error is logged at `warn` level and `None` is returned.
    pub fn execute_silent<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&EntityStore) -> CoreResult<T>,
    {
        match self.execute(f) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "unit of work failed, error discarded");
                None
            }
        }
    }
}
