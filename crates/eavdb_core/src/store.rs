//! Entity store.

use crate::config::Config;
use crate::entity::{Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use crate::lock::{StoreLock, WriteGuard};
use crate::transaction::TransactionRunner;
use crate::value::AttributeValue;
use eavdb_storage::{InMemoryBackend, SqliteBackend, StorageBackend};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// The main store handle.
///
/// `EntityStore` persists [`Entity`] values through a [`StorageBackend`]
/// and answers [`Filter`] queries in two phases: the backend narrows the
/// candidates with the filter's condition, then every candidate is loaded
/// and checked with the filter's exact matcher.
///
/// ## Concurrency
///
/// Each store owns one reader/writer lock. `get`, `exists` and the query
/// methods share it; `put`, `delete`, `close` and transactions take it
/// exclusively. A thread holding the exclusive lock can call any method
/// of the same store again.
///
/// ## Example
///
/// ```rust
/// use eavdb_core::{Entity, EntityStore, Filter, FilterItem, TextOp};
///
/// let store = EntityStore::open_in_memory().unwrap();
///
/// let mut alice = Entity::new("person").unwrap().with("name", "Alice");
/// let id = store.put(&mut alice).unwrap();
/// assert_eq!(alice.id(), Some(id));
///
/// let filter = Filter::new("person", FilterItem::text("name", TextOp::Contains, "ali")).unwrap();
/// let found = store.query_single(&filter).unwrap();
/// assert_eq!(found.get_text("name").unwrap(), Some("Alice"));
/// ```
pub struct EntityStore {
    backend: Box<dyn StorageBackend>,
    lock: StoreLock,
    config: Config,
    is_new: bool,
    is_open: RwLock<bool>,
}

impl EntityStore {
    /// Opens a SQLite-backed store at `path` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a SQLite-backed store at `path`.
    ///
    /// With `create_if_missing` unset, a missing file is an error instead of
    /// being created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let (backend, created) = SqliteBackend::open(path, config.create_if_missing)?;
        Ok(Self::open_with_backend(backend, created, config))
    }

    /// Opens a store held entirely in memory.
    ///
    /// # Errors
    ///
    /// Currently infallible; returns `CoreResult` like the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        Ok(Self::open_with_backend(
            InMemoryBackend::new(),
            true,
            Config::default(),
        ))
    }

    /// Opens a store over an already opened backend.
    ///
    /// `is_new` is reported back by [`EntityStore::is_new_database`].
    pub fn open_with_backend(
        backend: impl StorageBackend + 'static,
        is_new: bool,
        config: Config,
    ) -> Self {
        info!(is_new, "store opened");
        Self {
            backend: Box::new(backend),
            lock: StoreLock::new(),
            config,
            is_new,
            is_open: RwLock::new(true),
        }
    }

    /// Returns true if the backing database was created by this open.
    #[must_use]
    pub fn is_new_database(&self) -> bool {
        self.is_new
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Stores an entity and returns its id.
    ///
    /// An entity without id is inserted and receives a new id. An entity
    /// with id replaces the stored one: kind and payload are overwritten
    /// and the attribute set is replaced as a whole, so attributes removed
    /// from `entity` disappear from the store.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if the entity breaks a configured limit;
    ///   nothing is written in that case
    /// - [`CoreError::EntityNotFound`] if the entity has an id that is no
    ///   longer stored
    /// - [`CoreError::Closed`] or backend errors
    pub fn put(&self, entity: &mut Entity) -> CoreResult<EntityId> {
        self.validate(entity)?;
        let _guard = self.lock.write();
        self.ensure_open()?;

        let id = match entity.id() {
            None => {
                let id = EntityId::new(
                    self.backend
                        .insert_entity(entity.kind(), entity.payload())?,
                );
                entity.assign_id(id);
                self.write_attributes(id, entity)?;
                id
            }
            Some(id) => {
                let existed =
                    self.backend
                        .replace_entity(id.as_i64(), entity.kind(), entity.payload())?;
                if !existed {
                    return Err(CoreError::EntityNotFound { id: id.as_i64() });
                }
                self.backend.delete_attributes(id.as_i64())?;
                self.write_attributes(id, entity)?;
                id
            }
        };

        debug!(
            %id,
            kind = entity.kind(),
            attributes = entity.attribute_count(),
            "put entity"
        );
        Ok(id)
    }

    fn write_attributes(&self, id: EntityId, entity: &Entity) -> CoreResult<()> {
        for (name, value) in entity.attributes() {
            self.backend.insert_attribute(
                id.as_i64(),
                entity.kind(),
                name,
                value.type_tag(),
                &value.to_stored_text(),
            )?;
        }
        Ok(())
    }

    fn validate(&self, entity: &Entity) -> CoreResult<()> {
        if entity.kind().len() > self.config.max_kind_len {
            return Err(CoreError::validation(format!(
                "entity kind is {} bytes long, the limit is {}",
                entity.kind().len(),
                self.config.max_kind_len
            )));
        }
        for (name, value) in entity.attributes() {
            if name.is_empty() {
                return Err(CoreError::validation("attribute name must not be empty"));
            }
            if name.len() > self.config.max_attribute_name_len {
                return Err(CoreError::validation(format!(
                    "attribute name '{name}' exceeds {} bytes",
                    self.config.max_attribute_name_len
                )));
            }
            if let AttributeValue::Text(text) = value {
                if text.len() > self.config.max_text_len {
                    return Err(CoreError::validation(format!(
                        "text attribute '{name}' is {} bytes long, the limit is {}",
                        text.len(),
                        self.config.max_text_len
                    )));
                }
            }
        }
        Ok(())
    }

    /// Deletes an entity and all of its attributes.
    ///
    /// Deleting an id that is not stored does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn delete(&self, id: EntityId) -> CoreResult<()> {
        let _guard = self.lock.write();
        self.ensure_open()?;
        self.backend.delete_entity(id.as_i64())?;
        debug!(%id, "deleted entity");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Loads an entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`], backend errors, or a corruption error
    /// if a stored value cannot be decoded.
    pub fn get(&self, id: EntityId) -> CoreResult<Option<Entity>> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        self.load(id)
    }

    /// Returns true if an entity with this id is stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn exists(&self, id: EntityId) -> CoreResult<bool> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        Ok(self.backend.fetch_entity(id.as_i64())?.is_some())
    }

    fn load(&self, id: EntityId) -> CoreResult<Option<Entity>> {
        let Some(record) = self.backend.fetch_entity(id.as_i64())? else {
            return Ok(None);
        };
        let attributes = self
            .backend
            .fetch_attributes(id.as_i64())?
            .into_iter()
            .map(|(name, stored)| {
                AttributeValue::from_stored(stored.type_tag, &stored.value).map(|v| (name, v))
            })
            .collect::<CoreResult<HashMap<_, _>>>()?;
        Ok(Some(Entity::restore(
            id,
            record.kind,
            record.payload,
            attributes,
        )))
    }

    /// Loads matching entities in ascending id order, stopping after
    /// `limit` matches.
    fn scan(&self, filter: &Filter, limit: Option<usize>) -> CoreResult<Vec<Entity>> {
        let candidates = self.backend.find_candidate_ids(filter.condition())?;
        let mut matches = Vec::new();
        for &raw in &candidates {
            if limit.is_some_and(|limit| matches.len() >= limit) {
                break;
            }
            // a candidate may fail the exact check: narrowing over-approximates
            if let Some(entity) = self.load(EntityId::new(raw))? {
                if filter.matches(&entity) {
                    matches.push(entity);
                }
            }
        }
        debug!(
            kind = filter.kind(),
            candidates = candidates.len(),
            matches = matches.len(),
            "query"
        );
        Ok(matches)
    }

    fn read_scan(&self, filter: &Filter, limit: Option<usize>) -> CoreResult<Vec<Entity>> {
        let _guard = self.lock.read();
        self.ensure_open()?;
        self.scan(filter, limit)
    }

    /// Returns the ids of all entities matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn query_ids(&self, filter: &Filter) -> CoreResult<BTreeSet<EntityId>> {
        Ok(self
            .read_scan(filter, None)?
            .iter()
            .filter_map(Entity::id)
            .collect())
    }

    /// Returns all entities matching `filter`, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn query(&self, filter: &Filter) -> CoreResult<Vec<Entity>> {
        self.read_scan(filter, None)
    }

    /// Returns the only entity matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Cardinality`] unless exactly one entity matches.
    pub fn query_single(&self, filter: &Filter) -> CoreResult<Entity> {
        let mut matches = self.read_scan(filter, None)?;
        match matches.len() {
            1 => matches.pop().ok_or(CoreError::Cardinality { found: 0 }),
            found => Err(CoreError::Cardinality { found }),
        }
    }

    /// Returns the id of the only entity matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Cardinality`] unless exactly one entity matches.
    pub fn query_single_id(&self, filter: &Filter) -> CoreResult<EntityId> {
        let entity = self.query_single(filter)?;
        entity
            .id()
            .ok_or_else(|| CoreError::corrupted("stored entity without id"))
    }

    /// Returns the matching entity with the lowest id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn query_first(&self, filter: &Filter) -> CoreResult<Option<Entity>> {
        Ok(self.read_scan(filter, Some(1))?.into_iter().next())
    }

    /// Returns the lowest matching id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] or backend errors.
    pub fn query_first_id(&self, filter: &Filter) -> CoreResult<Option<EntityId>> {
        Ok(self.query_first(filter)?.and_then(|entity| entity.id()))
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Runs `f` as one unit of work under the exclusive lock.
    ///
    /// Shorthand for `TransactionRunner::new(self).execute(f)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Closed`] if the store is closed, or
    /// [`CoreError::Transaction`] wrapping the error `f` returned.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&EntityStore) -> CoreResult<T>,
    {
        TransactionRunner::new(self).execute(f)
    }

    pub(crate) fn write_lock(&self) -> WriteGuard<'_> {
        self.lock.write()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the store.
    ///
    /// Waits for running operations, then releases the backend. Closing a
    /// closed store does nothing. Every other method fails with
    /// [`CoreError::Closed`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to close.
    pub fn close(&self) -> CoreResult<()> {
        let _guard = self.lock.write();
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        *is_open = false;
        self.backend.close()?;
        info!("store closed");
        Ok(())
    }

    /// Returns true once the store has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !*self.is_open.read()
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::Closed)
        }
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("is_open", &!self.is_closed())
            .field("is_new", &self.is_new)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for EntityStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close store on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterItem, IntegerOp};

    fn create_store() -> EntityStore {
        EntityStore::open_in_memory().unwrap()
    }

    fn person(name: &str, age: i64) -> Entity {
        Entity::new("person")
            .unwrap()
            .with("name", name)
            .with("age", age)
    }

    #[test]
    fn open_in_memory() {
        let store = create_store();
        assert!(!store.is_closed());
        assert!(store.is_new_database());
    }

    #[test]
    fn put_assigns_increasing_ids() {
        let store = create_store();
        let a = store.put(&mut person("a", 1)).unwrap();
        let b = store.put(&mut person("b", 2)).unwrap();
        assert!(a < b);
    }

    #[test]
    fn put_get_roundtrip() {
        let store = create_store();
        let mut e = person("Alice", 30).with("admin", true).with_payload(vec![9, 8]);
        let id = store.put(&mut e).unwrap();

        let loaded = store.get(id).unwrap().unwrap();
        assert_eq!(loaded, e);
    }

    #[test]
    fn replace_drops_removed_attributes() {
        let store = create_store();
        let mut e = person("Alice", 30);
        let id = store.put(&mut e).unwrap();

        e.remove("age");
        e.set("name", "Bob");
        assert_eq!(store.put(&mut e).unwrap(), id);

        let loaded = store.get(id).unwrap().unwrap();
        assert!(!loaded.has("age"));
        assert_eq!(loaded.get_text("name").unwrap(), Some("Bob"));
    }

    #[test]
    fn replace_of_deleted_entity_fails() {
        let store = create_store();
        let mut e = person("Alice", 30);
        let id = store.put(&mut e).unwrap();
        store.delete(id).unwrap();

        assert!(matches!(
            store.put(&mut e),
            Err(CoreError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn delete_absent_is_noop() {
        let store = create_store();
        store.delete(EntityId::new(42)).unwrap();
        assert!(!store.exists(EntityId::new(42)).unwrap());
    }

    #[test]
    fn validation_happens_before_write() {
        let store = EntityStore::open_with_backend(
            InMemoryBackend::new(),
            true,
            Config::default().max_text_len(3),
        );
        let mut e = Entity::new("k").unwrap().with("s", "long text");
        assert!(matches!(
            store.put(&mut e),
            Err(CoreError::Validation { .. })
        ));
        assert!(e.id().is_none());
        assert!(store.query_ids(&Filter::all("k").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn empty_attribute_name_rejected() {
        let store = create_store();
        let mut e = Entity::new("k").unwrap().with("", 1);
        assert!(matches!(
            store.put(&mut e),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn query_is_numeric_and_ordered() {
        let store = create_store();
        let five = store.put(&mut person("five", 5)).unwrap();
        let fifteen = store.put(&mut person("fifteen", 15)).unwrap();
        let twenty = store.put(&mut person("twenty", 20)).unwrap();

        let filter = Filter::new("person", FilterItem::integer("age", IntegerOp::Gt, 10)).unwrap();
        let ids: Vec<_> = store.query_ids(&filter).unwrap().into_iter().collect();
        assert_eq!(ids, [fifteen, twenty]);
        assert!(!ids.contains(&five));

        assert_eq!(store.query_first_id(&filter).unwrap(), Some(fifteen));
        assert!(matches!(
            store.query_single(&filter),
            Err(CoreError::Cardinality { found: 2 })
        ));
    }

    #[test]
    fn query_single_with_no_match() {
        let store = create_store();
        let filter = Filter::all("person").unwrap();
        assert!(matches!(
            store.query_single_id(&filter),
            Err(CoreError::Cardinality { found: 0 })
        ));
        assert_eq!(store.query_first(&filter).unwrap(), None);
    }

    #[test]
    fn transaction_can_call_store() {
        let store = create_store();
        let id = store
            .transaction(|s| {
                let id = s.put(&mut person("a", 1))?;
                assert!(s.exists(id)?);
                s.transaction(|inner| inner.get(id))
            })
            .unwrap()
            .and_then(|e| e.id());
        assert!(id.is_some());
    }

    #[test]
    fn closed_store_rejects_everything() {
        let store = create_store();
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed());

        let filter = Filter::all("person").unwrap();
        for _ in 0..2 {
            assert!(matches!(store.get(EntityId::new(1)), Err(CoreError::Closed)));
            assert!(matches!(store.put(&mut person("a", 1)), Err(CoreError::Closed)));
            assert!(matches!(store.delete(EntityId::new(1)), Err(CoreError::Closed)));
            assert!(matches!(store.query(&filter), Err(CoreError::Closed)));
            assert!(matches!(store.transaction(|_| Ok(())), Err(CoreError::Closed)));
        }
    }
}
