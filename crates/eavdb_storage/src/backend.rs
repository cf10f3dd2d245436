//! Storage backend trait definition.

use crate::condition::Condition;
use crate::error::StorageResult;
use crate::types::{EntityRecord, RowId, StoredAttribute, TypeTag};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Persistence collaborator of an EavDB store.
///
/// A backend keeps entity rows and attribute rows. It knows nothing about
/// typed values: attribute values arrive and leave as text together with a
/// [`TypeTag`].
///
/// # Invariants
///
/// - Ids returned by `insert_entity` are positive, strictly increasing and
///   never reused, even after `delete_entity`
/// - `find_candidate_ids` returns a superset of the entities satisfying the
///   condition under the semantics of [`Condition::evaluate`]
/// - After `close`, every method fails with [`crate::StorageError::Closed`]
/// - Backends must be `Send + Sync`; the store serializes writers itself
///   but calls read methods from many threads at once
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::SqliteBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Opens the backend at `location`, creating it if missing.
    ///
    /// Returns the backend and whether it was freshly created.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be opened or initialized.
    fn open_or_create(location: &Path) -> StorageResult<(Self, bool)>
    where
        Self: Sized;

    /// Inserts an entity row and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    fn insert_entity(&self, kind: &str, payload: Option<&[u8]>) -> StorageResult<RowId>;

    /// Overwrites kind and payload of an existing entity row.
    ///
    /// Returns `false` if no row with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    fn replace_entity(&self, id: RowId, kind: &str, payload: Option<&[u8]>) -> StorageResult<bool>;

    /// Deletes all attribute rows of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be deleted.
    fn delete_attributes(&self, id: RowId) -> StorageResult<()>;

    /// Deletes an entity row and all of its attribute rows.
    ///
    /// Deleting an absent id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be deleted.
    fn delete_entity(&self, id: RowId) -> StorageResult<()>;

    /// Inserts one attribute row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    fn insert_attribute(
        &self,
        entity_id: RowId,
        entity_kind: &str,
        name: &str,
        type_tag: TypeTag,
        value: &str,
    ) -> StorageResult<()>;

    /// Reads an entity row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    fn fetch_entity(&self, id: RowId) -> StorageResult<Option<EntityRecord>>;

    /// Reads all attribute rows of an entity, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be read or a type tag is invalid.
    fn fetch_attributes(&self, id: RowId) -> StorageResult<HashMap<String, StoredAttribute>>;

    /// Returns the ids of entities that may satisfy `condition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search cannot be executed.
    fn find_candidate_ids(&self, condition: &Condition) -> StorageResult<BTreeSet<RowId>>;

    /// Releases the backend's resources.
    ///
    /// Closing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if pending data cannot be released cleanly.
    fn close(&self) -> StorageResult<()>;
}
