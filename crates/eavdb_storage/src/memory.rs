//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::condition::Condition;
use crate::error::{StorageError, StorageResult};
use crate::types::{AttributeRow, EntityRecord, RowId, StoredAttribute, TypeTag};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug)]
struct Tables {
    next_id: RowId,
    entities: BTreeMap<RowId, EntityRecord>,
    attributes: BTreeMap<RowId, Vec<AttributeRow>>,
    closed: bool,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
            attributes: BTreeMap::new(),
            closed: false,
        }
    }
}

impl Tables {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// An in-memory storage backend.
///
/// This backend keeps all rows in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Candidate searches evaluate the [`Condition`] exactly, entity by entity.
///
/// # Thread Safety
///
/// Reads take a shared lock, so concurrent queries do not block each other.
///
/// # Example
///
/// ```rust
/// use eavdb_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// let id = backend.insert_entity("note", Some(b"hello")).unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(backend.entity_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entity rows.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.tables.read().entities.len()
    }

    /// Returns the number of stored attribute rows across all entities.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.tables.read().attributes.values().map(Vec::len).sum()
    }
}

impl StorageBackend for InMemoryBackend {
    /// The location is ignored; a fresh backend is always created.
    fn open_or_create(_location: &Path) -> StorageResult<(Self, bool)> {
        Ok((Self::new(), true))
    }

    fn insert_entity(&self, kind: &str, payload: Option<&[u8]>) -> StorageResult<RowId> {
        let mut tables = self.tables.write();
        tables.ensure_open()?;
        let id = tables.next_id;
        tables.next_id += 1;
        tables.entities.insert(
            id,
            EntityRecord {
                kind: kind.to_owned(),
                payload: payload.map(<[u8]>::to_vec),
            },
        );
        Ok(id)
    }

    fn replace_entity(&self, id: RowId, kind: &str, payload: Option<&[u8]>) -> StorageResult<bool> {
        let mut tables = self.tables.write();
        tables.ensure_open()?;
        match tables.entities.get_mut(&id) {
            Some(record) => {
                record.kind = kind.to_owned();
                record.payload = payload.map(<[u8]>::to_vec);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_attributes(&self, id: RowId) -> StorageResult<()> {
        let mut tables = self.tables.write();
        tables.ensure_open()?;
        tables.attributes.remove(&id);
        Ok(())
    }

    fn delete_entity(&self, id: RowId) -> StorageResult<()> {
        let mut tables = self.tables.write();
        tables.ensure_open()?;
        tables.attributes.remove(&id);
        tables.entities.remove(&id);
        Ok(())
    }

    fn insert_attribute(
        &self,
        entity_id: RowId,
        entity_kind: &str,
        name: &str,
        type_tag: TypeTag,
        value: &str,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write();
        tables.ensure_open()?;
        tables
            .attributes
            .entry(entity_id)
            .or_default()
            .push(AttributeRow {
                entity_kind: entity_kind.to_owned(),
                name: name.to_owned(),
                type_tag,
                value: value.to_owned(),
            });
        Ok(())
    }

    fn fetch_entity(&self, id: RowId) -> StorageResult<Option<EntityRecord>> {
        let tables = self.tables.read();
        tables.ensure_open()?;
        Ok(tables.entities.get(&id).cloned())
    }

    fn fetch_attributes(&self, id: RowId) -> StorageResult<HashMap<String, StoredAttribute>> {
        let tables = self.tables.read();
        tables.ensure_open()?;
        let rows = tables.attributes.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.name.clone(),
                    StoredAttribute::new(row.type_tag, row.value.clone()),
                )
            })
            .collect())
    }

    fn find_candidate_ids(&self, condition: &Condition) -> StorageResult<BTreeSet<RowId>> {
        let tables = self.tables.read();
        tables.ensure_open()?;
        Ok(tables
            .entities
            .iter()
            .filter_map(|(&id, record)| {
                let rows = tables.attributes.get(&id).map(Vec::as_slice).unwrap_or(&[]);
                condition.evaluate(&record.kind, rows).then_some(id)
            })
            .collect())
    }

    fn close(&self) -> StorageResult<()> {
        let mut tables = self.tables.write();
        tables.closed = true;
        tables.entities.clear();
        tables.attributes.clear();
        Ok(())
    }
}
