//! SQLite storage backend.
//!
//! Entities and attributes live in two tables:
//!
//! ```text
//! entity    (id, kind, payload)
//! attribute (id, entity_id, entity_kind, name, type, value)
//! ```
//!
//! Both use `AUTOINCREMENT` ids so deleted ids are never handed out again.
//! Conditions are rendered to a single parameterized `SELECT` over `entity`
//! with one `EXISTS` sub-select per attribute test.

use crate::backend::StorageBackend;
use crate::condition::{contains_ignore_case, Condition, ValueTest};
use crate::error::{StorageError, StorageResult};
use crate::types::{EntityRecord, RowId, StoredAttribute, TypeTag};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entity (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        kind    TEXT NOT NULL,
        payload BLOB
    );
    CREATE TABLE IF NOT EXISTS attribute (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_id   INTEGER NOT NULL,
        entity_kind TEXT NOT NULL,
        name        TEXT NOT NULL,
        type        INTEGER NOT NULL,
        value       TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS entity_kind_idx ON entity (kind);
    CREATE INDEX IF NOT EXISTS attribute_entity_idx ON attribute (entity_id);
    CREATE INDEX IF NOT EXISTS attribute_name_idx ON attribute (name, type, value);
";

/// Name of the scalar function backing [`ValueTest::ContainsIgnoreCase`].
const CONTAINS_FN: &str = "eav_contains";

/// A storage backend on a single SQLite connection.
///
/// All calls are serialized on the connection. Case-insensitive containment
/// is evaluated by a registered scalar function using the same Unicode
/// lower-casing as the core matcher, so it never drops a true match.
pub struct SqliteBackend {
    conn: Mutex<Option<Connection>>,
}

impl SqliteBackend {
    /// Opens a database file.
    ///
    /// Returns the backend and whether the file was created by this call.
    /// Missing parent directories are created when `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file is missing and
    /// `create_if_missing` is false, or an error if SQLite fails to open or
    /// initialize it.
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<(Self, bool)> {
        let existed = path.exists();
        if !existed {
            if !create_if_missing {
                return Err(StorageError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(path)?;
        let backend = Self::with_connection(conn)?;
        debug!(path = %path.display(), created = !existed, "opened sqlite backend");
        Ok((backend, !existed))
    }

    /// Opens a private in-memory SQLite database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite fails to initialize the schema.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.create_scalar_function(
            CONTAINS_FN,
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let haystack = ctx.get::<String>(0)?;
                let needle = ctx.get::<String>(1)?;
                Ok(contains_ignore_case(&haystack, &needle))
            },
        )?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.conn.lock();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StorageError::Closed),
        }
    }
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("open", &self.conn.lock().is_some())
            .finish()
    }
}

impl StorageBackend for SqliteBackend {
    fn open_or_create(location: &Path) -> StorageResult<(Self, bool)> {
        Self::open(location, true)
    }

    fn insert_entity(&self, kind: &str, payload: Option<&[u8]>) -> StorageResult<RowId> {
        self.with_conn(|conn| {
            conn.prepare_cached("INSERT INTO entity (kind, payload) VALUES (?1, ?2)")?
                .execute(params![kind, payload])?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn replace_entity(&self, id: RowId, kind: &str, payload: Option<&[u8]>) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached("UPDATE entity SET kind = ?1, payload = ?2 WHERE id = ?3")?
                .execute(params![kind, payload, id])?;
            Ok(changed > 0)
        })
    }

    fn delete_attributes(&self, id: RowId) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached("DELETE FROM attribute WHERE entity_id = ?1")?
                .execute(params![id])?;
            Ok(())
        })
    }

    fn delete_entity(&self, id: RowId) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached("DELETE FROM attribute WHERE entity_id = ?1")?
                .execute(params![id])?;
            conn.prepare_cached("DELETE FROM entity WHERE id = ?1")?
                .execute(params![id])?;
            Ok(())
        })
    }

    fn insert_attribute(
        &self,
        entity_id: RowId,
        entity_kind: &str,
        name: &str,
        type_tag: TypeTag,
        value: &str,
    ) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.prepare_cached(
                "INSERT INTO attribute (entity_id, entity_kind, name, type, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![entity_id, entity_kind, name, type_tag.code(), value])?;
            Ok(())
        })
    }

    fn fetch_entity(&self, id: RowId) -> StorageResult<Option<EntityRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .prepare_cached("SELECT kind, payload FROM entity WHERE id = ?1")?
                .query_row(params![id], |row| {
                    Ok(EntityRecord {
                        kind: row.get(0)?,
                        payload: row.get(1)?,
                    })
                })
                .optional()?;
            Ok(record)
        })
    }

    fn fetch_attributes(&self, id: RowId) -> StorageResult<HashMap<String, StoredAttribute>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT name, type, value FROM attribute WHERE entity_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut attributes = HashMap::new();
            for row in rows {
                let (name, code, value) = row?;
                attributes.insert(name, StoredAttribute::new(TypeTag::from_code(code)?, value));
            }
            Ok(attributes)
        })
    }

    fn find_candidate_ids(&self, condition: &Condition) -> StorageResult<BTreeSet<RowId>> {
        let mut sql = String::from("SELECT e.id FROM entity e WHERE ");
        let mut values = Vec::new();
        render(condition, &mut sql, &mut values);
        trace!(%sql, params = values.len(), "candidate search");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get::<_, RowId>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(ids)
        })
    }

    fn close(&self) -> StorageResult<()> {
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
        }
        Ok(())
    }
}

/// Appends the SQL form of `condition` to `sql`, collecting bound values.
fn render(condition: &Condition, sql: &mut String, values: &mut Vec<Value>) {
    match condition {
        Condition::True => sql.push('1'),
        Condition::Kind(kind) => {
            sql.push_str("e.kind = ?");
            values.push(Value::Text(kind.clone()));
        }
        Condition::Attribute {
            name,
            type_tag,
            test,
        } => {
            sql.push_str("EXISTS (SELECT 1 FROM attribute a WHERE a.entity_id = e.id AND a.name = ?");
            values.push(Value::Text(name.clone()));
            if let Some(tag) = type_tag {
                sql.push_str(" AND a.type = ?");
                values.push(Value::Integer(tag.code()));
            }
            let (clause, reference) = match test {
                ValueTest::Present => ("", None),
                ValueTest::Eq(v) => (" AND a.value = ?", Some(v)),
                ValueTest::Ne(v) => (" AND a.value <> ?", Some(v)),
                ValueTest::Lt(v) => (" AND a.value < ?", Some(v)),
                ValueTest::Gt(v) => (" AND a.value > ?", Some(v)),
                ValueTest::ContainsIgnoreCase(v) => (" AND eav_contains(a.value, ?)", Some(v)),
            };
            sql.push_str(clause);
            if let Some(reference) = reference {
                values.push(Value::Text(reference.clone()));
            }
            sql.push(')');
        }
        Condition::And(children) => render_joined(children, " AND ", '1', sql, values),
        Condition::Or(children) => render_joined(children, " OR ", '0', sql, values),
    }
}

fn render_joined(
    children: &[Condition],
    op: &str,
    empty: char,
    sql: &mut String,
    values: &mut Vec<Value>,
) {
    if children.is_empty() {
        sql.push(empty);
        return;
    }
    sql.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            sql.push_str(op);
        }
        render(child, sql, values);
    }
    sql.push(')');
}
