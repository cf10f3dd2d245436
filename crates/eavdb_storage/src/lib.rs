//! # EavDB Storage
//!
//! Backend trait, narrowing conditions and reference backends for EavDB.
//!
//! This crate is the persistence collaborator of the EavDB core. A backend
//! stores two kinds of rows:
//!
//! - entity rows: `(id, kind, payload)`
//! - attribute rows: `(entity_id, entity_kind, name, type_tag, value)`
//!
//! Attribute values are always stored as **text**, whatever their original
//! type. Backends therefore cannot evaluate typed semantics; they only narrow
//! candidate sets with a [`Condition`], and the core re-verifies every
//! candidate against the original typed predicate.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`SqliteBackend`] - Persistent storage on SQLite
//!
//! ## Example
//!
//! ```rust
//! use eavdb_storage::{Condition, InMemoryBackend, StorageBackend, TypeTag, ValueTest};
//!
//! let backend = InMemoryBackend::new();
//! let id = backend.insert_entity("person", None).unwrap();
//! backend
//!     .insert_attribute(id, "person", "age", TypeTag::Integer, "42")
//!     .unwrap();
//!
//! let cond = Condition::attribute("age", Some(TypeTag::Integer), ValueTest::Eq("42".into()));
//! assert!(backend.find_candidate_ids(&cond).unwrap().contains(&id));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod condition;
mod error;
mod memory;
mod sqlite;
mod types;

pub use backend::StorageBackend;
pub use condition::{contains_ignore_case, Condition, ValueTest};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;
pub use types::{AttributeRow, EntityRecord, RowId, StoredAttribute, TypeTag};
