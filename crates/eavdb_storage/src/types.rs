//! Row types exchanged between the core and a backend.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// Backend row identifier of an entity.
///
/// Assigned by the backend on insert, starting at 1 and never reused.
pub type RowId = i64;

/// Type tag stored next to every attribute value.
///
/// The numeric codes are part of the persisted format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTag {
    /// Signed 64-bit integer, stored as decimal digits.
    Integer,
    /// Boolean, stored as `"true"` or `"false"`.
    Boolean,
    /// UTF-8 text, stored verbatim.
    Text,
}

impl TypeTag {
    /// Returns the persisted numeric code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Integer => 0,
            Self::Boolean => 1,
            Self::Text => 2,
        }
    }

    /// Parses a persisted numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] for codes outside `0..=2`.
    pub fn from_code(code: i64) -> StorageResult<Self> {
        match code {
            0 => Ok(Self::Integer),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::Text),
            other => Err(StorageError::corrupted(format!(
                "invalid attribute type code: {other}"
            ))),
        }
    }

    /// Returns a lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An entity row as returned by [`crate::StorageBackend::fetch_entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Kind label of the entity.
    pub kind: String,
    /// Opaque payload bytes.
    pub payload: Option<Vec<u8>>,
}

/// A stored attribute value with its type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttribute {
    /// Type the value was written as.
    pub type_tag: TypeTag,
    /// Textual form of the value.
    pub value: String,
}

impl StoredAttribute {
    /// Creates a stored attribute.
    pub fn new(type_tag: TypeTag, value: impl Into<String>) -> Self {
        Self {
            type_tag,
            value: value.into(),
        }
    }
}

/// A full attribute row, the unit that conditions are tested against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    /// Kind of the owning entity, denormalized at insert time.
    pub entity_kind: String,
    /// Attribute name.
    pub name: String,
    /// Type tag.
    pub type_tag: TypeTag,
    /// Textual value.
    pub value: String,
}
