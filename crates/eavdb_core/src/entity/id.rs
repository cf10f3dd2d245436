//! Entity identifier.

use eavdb_storage::RowId;
use std::fmt;

/// Identifier of a persisted entity.
///
/// Entity IDs are assigned by the backend on first `put` and are:
/// - Positive and strictly increasing in insertion order
/// - Immutable once assigned
/// - Never reused after delete
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(RowId);

impl EntityId {
    /// Creates an entity ID from a raw backend row id.
    #[inline]
    #[must_use]
    pub const fn new(id: RowId) -> Self {
        Self(id)
    }

    /// Returns the raw row id.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> RowId {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RowId> for EntityId {
    fn from(id: RowId) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for RowId {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(EntityId::new(1) < EntityId::new(2));
    }

    #[test]
    fn raw_roundtrip() {
        let id = EntityId::from(42);
        assert_eq!(RowId::from(id), 42);
        assert_eq!(id.as_i64(), 42);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", EntityId::new(7)), "7");
        assert_eq!(format!("{:?}", EntityId::new(7)), "EntityId(7)");
    }
}
