//! In-memory entity representation.

use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::value::AttributeValue;
use eavdb_storage::TypeTag;
use std::collections::HashMap;

/// A persistable record: a kind label, an opaque payload and a set of
/// typed, queryable attributes.
///
/// An entity has no id until it is first stored with
/// [`crate::EntityStore::put`]; from then on the id never changes.
///
/// # Example
///
/// ```rust
/// use eavdb_core::{AttributeValue, Entity};
///
/// let mut person = Entity::new("person").unwrap();
/// person.set("name", "Alice").set("age", 30);
///
/// assert_eq!(person.get_text("name").unwrap(), Some("Alice"));
/// assert_eq!(person.get("age"), Some(&AttributeValue::Integer(30)));
/// assert!(person.id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: Option<EntityId>,
    kind: String,
    payload: Option<Vec<u8>>,
    attributes: HashMap<String, AttributeValue>,
}

impl Entity {
    /// Creates a new, unsaved entity of the given kind.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `kind` is empty.
    pub fn new(kind: impl Into<String>) -> CoreResult<Self> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(CoreError::validation("entity kind must not be empty"));
        }
        Ok(Self {
            id: None,
            kind,
            payload: None,
            attributes: HashMap::new(),
        })
    }

    /// Rebuilds a stored entity from backend data.
    pub(crate) fn restore(
        id: EntityId,
        kind: String,
        payload: Option<Vec<u8>>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Self {
        Self {
            id: Some(id),
            kind,
            payload,
            attributes,
        }
    }

    /// Returns the id, or `None` if the entity was never stored.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        debug_assert!(self.id.is_none(), "entity id is immutable once assigned");
        self.id = Some(id);
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Replaces the opaque payload.
    pub fn set_payload(&mut self, payload: Option<Vec<u8>>) -> &mut Self {
        self.payload = payload;
        self
    }

    /// Builder form of [`Entity::set_payload`].
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Stores an attribute, replacing any previous value of that name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`Entity::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Stores an integer attribute.
    pub fn set_integer(&mut self, name: impl Into<String>, value: i64) -> &mut Self {
        self.set(name, AttributeValue::Integer(value))
    }

    /// Stores a boolean attribute.
    pub fn set_boolean(&mut self, name: impl Into<String>, value: bool) -> &mut Self {
        self.set(name, AttributeValue::Boolean(value))
    }

    /// Stores a text attribute.
    pub fn set_text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set(name, AttributeValue::Text(value.into()))
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Returns the stored value of an attribute as-is.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns an integer attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if the attribute holds another type.
    pub fn get_integer(&self, name: &str) -> CoreResult<Option<i64>> {
        Ok(self
            .typed(name, TypeTag::Integer)?
            .and_then(AttributeValue::as_integer))
    }

    /// Returns a boolean attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if the attribute holds another type.
    pub fn get_boolean(&self, name: &str) -> CoreResult<Option<bool>> {
        Ok(self
            .typed(name, TypeTag::Boolean)?
            .and_then(AttributeValue::as_boolean))
    }

    /// Returns a text attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TypeMismatch`] if the attribute holds another type.
    pub fn get_text(&self, name: &str) -> CoreResult<Option<&str>> {
        Ok(self.typed(name, TypeTag::Text)?.and_then(AttributeValue::as_text))
    }

    fn typed(&self, name: &str, expected: TypeTag) -> CoreResult<Option<&AttributeValue>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(value) if value.type_tag() == expected => Ok(Some(value)),
            Some(value) => Err(CoreError::TypeMismatch {
                attribute: name.to_owned(),
                expected,
                actual: value.type_tag(),
            }),
        }
    }

    /// Returns true if the attribute is set.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Returns the attribute names, in no particular order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Returns all attributes, in no particular order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}
