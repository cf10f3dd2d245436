//! Typed attribute values.

use crate::error::{CoreError, CoreResult};
use eavdb_storage::TypeTag;
use std::fmt;

/// Value of an entity attribute.
///
/// Every value is persisted as text together with its [`TypeTag`]; the
/// variant is restored on read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// Signed 64-bit integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 text.
    Text(String),
}

impl AttributeValue {
    /// Returns the type tag of this value.
    #[must_use]
    pub const fn type_tag(&self) -> TypeTag {
        match self {
            Self::Integer(_) => TypeTag::Integer,
            Self::Boolean(_) => TypeTag::Boolean,
            Self::Text(_) => TypeTag::Text,
        }
    }

    /// Returns the textual form written to the backend.
    #[must_use]
    pub fn to_stored_text(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Boolean(v) => v.to_string(),
            Self::Text(v) => v.clone(),
        }
    }

    /// Restores a value from its stored form.
    ///
    /// # Errors
    ///
    /// Returns a storage corruption error if `text` is not a valid
    /// rendering for `type_tag`.
    pub fn from_stored(type_tag: TypeTag, text: &str) -> CoreResult<Self> {
        match type_tag {
            TypeTag::Integer => text.parse().map(Self::Integer).map_err(|_| {
                CoreError::corrupted(format!("invalid stored integer: {text:?}"))
            }),
            TypeTag::Boolean => match text {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                other => Err(CoreError::corrupted(format!(
                    "invalid stored boolean: {other:?}"
                ))),
            },
            TypeTag::Text => Ok(Self::Text(text.to_owned())),
        }
    }

    /// Returns the integer, if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}
