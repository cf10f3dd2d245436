//! Error types for EavDB core.

use eavdb_storage::{StorageError, TypeTag};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EavDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    ///
    /// Backend failures are propagated unchanged; the core never retries.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// An argument was rejected before any mutation took place.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the rejected argument.
        message: String,
    },

    /// The store is closed.
    #[error("store is closed")]
    Closed,

    /// A unit of work failed.
    #[error("transaction failed: {message}")]
    Transaction {
        /// Description of the failure.
        message: String,
        /// The error raised inside the unit of work, if any.
        #[source]
        source: Option<Box<CoreError>>,
    },

    /// A single-result query found zero or several matches.
    #[error("expected exactly one result, found {found}")]
    Cardinality {
        /// Number of matches found.
        found: usize,
    },

    /// A typed getter was used on an attribute of another type.
    #[error("attribute '{attribute}' is {actual}, not {expected}")]
    TypeMismatch {
        /// Attribute name.
        attribute: String,
        /// Requested type.
        expected: TypeTag,
        /// Stored type.
        actual: TypeTag,
    },

    /// An entity with an assigned id no longer exists.
    #[error("entity not found: {id}")]
    EntityNotFound {
        /// The missing id.
        id: i64,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a transaction error without an underlying cause.
    ///
    /// Units of work return this to abort with a reason of their own.
    pub fn transaction_aborted(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an error raised inside a unit of work.
    ///
    /// Transaction errors are returned as-is so nested units don't stack
    /// wrappers.
    #[must_use]
    pub fn into_transaction(self) -> Self {
        match self {
            Self::Transaction { .. } => self,
            other => Self::Transaction {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Creates a corruption error for stored data that cannot be decoded.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Storage(StorageError::corrupted(message))
    }
}
