//! Error types for entindex core.

use crate::entity::EntityId;
use crate::types::IndexId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in index operations.
///
/// Absence of a matching entity is never an error; lookups report it as an
/// empty collection or `None`. Every variant here is a contract violation by
/// the caller or by the data being indexed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity cannot be projected onto an index's key fields.
    #[error("invalid entity {entity_id} for index {index}: field {field} {reason}")]
    InvalidEntity {
        /// Name of the index that rejected the entity.
        index: String,
        /// Name of the offending key field.
        field: String,
        /// The rejected entity.
        entity_id: EntityId,
        /// What was wrong with the field value.
        reason: String,
    },

    /// An index specification is malformed.
    #[error("invalid index specification {index}: {message}")]
    InvalidIndexSpec {
        /// Name of the index.
        index: String,
        /// Description of the problem.
        message: String,
    },

    /// An index with the same name is already registered.
    #[error("index {name} is already defined")]
    DuplicateIndex {
        /// Name of the index.
        name: String,
    },

    /// No index is registered under the given id.
    #[error("unknown index {id}")]
    UnknownIndex {
        /// The id that was looked up.
        id: IndexId,
    },

    /// The index cannot answer this kind of query.
    #[error("unsupported query on index {index}: {message}")]
    UnsupportedQuery {
        /// Name of the index.
        index: String,
        /// Why the query is not supported.
        message: String,
    },

    /// A query key does not fit the field it is matched against.
    #[error("invalid key for index {index}: {message}")]
    InvalidKey {
        /// Name of the index.
        index: String,
        /// Description of the mismatch.
        message: String,
    },

    /// An index definition names a field no extractor is known for.
    #[error("index {index} references unbound field {field}")]
    UnboundField {
        /// Name of the index.
        index: String,
        /// Name of the field.
        field: String,
    },

    /// Index definitions could not be parsed.
    #[error("invalid index definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates an invalid entity error.
    pub fn invalid_entity(
        index: impl Into<String>,
        field: impl Into<String>,
        entity_id: EntityId,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEntity {
            index: index.into(),
            field: field.into(),
            entity_id,
            reason: reason.into(),
        }
    }

    /// Creates an invalid index specification error.
    pub fn invalid_index_spec(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIndexSpec {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported query error.
    pub fn unsupported_query(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error rejected an entity during registration.
    #[must_use]
    pub fn is_invalid_entity(&self) -> bool {
        matches!(self, Self::InvalidEntity { .. })
    }
}
