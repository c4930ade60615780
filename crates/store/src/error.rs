//! Typed error type for the store crate.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A stored document does not have the shape the record model expects.
    #[error("malformed document: field '{field}' {reason}")]
    MalformedDocument {
        field: String,
        reason: String,
    },

    /// The caller's id string is not a valid `ObjectId` encoding.
    #[error("invalid list identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("list '{0}' not found")]
    NotFound(String),

    /// Transport failure reported by a backend that is not the MongoDB driver.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// The round trip did not finish within the configured operation timeout.
    #[error("{operation} cancelled after {after:?}")]
    Cancelled {
        operation: &'static str,
        after: Duration,
    },

    /// The in-memory backend was asked to evaluate syntax it does not know.
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
}

impl DbError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Qualify the field of a `MalformedDocument` with its enclosing path,
    /// e.g. `item` inside element 3 becomes `items.3.item`.
    pub(crate) fn within(self, prefix: &str) -> Self {
        match self {
            Self::MalformedDocument { field, reason } => Self::MalformedDocument {
                field: format!("{prefix}.{field}"),
                reason,
            },
            other => other,
        }
    }

    /// True for failures of the storage connection rather than of the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::Driver(_) | Self::Cancelled { .. }
        )
    }
}
