//! Database error types for crm-db.

use std::time::Duration;

use crm_core::errors::{ErrorKind, ValidationError};
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Input rejected before reaching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No row with the given key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A database call did not finish within the configured bound.
    #[error("Database call timed out after {0:?}")]
    Timeout(Duration),

    /// Filesystem error preparing a local database.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the backend rejected the write because of a constraint.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::LibSql(e) => e.to_string().contains("constraint failed"),
            _ => false,
        }
    }

    /// User-facing classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } | Self::NoResult => ErrorKind::NotFound,
            Self::Timeout(_) => ErrorKind::Network,
            Self::LibSql(e) => classify_libsql(e),
            Self::Query(_)
            | Self::Migration(_)
            | Self::InvalidState(_)
            | Self::Io(_)
            | Self::Other(_) => ErrorKind::Unknown,
        }
    }
}

fn classify_libsql(e: &libsql::Error) -> ErrorKind {
    let msg = e.to_string();
    if msg.contains("constraint failed") {
        return ErrorKind::Conflict;
    }
    let lower = msg.to_ascii_lowercase();
    if lower.contains("unauthorized") || lower.contains("401") || lower.contains("auth token") {
        ErrorKind::Authorization
    } else if lower.contains("hrana")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("http")
    {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_not_found_kinds() {
        let err = DatabaseError::from(ValidationError::new("contact", "missing business_id"));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            DatabaseError::not_found("business", "biz-1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DatabaseError::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn constraint_failures_are_conflicts() {
        let err = DatabaseError::LibSql(libsql::Error::SqliteFailure(
            787,
            "FOREIGN KEY constraint failed".into(),
        ));
        assert!(err.is_constraint_violation());
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
