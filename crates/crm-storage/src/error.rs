//! Storage error types.

use std::time::Duration;

use crm_core::errors::ErrorKind;

/// Errors returned by object storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No usable adapter settings.
    #[error("Object storage is not configured: {reason}")]
    NotConfigured { reason: String },

    /// The call did not finish within the configured bound.
    #[error("Storage {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Object not found: {path}")]
    NotFound { path: String },

    #[error("Object already exists: {path}")]
    AlreadyExists { path: String },

    /// Credentials were rejected or have expired.
    #[error("Storage credentials rejected: {0}")]
    Unauthorized(String),

    #[error("Invalid object path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The backend cannot perform the requested operation.
    #[error("Not supported by this storage provider: {0}")]
    Unsupported(String),

    /// Any other provider failure.
    #[error("Storage provider error: {0}")]
    Provider(object_store::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            reason: reason.into(),
        }
    }

    /// User-facing classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured { .. } => ErrorKind::NotConfigured,
            Self::Timeout { .. } | Self::Provider(object_store::Error::Generic { .. }) => {
                ErrorKind::Network
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::InvalidPath { .. } => ErrorKind::Validation,
            Self::Unsupported(_) | Self::Provider(_) | Self::Other(_) => ErrorKind::Unknown,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => Self::NotFound { path },
            object_store::Error::AlreadyExists { path, .. } => Self::AlreadyExists { path },
            object_store::Error::PermissionDenied { path, source }
            | object_store::Error::Unauthenticated { path, source } => {
                Self::Unauthorized(format!("{path}: {source}"))
            }
            object_store::Error::InvalidPath { source } => Self::InvalidPath {
                path: String::new(),
                reason: source.to_string(),
            },
            other => Self::Provider(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_store_errors_are_classified() {
        let not_found: StorageError = object_store::Error::NotFound {
            path: "crm/a.pdf".into(),
            source: "missing".into(),
        }
        .into();
        assert!(not_found.is_not_found());
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let denied: StorageError = object_store::Error::PermissionDenied {
            path: "crm/a.pdf".into(),
            source: "expired token".into(),
        }
        .into();
        assert_eq!(denied.kind(), ErrorKind::Authorization);

        let generic: StorageError = object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        }
        .into();
        assert_eq!(generic.kind(), ErrorKind::Network);
        assert!(generic.kind().is_retryable());
    }

    #[test]
    fn timeout_is_a_network_error() {
        let err = StorageError::Timeout {
            operation: "upload",
            after: Duration::from_secs(60),
        };
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("upload"));
    }
}
