//! Cross-cutting error types for the CRM core.
//!
//! Domain-specific errors (`DatabaseError`, `StorageError`, `ConfigError`)
//! live in their own crates. Every one of them classifies itself into an
//! [`ErrorKind`], which is what callers use to pick retry vs. surface vs.
//! contact-an-administrator messaging.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// User-facing classification of any failure the core can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required field is missing or malformed. Raised before any remote call.
    Validation,
    /// No object-storage credentials or settings are present.
    NotConfigured,
    /// Transport failure or timeout talking to the backend or provider.
    Network,
    /// Rejected or expired credentials.
    Authorization,
    /// The target already exists or is still referenced.
    Conflict,
    NotFound,
    Unknown,
}

impl ErrorKind {
    /// Human-readable message suitable for showing to the end user.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Validation => "Some required information is missing or invalid.",
            Self::NotConfigured => {
                "File storage is not configured. Please contact an administrator."
            }
            Self::Network => "A network error or timeout occurred. Please try again.",
            Self::Authorization => {
                "The storage credentials were rejected or have expired. Please contact an administrator."
            }
            Self::Conflict => "The item already exists or is still in use.",
            Self::NotFound => "The requested item could not be found.",
            Self::Unknown => "An unexpected error occurred.",
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotConfigured => "not_configured",
            Self::Network => "network",
            Self::Authorization => "authorization",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record failed required-field or type validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {entity}: {message}")]
pub struct ValidationError {
    /// Entity name (`"contact"`, `"document"`, ...).
    pub entity: String,
    pub message: String,
    /// Offending field names, if any.
    pub fields: Vec<String>,
}

impl ValidationError {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Errors that can be raised by any CRM crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored string did not match any variant of an enum.
    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record could not be decoded into its typed entity struct.
    #[error("Failed to decode {entity}: {source}")]
    Decode {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownVariant { .. } | Self::Validation(_) => ErrorKind::Validation,
            Self::Decode { .. } | Self::Other(_) => ErrorKind::Unknown,
        }
    }
}
