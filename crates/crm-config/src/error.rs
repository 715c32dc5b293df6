//! Failures while loading or checking the CRM configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file or `CRM_*` variable could not be read or deserialized.
    #[error("Failed to load CRM configuration: {0}")]
    Load(#[from] figment::Error),

    /// A count, size, or timeout that has to be at least one is zero.
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("general.default_page_size ({default}) exceeds general.max_page_size ({max})")]
    PageSizeAboveMax { default: u32, max: u32 },

    /// Static bucket credentials were requested but are incomplete.
    #[error("storage.bucket is not configured; missing {}", missing.join(", "))]
    BucketIncomplete { missing: Vec<&'static str> },
}
