//! Adapter settings and the loader interface that supplies them.

use async_trait::async_trait;
use crm_config::BucketConfig;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Provider name of the S3-compatible bucket backend.
pub const BUCKET_PROVIDER: &str = "bucket";

fn default_provider() -> String {
    String::from(BUCKET_PROVIDER)
}

/// Credentials and layout for an object storage backend.
///
/// Persisted as the JSON value of a system setting, so every field
/// tolerates being absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Set by an administrator once the settings have been filled in.
    #[serde(default)]
    pub is_configured: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default)]
    pub root_folder_path: String,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("is_configured", &self.is_configured)
            .field("provider", &self.provider)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .field("public_base_url", &self.public_base_url)
            .field("root_folder_path", &self.root_folder_path)
            .finish()
    }
}

impl StorageSettings {
    /// Check that the settings can back an adapter.
    pub fn validate(&self) -> Result<(), StorageError> {
        if !self.is_configured {
            return Err(StorageError::not_configured(
                "storage settings are not marked as configured",
            ));
        }
        if self.provider != BUCKET_PROVIDER {
            return Err(StorageError::not_configured(format!(
                "unsupported storage provider '{}'",
                self.provider
            )));
        }
        if self.bucket_name.trim().is_empty() {
            return Err(StorageError::not_configured("bucket name is empty"));
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(StorageError::not_configured("bucket credentials are missing"));
        }
        Ok(())
    }

    /// Parse the JSON blob stored in a system setting.
    pub fn from_value(value: serde_json::Value) -> Result<Self, StorageError> {
        serde_json::from_value(value).map_err(|e| {
            StorageError::not_configured(format!("storage settings are malformed: {e}"))
        })
    }
}

impl From<&BucketConfig> for StorageSettings {
    fn from(config: &BucketConfig) -> Self {
        Self {
            is_configured: config.is_configured(),
            provider: default_provider(),
            bucket_name: config.bucket_name.clone(),
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            public_base_url: config.public_base_url.clone(),
            root_folder_path: config.root_folder_path.clone(),
        }
    }
}

/// Source of adapter settings, consulted once when an adapter is built.
#[async_trait]
pub trait StorageSettingsLoader: Send + Sync {
    /// The saved settings, or `None` when nothing has been saved.
    async fn load(&self) -> Result<Option<StorageSettings>, StorageError>;
}

/// Loader over a fixed value, for deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettingsLoader(pub Option<StorageSettings>);

#[async_trait]
impl StorageSettingsLoader for StaticSettingsLoader {
    async fn load(&self) -> Result<Option<StorageSettings>, StorageError> {
        Ok(self.0.clone())
    }
}
