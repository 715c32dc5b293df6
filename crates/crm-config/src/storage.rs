//! Object-storage adapter configuration.
//!
//! Adapter credentials normally live in the `storage_settings` system
//! setting, edited by administrators. A deployment can instead pin a bucket
//! here, in which case the settings row is not consulted.

use serde::{Deserialize, Serialize};

fn default_settings_key() -> String {
    String::from("storage_settings")
}

const fn default_timeout_secs() -> u64 {
    60
}

/// 5 MiB, the smallest part S3-compatible stores accept for multipart uploads.
const fn default_part_size_bytes() -> usize {
    5 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// System-setting key holding the adapter settings blob.
    #[serde(default = "default_settings_key")]
    pub settings_key: String,

    /// Upper bound on a single adapter call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Multipart upload chunk size.
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: usize,

    /// Statically configured bucket.
    #[serde(default)]
    pub bucket: BucketConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_key: default_settings_key(),
            timeout_secs: default_timeout_secs(),
            part_size_bytes: default_part_size_bytes(),
            bucket: BucketConfig::default(),
        }
    }
}

fn default_region() -> String {
    String::from("auto")
}

fn default_root_folder_path() -> String {
    String::from("/crm")
}

/// S3-compatible bucket credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BucketConfig {
    #[serde(default)]
    pub bucket_name: String,

    /// Custom endpoint URL (R2, MinIO, ...). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    /// Public base URL that shareable links are built from.
    #[serde(default)]
    pub public_base_url: String,

    /// Prefix under which every document object is stored.
    #[serde(default = "default_root_folder_path")]
    pub root_folder_path: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            endpoint: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_base_url: String::new(),
            root_folder_path: default_root_folder_path(),
        }
    }
}

impl BucketConfig {
    /// Check if the bucket config has the minimum required fields.
    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("bucket_name", &self.bucket_name),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
