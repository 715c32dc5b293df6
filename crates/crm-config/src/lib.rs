//! # crm-config
//!
//! Layered configuration loading for the CRM core using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CRM_*` prefix, `__` as separator)
//! 2. Project-level `.crm/config.toml`
//! 3. User-level `~/.config/crm/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `CRM_DATABASE__URL` -> `database.url`,
//! `CRM_STORAGE__BUCKET__BUCKET_NAME` -> `storage.bucket.bucket_name`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use crm_config::CrmConfig;
//!
//! let config = CrmConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//!
//! if config.database.is_remote() {
//!     println!("Remote database: {}", config.database.url);
//! }
//! ```

mod database;
mod error;
mod general;
mod storage;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use storage::{BucketConfig, StorageConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CrmConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl CrmConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Calls `dotenvy` to load the `.env` file from the workspace root before
    /// building the figment.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".crm/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("CRM_").split("__"))
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let general = &self.general;
        let positive = [
            ("general.default_page_size", u64::from(general.default_page_size)),
            ("database.timeout_secs", self.database.timeout_secs),
            ("storage.timeout_secs", self.storage.timeout_secs),
            (
                "storage.part_size_bytes",
                u64::try_from(self.storage.part_size_bytes).unwrap_or(u64::MAX),
            ),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { field });
        }
        if general.default_page_size > general.max_page_size {
            return Err(ConfigError::PageSizeAboveMax {
                default: general.default_page_size,
                max: general.max_page_size,
            });
        }
        Ok(())
    }

    /// The statically configured bucket, or which of its fields are missing.
    pub fn require_bucket(&self) -> Result<&BucketConfig, ConfigError> {
        let missing = self.storage.bucket.missing_fields();
        if missing.is_empty() {
            Ok(&self.storage.bucket)
        } else {
            Err(ConfigError::BucketIncomplete { missing })
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("crm").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) looking for a `.env`
    /// file, then falls back to the current directory. Silently does nothing
    /// if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
