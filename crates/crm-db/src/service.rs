//! Service layer orchestrating record mutations with their audit entries.
//!
//! `CrmService` wraps `CrmDb` (raw database access), an [`ErrorReporter`]
//! for swallowed failures, and an optional [`ObjectStorage`] adapter for
//! document files. All repo methods are implemented as `impl CrmService`.

use std::sync::Arc;

use crm_config::{CrmConfig, StorageConfig};
use crm_storage::{ObjectStorage, StorageError};

use crate::CrmDb;
use crate::error::DatabaseError;
use crate::report::{ErrorReporter, TracingReporter};
use crate::repos::setting::SystemSettingsLoader;

/// Orchestrates database mutations with the change log.
///
/// Every mutation method follows this protocol:
/// 1. Validate input (nothing touches the database on failure)
/// 2. Read the pre-image when there is one
/// 3. Execute SQL
/// 4. Append one change-log entry; a failure here is reported, not returned
pub struct CrmService {
    db: CrmDb,
    reporter: Arc<dyn ErrorReporter>,
    storage: Option<Arc<dyn ObjectStorage>>,
    default_page_size: u32,
    max_page_size: u32,
}

impl CrmService {
    pub const DEFAULT_PAGE_SIZE: u32 = 25;
    pub const MAX_PAGE_SIZE: u32 = 200;

    /// Create a service over a local database with no storage attached.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = CrmDb::open_local(db_path).await?;
        Ok(Self::from_db(db))
    }

    /// Create a service from loaded configuration.
    ///
    /// Attaches bucket storage when static bucket settings or saved settings
    /// exist. Without them the service still works; document uploads then
    /// fail with a not-configured error.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open(config: &CrmConfig) -> Result<Self, DatabaseError> {
        let db = CrmDb::open(&config.database).await?;
        let mut service = Self::from_db(db)
            .with_page_limits(config.general.default_page_size, config.general.max_page_size);
        match service.attach_bucket_storage(&config.storage).await {
            Ok(()) => tracing::info!("object storage attached"),
            Err(StorageError::NotConfigured { reason }) => {
                tracing::info!(%reason, "object storage not configured");
            }
            Err(error) => tracing::warn!(%error, "object storage unavailable"),
        }
        Ok(service)
    }

    /// Create from an existing `CrmDb`.
    #[must_use]
    pub fn from_db(db: CrmDb) -> Self {
        Self {
            db,
            reporter: Arc::new(TracingReporter),
            storage: None,
            default_page_size: Self::DEFAULT_PAGE_SIZE,
            max_page_size: Self::MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Page size used when a query names none, and the cap on any requested size.
    #[must_use]
    pub fn with_page_limits(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self.default_page_size = default_page_size.clamp(1, self.max_page_size);
        self
    }

    /// Build a bucket adapter from `config`, falling back to the settings
    /// saved under `config.settings_key`, and attach it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotConfigured` when neither source has usable
    /// settings.
    pub async fn attach_bucket_storage(&mut self, config: &StorageConfig) -> Result<(), StorageError> {
        let loader = SystemSettingsLoader::new(self, &config.settings_key);
        let storage = crm_storage::connect(config, &loader).await?;
        self.storage = Some(Arc::new(storage));
        Ok(())
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &CrmDb {
        &self.db
    }

    pub(crate) fn reporter(&self) -> &dyn ErrorReporter {
        self.reporter.as_ref()
    }

    /// The attached storage adapter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotConfigured` when none is attached.
    pub fn storage(&self) -> Result<&Arc<dyn ObjectStorage>, StorageError> {
        self.storage
            .as_ref()
            .ok_or_else(|| StorageError::not_configured("no object storage adapter is attached"))
    }

    #[must_use]
    pub const fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub(crate) const fn page_limits(&self) -> (u32, u32) {
        (self.default_page_size, self.max_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::errors::ErrorKind;

    #[tokio::test]
    async fn storage_is_not_configured_by_default() {
        let svc = CrmService::new_local(":memory:").await.unwrap();
        assert!(!svc.has_storage());
        let err = svc.storage().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[tokio::test]
    async fn attach_without_settings_is_not_configured() {
        let mut svc = CrmService::new_local(":memory:").await.unwrap();
        let err = svc
            .attach_bucket_storage(&StorageConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
        assert!(!svc.has_storage());
    }

    #[tokio::test]
    async fn page_limits_are_sane() {
        let svc = CrmService::new_local(":memory:")
            .await
            .unwrap()
            .with_page_limits(500, 100);
        assert_eq!(svc.page_limits(), (100, 100));
    }
}
