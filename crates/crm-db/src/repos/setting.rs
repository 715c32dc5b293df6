//! System settings: keyed configuration rows, and the loader that feeds
//! saved object-storage settings to the adapter.

use async_trait::async_trait;
use crm_core::entities::SystemSetting;
use crm_core::enums::EntityType;
use crm_storage::{StorageError, StorageSettings, StorageSettingsLoader};
use serde_json::{Value, json};

use crate::error::DatabaseError;
use crate::helpers::object;
use crate::service::CrmService;

impl CrmService {
    /// Create or replace the setting named `key`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the read or write fails.
    pub async fn put_setting(
        &self,
        actor: &str,
        key: &str,
        value: Value,
    ) -> Result<SystemSetting, DatabaseError> {
        match self.get(EntityType::SystemSetting, key).await {
            Ok(_) => {
                self.update_as(actor, key, object(json!({"value": value, "updated_by": actor})))
                    .await
            }
            Err(DatabaseError::NotFound { .. }) => {
                self.create_as(
                    actor,
                    object(json!({"key": key, "value": value, "updated_by": actor})),
                )
                .await
            }
            Err(e) => Err(e),
        }
    }

    /// The setting named `key`, if one has been saved.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, DatabaseError> {
        match self.get_as::<SystemSetting>(key).await {
            Ok(setting) => Ok(Some(setting)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Reads adapter settings from one `system_settings` row.
pub struct SystemSettingsLoader<'a> {
    service: &'a CrmService,
    key: String,
}

impl<'a> SystemSettingsLoader<'a> {
    pub fn new(service: &'a CrmService, key: impl Into<String>) -> Self {
        Self {
            service,
            key: key.into(),
        }
    }
}

#[async_trait]
impl StorageSettingsLoader for SystemSettingsLoader<'_> {
    async fn load(&self) -> Result<Option<StorageSettings>, StorageError> {
        let setting = self
            .service
            .get_setting(&self.key)
            .await
            .map_err(|e| StorageError::Other(anyhow::Error::new(e)))?;
        match setting.and_then(|s| s.value) {
            Some(value) => {
                tracing::debug!(key = %self.key, "loaded saved storage settings");
                StorageSettings::from_value(value).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crm_config::StorageConfig;
    use crm_core::audit::REDACTED;
    use crm_core::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::helpers::{ACTOR, test_service};

    fn saved_settings() -> Value {
        json!({
            "is_configured": true,
            "provider": "bucket",
            "bucket_name": "crm-docs",
            "endpoint": "http://localhost:9000",
            "access_key_id": "AKIA",
            "secret_access_key": "very-secret",
            "root_folder_path": "/crm",
        })
    }

    #[tokio::test]
    async fn put_setting_upserts() {
        let svc = test_service().await;
        let first = svc.put_setting(ACTOR, "theme", json!({"dark": false})).await.unwrap();
        let second = svc.put_setting("usr-2", "theme", json!({"dark": true})).await.unwrap();

        assert_eq!(first.key, second.key);
        assert_eq!(second.value, Some(json!({"dark": true})));
        assert_eq!(second.updated_by.as_deref(), Some("usr-2"));
        assert_eq!(svc.history("system_settings", "theme").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_setting_missing_is_none() {
        let svc = test_service().await;
        assert_eq!(svc.get_setting("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn secrets_never_reach_the_log() {
        let svc = test_service().await;
        svc.put_setting(ACTOR, "storage_settings", saved_settings()).await.unwrap();
        svc.put_setting(ACTOR, "dropbox_token", json!("sl.abc123")).await.unwrap();

        for entry in svc.query_audit(&Default::default()).await.unwrap().entries {
            let snapshot = entry.new_value.unwrap();
            assert!(!snapshot.contains("very-secret"), "{snapshot}");
            assert!(!snapshot.contains("sl.abc123"), "{snapshot}");
        }
        let token = svc.history("system_settings", "dropbox_token").await.unwrap();
        assert_eq!(token[0].new_snapshot().unwrap()["value"], json!(REDACTED));
    }

    #[tokio::test]
    async fn loader_reads_saved_settings() {
        let svc = test_service().await;
        svc.put_setting(ACTOR, "storage_settings", saved_settings()).await.unwrap();

        let loaded = SystemSettingsLoader::new(&svc, "storage_settings")
            .load()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.bucket_name, "crm-docs");
        assert_eq!(loaded.secret_access_key, "very-secret");
    }

    #[tokio::test]
    async fn loader_without_row_is_none() {
        let svc = test_service().await;
        let loaded = SystemSettingsLoader::new(&svc, "storage_settings").load().await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn saved_settings_attach_storage() {
        let mut svc = test_service().await;
        svc.put_setting(ACTOR, "storage_settings", saved_settings()).await.unwrap();
        svc.attach_bucket_storage(&StorageConfig::default()).await.unwrap();
        assert!(svc.has_storage());
    }

    #[tokio::test]
    async fn unconfigured_saved_settings_are_rejected() {
        let mut svc = test_service().await;
        svc.put_setting(ACTOR, "storage_settings", json!({"is_configured": false}))
            .await
            .unwrap();
        let err = svc
            .attach_bucket_storage(&StorageConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }
}
