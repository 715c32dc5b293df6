//! Helpers shared by the crm-db integration suites.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crm_core::FieldMap;
use crm_core::enums::EntityType;
use crm_db::report::MemoryReporter;
use crm_db::service::CrmService;
use crm_storage::{ObjectStorage, ProgressFn, StorageError, UploadFile, UploadedObject};
use serde_json::{Value, json};

pub const ACTOR: &str = "usr-admin";

/// Route `tracing` output through the test harness. Filter with `CRM_LOG`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CRM_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub async fn service() -> CrmService {
    init_tracing();
    CrmService::new_local(":memory:").await.unwrap()
}

pub async fn service_with_reporter() -> (CrmService, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let svc = service().await.with_reporter(reporter.clone());
    (svc, reporter)
}

pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub async fn seed_business(svc: &CrmService, name: &str) -> String {
    let record = svc
        .create(
            ACTOR,
            EntityType::Business,
            fields(json!({"name": name, "status": "Researching"})),
        )
        .await
        .unwrap();
    record["id"].as_str().unwrap().to_string()
}

pub async fn count_rows(svc: &CrmService, table: &str) -> i64 {
    let mut rows = svc
        .db()
        .conn()
        .query(&format!("SELECT COUNT(*) FROM {table}"), ())
        .await
        .unwrap();
    rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
}

/// One adapter call, as seen by [`RecordingStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    CreateFolder(String),
    FindLink(String),
    CreateLink(String),
    Delete(String),
}

/// Adapter double that records every call and fails on demand.
#[derive(Default)]
pub struct RecordingStorage {
    calls: Mutex<Vec<Call>>,
    fail_upload: bool,
    fail_links: bool,
    fail_delete: bool,
    missing_on_delete: bool,
}

impl RecordingStorage {
    /// Every upload times out.
    pub fn failing_uploads() -> Self {
        Self {
            fail_upload: true,
            ..Self::default()
        }
    }

    /// Link creation is rejected, so uploads fall back to the constructed URL.
    pub fn failing_links() -> Self {
        Self {
            fail_links: true,
            ..Self::default()
        }
    }

    /// Deletes are rejected as unauthorized.
    pub fn failing_deletes() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }

    /// Deletes report the object as already gone.
    pub fn missing_on_delete() -> Self {
        Self {
            missing_on_delete: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    fn provider(&self) -> &str {
        "recording"
    }

    fn root_folder_path(&self) -> &str {
        "/crm"
    }

    async fn upload(
        &self,
        _file: &UploadFile,
        destination: &str,
        on_progress: &ProgressFn<'_>,
    ) -> Result<UploadedObject, StorageError> {
        self.push(Call::Upload(destination.to_string()));
        if self.fail_upload {
            return Err(StorageError::Timeout {
                operation: "upload",
                after: std::time::Duration::from_secs(1),
            });
        }
        for pct in [0, 40, 40, 100] {
            on_progress(pct);
        }
        Ok(UploadedObject {
            provider_id: Some("etag-1".into()),
            provider_path: destination.to_string(),
        })
    }

    async fn create_folder(&self, destination: &str) -> Result<(), StorageError> {
        self.push(Call::CreateFolder(destination.to_string()));
        Ok(())
    }

    async fn find_shared_link(&self, provider_path: &str) -> Result<Option<String>, StorageError> {
        self.push(Call::FindLink(provider_path.to_string()));
        Ok(None)
    }

    async fn create_shared_link(&self, provider_path: &str) -> Result<String, StorageError> {
        self.push(Call::CreateLink(provider_path.to_string()));
        if self.fail_links {
            return Err(StorageError::Unauthorized("token expired".into()));
        }
        Ok(format!("https://share.example.com{provider_path}"))
    }

    fn fallback_url(&self, provider_path: &str) -> String {
        format!("https://fallback.example.com{provider_path}")
    }

    async fn delete(&self, provider_path: &str) -> Result<(), StorageError> {
        self.push(Call::Delete(provider_path.to_string()));
        if self.missing_on_delete {
            return Err(StorageError::NotFound {
                path: provider_path.to_string(),
            });
        }
        if self.fail_delete {
            return Err(StorageError::Unauthorized("token expired".into()));
        }
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
