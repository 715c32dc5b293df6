//! S3-compatible bucket backend.
//!
//! Buckets have no folders, so `create_folder` only validates the path.
//! Shareable links are built from the public base URL once the object is
//! confirmed to exist, and remembered so later requests reuse them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crm_config::StorageConfig;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{MultipartUpload, ObjectStore, PutPayload};
use tokio::sync::RwLock;

use crate::adapter::{ObjectStorage, ProgressFn, UploadFile, UploadedObject};
use crate::error::StorageError;
use crate::settings::{BUCKET_PROVIDER, StorageSettings, StorageSettingsLoader};

/// Per-call limits for a bucket adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub timeout: Duration,
    /// Files larger than this are sent as a multipart upload in parts of this size.
    pub part_size: usize,
}

impl From<&StorageConfig> for StorageOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            part_size: config.part_size_bytes.max(1),
        }
    }
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

/// Build a bucket adapter from the static config or, failing that, the loader.
pub async fn connect(
    config: &StorageConfig,
    loader: &dyn StorageSettingsLoader,
) -> Result<BucketStorage, StorageError> {
    let settings = if config.bucket.is_configured() {
        StorageSettings::from(&config.bucket)
    } else {
        loader
            .load()
            .await?
            .ok_or_else(|| StorageError::not_configured("no storage settings have been saved"))?
    };
    BucketStorage::from_settings(settings, StorageOptions::from(config))
}

/// [`ObjectStorage`] over any `object_store` backend.
pub struct BucketStorage {
    store: Arc<dyn ObjectStore>,
    settings: StorageSettings,
    options: StorageOptions,
    links: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for BucketStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketStorage")
            .field("store", &self.store.to_string())
            .field("bucket", &self.settings.bucket_name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BucketStorage {
    /// Validate `settings` and connect to the S3-compatible endpoint they name.
    pub fn from_settings(settings: StorageSettings, options: StorageOptions) -> Result<Self, StorageError> {
        settings.validate()?;
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket_name)
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key);
        if !settings.region.is_empty() {
            builder = builder.with_region(&settings.region);
        }
        if !settings.endpoint.is_empty() {
            builder = builder
                .with_endpoint(&settings.endpoint)
                .with_allow_http(settings.endpoint.starts_with("http://"));
        }
        let store = builder.build()?;
        Self::with_store(Arc::new(store), settings, options)
    }

    /// Use an already-built store (e.g. `InMemory` in tests).
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        settings: StorageSettings,
        options: StorageOptions,
    ) -> Result<Self, StorageError> {
        settings.validate()?;
        Ok(Self {
            store,
            settings,
            options,
            links: RwLock::new(HashMap::new()),
        })
    }

    pub const fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>> + Send,
    {
        tokio::time::timeout(self.options.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout {
                operation,
                after: self.options.timeout,
            })?
    }

    fn public_url(&self, key: &Path) -> Option<String> {
        let base = self.settings.public_base_url.trim_end_matches('/');
        (!base.is_empty()).then(|| format!("{base}/{key}"))
    }

    /// Send `file` to `key`, bounding every provider request separately.
    ///
    /// A multipart upload that fails or stalls is aborted before returning so
    /// no staged parts stay behind.
    async fn put_object(
        &self,
        key: &Path,
        file: &UploadFile,
        on_progress: &ProgressFn<'_>,
    ) -> Result<UploadedObject, StorageError> {
        let total = file.bytes.len();
        on_progress(0);

        if total <= self.options.part_size {
            let payload = PutPayload::from(file.bytes.clone());
            let result = self
                .bounded("upload", async {
                    self.store.put(key, payload).await.map_err(StorageError::from)
                })
                .await?;
            on_progress(100);
            return Ok(UploadedObject {
                provider_id: result.e_tag,
                provider_path: format!("/{key}"),
            });
        }

        let mut upload = self
            .bounded("upload", async {
                self.store.put_multipart(key).await.map_err(StorageError::from)
            })
            .await?;
        let mut sent = 0usize;
        for chunk in file.bytes.chunks(self.options.part_size) {
            let part = upload.put_part(PutPayload::from(chunk.to_vec()));
            if let Err(err) = self
                .bounded("upload", async { part.await.map_err(StorageError::from) })
                .await
            {
                self.abort_upload(key, upload.as_mut()).await;
                return Err(err);
            }
            sent += chunk.len();
            let percent = sent.saturating_mul(100) / total;
            on_progress(u8::try_from(percent).unwrap_or(100));
        }

        let completed = self
            .bounded("upload", async { upload.complete().await.map_err(StorageError::from) })
            .await;
        match completed {
            Ok(result) => Ok(UploadedObject {
                provider_id: result.e_tag,
                provider_path: format!("/{key}"),
            }),
            Err(err) => {
                self.abort_upload(key, upload.as_mut()).await;
                Err(err)
            }
        }
    }

    async fn abort_upload(&self, key: &Path, upload: &mut dyn MultipartUpload) {
        let aborted = self
            .bounded("abort", async { upload.abort().await.map_err(StorageError::from) })
            .await;
        match aborted {
            Ok(()) => tracing::debug!(%key, "multipart upload aborted"),
            Err(err) => tracing::warn!(%key, error = %err, "failed to abort multipart upload"),
        }
    }
}

/// Convert a provider path (`/crm/a/1.pdf`) into an object key.
fn object_key(provider_path: &str) -> Result<Path, StorageError> {
    let trimmed = provider_path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StorageError::InvalidPath {
            path: provider_path.to_string(),
            reason: "path is empty".into(),
        });
    }
    Path::parse(trimmed).map_err(|e| StorageError::InvalidPath {
        path: provider_path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    fn provider(&self) -> &str {
        BUCKET_PROVIDER
    }

    fn root_folder_path(&self) -> &str {
        &self.settings.root_folder_path
    }

    async fn upload(
        &self,
        file: &UploadFile,
        destination: &str,
        on_progress: &ProgressFn<'_>,
    ) -> Result<UploadedObject, StorageError> {
        let key = object_key(destination)?;
        tracing::debug!(%key, bytes = file.bytes.len(), "uploading object");
        let uploaded = self.put_object(&key, file, on_progress).await?;
        tracing::debug!(provider_path = %uploaded.provider_path, "upload complete");
        Ok(uploaded)
    }

    async fn create_folder(&self, destination: &str) -> Result<(), StorageError> {
        let key = object_key(destination)?;
        tracing::debug!(%key, "bucket folders are implicit; nothing to create");
        Ok(())
    }

    async fn find_shared_link(&self, provider_path: &str) -> Result<Option<String>, StorageError> {
        let key = object_key(provider_path)?;
        Ok(self.links.read().await.get(&key.to_string()).cloned())
    }

    async fn create_shared_link(&self, provider_path: &str) -> Result<String, StorageError> {
        let key = object_key(provider_path)?;
        self.bounded("head", async { Ok::<_, StorageError>(self.store.head(&key).await?) })
            .await?;
        let url = self.public_url(&key).ok_or_else(|| {
            StorageError::Unsupported("no public base URL is configured for shared links".into())
        })?;
        self.links
            .write()
            .await
            .insert(key.to_string(), url.clone());
        Ok(url)
    }

    fn fallback_url(&self, provider_path: &str) -> String {
        let key = provider_path.trim_matches('/');
        let base = self.settings.public_base_url.trim_end_matches('/');
        if !base.is_empty() {
            return format!("{base}/{key}");
        }
        let endpoint = self.settings.endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            format!(
                "https://{}.s3.amazonaws.com/{key}",
                self.settings.bucket_name
            )
        } else {
            format!("{endpoint}/{}/{key}", self.settings.bucket_name)
        }
    }

    async fn delete(&self, provider_path: &str) -> Result<(), StorageError> {
        let key = object_key(provider_path)?;
        tracing::debug!(%key, "deleting object");
        self.bounded("delete", async { Ok::<_, StorageError>(self.store.delete(&key).await?) })
            .await?;
        self.links.write().await.remove(&key.to_string());
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), StorageError> {
        let root = self.settings.root_folder_path.trim_matches('/');
        let prefix = if root.is_empty() {
            None
        } else {
            Some(object_key(root)?)
        };
        self.bounded("list", async {
            Ok::<_, StorageError>(self.store.list_with_delimiter(prefix.as_ref()).await?)
        })
        .await?;
        tracing::debug!(bucket = %self.settings.bucket_name, "storage connection ok");
        Ok(())
    }
}
