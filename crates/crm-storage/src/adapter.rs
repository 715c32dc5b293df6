//! The object storage adapter contract.

use async_trait::async_trait;
use crm_core::paths::normalize_path;

use crate::error::StorageError;

/// Progress callback. Receives a monotonically increasing 0..=100.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, used for the extension.
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    /// Lower-cased extension without the dot, if the name has one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Provider-assigned identifier (e.g. an entity tag), when available.
    pub provider_id: Option<String>,
    pub provider_path: String,
}

/// Provider path for a new upload: `root + directory + "<unix-millis>.<ext>"`.
#[must_use]
pub fn object_path(root: &str, directory: &str, extension: Option<&str>, millis: i64) -> String {
    let root = root.trim_end_matches('/');
    let directory = normalize_path(directory);
    match extension {
        Some(ext) => format!("{root}{directory}{millis}.{ext}"),
        None => format!("{root}{directory}{millis}"),
    }
}

/// A remote binary-file store.
///
/// Implementations bound every call with their own timeout so that a stalled
/// provider surfaces as [`StorageError::Timeout`] instead of hanging.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Short provider name recorded in storage references.
    fn provider(&self) -> &str;

    /// Prefix under which all document objects live.
    fn root_folder_path(&self) -> &str;

    /// Upload `file` to `destination`, reporting progress as it goes.
    async fn upload(
        &self,
        file: &UploadFile,
        destination: &str,
        on_progress: &ProgressFn<'_>,
    ) -> Result<UploadedObject, StorageError>;

    /// Create a folder at `destination`.
    async fn create_folder(&self, destination: &str) -> Result<(), StorageError>;

    /// An existing shareable link for `provider_path`, if one was minted before.
    async fn find_shared_link(&self, provider_path: &str) -> Result<Option<String>, StorageError>;

    /// Mint a new shareable link for `provider_path`.
    async fn create_shared_link(&self, provider_path: &str) -> Result<String, StorageError>;

    /// Best-effort URL used when no link can be obtained.
    fn fallback_url(&self, provider_path: &str) -> String;

    async fn delete(&self, provider_path: &str) -> Result<(), StorageError>;

    /// Verify credentials and that the root folder is reachable.
    async fn test_connection(&self) -> Result<(), StorageError>;

    /// Shareable link for `provider_path`, reusing an existing one before
    /// minting a new one.
    async fn shareable_link(&self, provider_path: &str) -> Result<String, StorageError> {
        if let Some(url) = self.find_shared_link(provider_path).await? {
            tracing::debug!(provider_path, "reusing shared link");
            return Ok(url);
        }
        self.create_shared_link(provider_path).await
    }

    /// [`Self::shareable_link`], degrading to [`Self::fallback_url`] on failure.
    async fn shareable_link_or_fallback(&self, provider_path: &str) -> String {
        match self.shareable_link(provider_path).await {
            Ok(url) => url,
            Err(error) => {
                let fallback = self.fallback_url(provider_path);
                tracing::warn!(
                    provider_path,
                    %error,
                    fallback = %fallback,
                    "shared link unavailable, using fallback URL"
                );
                fallback
            }
        }
    }

    /// Provider path for a new upload of `file` into virtual `directory`.
    fn object_path_for(&self, directory: &str, file: &UploadFile) -> String {
        object_path(
            self.root_folder_path(),
            directory,
            file.extension().as_deref(),
            chrono::Utc::now().timestamp_millis(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/crm", "/contracts/", Some("pdf"), "/crm/contracts/1714557600000.pdf")]
    #[case("/crm/", "", Some("pdf"), "/crm/1714557600000.pdf")]
    #[case("", "a/b", None, "/a/b/1714557600000")]
    fn object_paths(
        #[case] root: &str,
        #[case] directory: &str,
        #[case] ext: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(object_path(root, directory, ext, 1_714_557_600_000), expected);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(UploadFile::new("Deck.PPTX", vec![]).extension().as_deref(), Some("pptx"));
        assert_eq!(UploadFile::new("README", vec![]).extension(), None);
    }
}
