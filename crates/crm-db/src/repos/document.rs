//! Document workflows spanning the record store and object storage.
//!
//! Uploads run validate → upload → shareable link → audited insert, and
//! remove the uploaded object again when the insert fails. Folder rows and
//! deletes keep the remote side and the `documents` table in step.

use crm_core::documents::{DocumentEntry, FolderSource, StorageReference};
use crm_core::entities::Document;
use crm_core::enums::{DocumentCategory, EntityType};
use crm_core::errors::{ErrorKind, ValidationError};
use crm_core::paths::{child_path, normalize_path, validate_segment};
use crm_core::FieldMap;
use crm_core::validation::{FOLDER_TYPE, validate_create};
use crm_storage::progress::{ProgressTracker, UPLOAD_STAGE};
use crm_storage::{ProgressFn, StorageError, UploadFile};
use serde_json::{Value, json};
use thiserror::Error;

use crate::error::DatabaseError;
use crate::helpers::object;
use crate::report::Incident;
use crate::repos::records::decode;
use crate::service::CrmService;

/// Overall progress once a shareable link has been obtained.
const LINKED: u8 = 85;
/// Overall progress once the row is about to be written.
const RECORDING: u8 = 90;

/// Errors from document workflows.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("folder already exists: {path}")]
    AlreadyExists { path: String },
}

impl DocumentError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(e) => e.kind(),
            Self::Database(e) => e.kind(),
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
        }
    }
}

/// A file to attach to a business.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub business_id: String,
    /// Display name; defaults to the file name.
    pub name: Option<String>,
    pub category: Option<DocumentCategory>,
    pub description: Option<String>,
    /// Virtual directory to place the document in.
    pub path: String,
    pub file: UploadFile,
}

impl DocumentUpload {
    pub fn new(business_id: impl Into<String>, path: impl Into<String>, file: UploadFile) -> Self {
        Self {
            business_id: business_id.into(),
            name: None,
            category: None,
            description: None,
            path: path.into(),
            file,
        }
    }

    fn fields(&self, actor: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("business_id".into(), json!(self.business_id));
        fields.insert(
            "name".into(),
            json!(self.name.clone().unwrap_or_else(|| self.file.name.clone())),
        );
        fields.insert("type".into(), json!(self.file.extension()));
        fields.insert("category".into(), json!(self.category.map(|c| c.as_str())));
        fields.insert("description".into(), json!(self.description));
        fields.insert("path".into(), json!(normalize_path(&self.path)));
        fields.insert("created_by".into(), json!(actor));
        fields
    }
}

impl CrmService {
    /// Upload a file and record it as a document of its business.
    ///
    /// Progress runs 10..80 for the transfer, then 85 once a link exists,
    /// 90 before the insert, and 100 when the row is written. A failed
    /// insert triggers one delete of the uploaded object; if that delete
    /// fails too it is reported and the insert error is still returned.
    ///
    /// # Errors
    ///
    /// `Validation` before anything remote happens, `Storage` when the
    /// upload fails (no row is written), `Database` when the insert fails.
    pub async fn upload_document(
        &self,
        actor: &str,
        upload: DocumentUpload,
        on_progress: &ProgressFn<'_>,
    ) -> Result<Document, DocumentError> {
        let mut fields = validate_create(EntityType::Document, upload.fields(actor))?;
        let storage = self.storage()?;

        let tracker = ProgressTracker::new(UPLOAD_STAGE.0, UPLOAD_STAGE.1, on_progress);
        tracker.set(UPLOAD_STAGE.0);

        let directory = fields
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or(crm_core::paths::ROOT)
            .to_string();
        let destination = storage.object_path_for(&directory, &upload.file);
        let uploaded = storage
            .upload(&upload.file, &destination, &|pct: u8| tracker.report(pct))
            .await?;
        tracing::info!(provider_path = %uploaded.provider_path, "document uploaded");

        let shared_url = storage.shareable_link_or_fallback(&uploaded.provider_path).await;
        tracker.set(LINKED);

        let reference = StorageReference {
            provider: storage.provider().to_string(),
            provider_id: uploaded.provider_id.clone(),
            provider_path: uploaded.provider_path.clone(),
            shared_url,
        };
        fields.insert(
            "storage_reference".into(),
            serde_json::to_value(&reference).map_err(|e| DatabaseError::Other(e.into()))?,
        );
        tracker.set(RECORDING);

        match self.create(actor, EntityType::Document, fields).await {
            Ok(record) => {
                tracker.set(100);
                // The row exists from here on; the object must stay.
                Ok(decode::<Document>(record)?)
            }
            Err(insert_error) => {
                tracing::warn!(
                    provider_path = %uploaded.provider_path,
                    error = %insert_error,
                    "document insert failed, removing uploaded object"
                );
                if let Err(cleanup) = storage.delete(&uploaded.provider_path).await {
                    self.reporter().report(&Incident::CompensationFailed {
                        provider_path: uploaded.provider_path.clone(),
                        error: cleanup.to_string(),
                        original_error: insert_error.to_string(),
                    });
                }
                Err(insert_error.into())
            }
        }
    }

    /// Create an explicit folder row named `name` inside `parent`.
    ///
    /// The folder is also created remotely when storage is attached.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad name or missing business, `AlreadyExists` when
    /// the business already has that folder row, otherwise the storage or
    /// database error.
    pub async fn create_document_folder(
        &self,
        actor: &str,
        business_id: &str,
        parent: &str,
        name: &str,
    ) -> Result<Document, DocumentError> {
        validate_segment(name)?;
        let name = name.trim();
        let parent = normalize_path(parent);
        let fields = validate_create(
            EntityType::Document,
            object(json!({
                "business_id": business_id,
                "name": name,
                "type": FOLDER_TYPE,
                "path": parent,
                "created_by": actor,
            })),
        )?;

        let folder_path = child_path(&parent, name);
        let mut rows = self
            .db()
            .query_with(
                "SELECT id FROM documents
                 WHERE business_id = ?1 AND path = ?2 AND name = ?3 AND type = ?4",
                || libsql::params![business_id, parent.as_str(), name, FOLDER_TYPE],
            )
            .await
            .map_err(DocumentError::Database)?;
        if rows.next().await.map_err(DatabaseError::from)?.is_some() {
            return Err(DocumentError::AlreadyExists { path: folder_path });
        }

        if let Ok(storage) = self.storage() {
            let root = storage.root_folder_path().trim_end_matches('/');
            storage.create_folder(&format!("{root}{folder_path}")).await?;
        }

        let folder = self.create_as::<Document>(actor, fields).await?;
        tracing::info!(id = %folder.id, path = %folder_path, "folder created");
        Ok(folder)
    }

    /// Delete a document row and its remote object.
    ///
    /// The remote object goes first; one that is already gone is not an
    /// error. Deleting a folder row, or a row whose reference cannot be
    /// read, removes only the row.
    ///
    /// # Errors
    ///
    /// `NotConfigured` storage error when the row references an object but
    /// no storage is attached; otherwise the storage or database error.
    pub async fn delete_document(&self, actor: &str, id: &str) -> Result<(), DocumentError> {
        let record = self.get(EntityType::Document, id).await?;
        let reference = match record.get("storage_reference") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<StorageReference>(raw.clone()) {
                Ok(reference) => Some(reference),
                Err(e) => {
                    tracing::warn!(id, error = %e, "unreadable storage reference, removing the row only");
                    None
                }
            },
        };

        if let Some(reference) = &reference {
            let storage = self.storage()?;
            match storage.delete(&reference.provider_path).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        provider_path = %reference.provider_path,
                        "remote object already gone"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.delete(actor, EntityType::Document, id).await?;
        Ok(())
    }

    /// Delete whatever a listing entry stands for.
    ///
    /// # Errors
    ///
    /// `Validation` for a synthesized folder, which has no row; otherwise
    /// as [`Self::delete_document`].
    pub async fn delete_entry(&self, actor: &str, entry: &DocumentEntry) -> Result<(), DocumentError> {
        match entry {
            DocumentEntry::File(doc) => self.delete_document(actor, &doc.id).await,
            DocumentEntry::Folder(folder) => match &folder.source {
                FolderSource::Explicit { id, .. } => {
                    self.delete_document(actor, id).await
                }
                FolderSource::Synthesized => Err(ValidationError::new(
                    EntityType::Document.as_str(),
                    format!("{} is derived from other documents and cannot be deleted", folder.path),
                )
                .into()),
            },
        }
    }
}
