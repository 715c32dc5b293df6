use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::documents::StorageReference;
use crate::enums::{DocumentCategory, EntityType};
use crate::paths::child_path;
use crate::validation::FOLDER_TYPE;

/// A stored file, or an explicit folder marker row, owned by a business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// File extension, or `"folder"` for a folder marker row.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<DocumentCategory>,
    pub description: Option<String>,
    /// Directory the document lives in. Always starts and ends with `/`.
    pub path: String,
    pub storage_reference: Option<StorageReference>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind.as_deref() == Some(FOLDER_TYPE)
    }

    /// For a folder row, the directory path it models (`path + name + "/"`).
    #[must_use]
    pub fn folder_path(&self) -> Option<String> {
        self.is_folder().then(|| child_path(&self.path, &self.name))
    }
}

impl Entity for Document {
    const TYPE: EntityType = EntityType::Document;

    fn key(&self) -> &str {
        &self.id
    }
}
