use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::enums::{EntityType, NoteCategory};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub content: Option<String>,
    pub category: Option<NoteCategory>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Note {
    const TYPE: EntityType = EntityType::Note;

    fn key(&self) -> &str {
        &self.id
    }
}
