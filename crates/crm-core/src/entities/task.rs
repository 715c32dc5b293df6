use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::enums::{EntityType, TaskStatus};

/// A dated follow-up item against a business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Task {
    const TYPE: EntityType = EntityType::Task;

    fn key(&self) -> &str {
        &self.id
    }
}
