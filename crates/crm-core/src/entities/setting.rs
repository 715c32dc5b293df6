use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::enums::EntityType;

/// One row of application-wide configuration, keyed by `key`.
///
/// `value` is an opaque structured blob; the object-storage settings live here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemSetting {
    pub key: String,
    pub value: Option<serde_json::Value>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for SystemSetting {
    const TYPE: EntityType = EntityType::SystemSetting;

    fn key(&self) -> &str {
        &self.key
    }
}
