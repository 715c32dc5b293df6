use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::FieldName;

/// One immutable row of the change log.
///
/// `old_value`/`new_value` hold whole-record JSON snapshots with secrets
/// redacted. `old_value` is `None` for a creation, `new_value` for a deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub id: String,
    pub table_name: String,
    pub record_id: String,
    pub field_name: FieldName,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Parse the pre-image snapshot.
    #[must_use]
    pub fn old_snapshot(&self) -> Option<serde_json::Value> {
        self.old_value.as_deref().and_then(|s| serde_json::from_str(s).ok())
    }

    /// Parse the post-image snapshot.
    #[must_use]
    pub fn new_snapshot(&self) -> Option<serde_json::Value> {
        self.new_value.as_deref().and_then(|s| serde_json::from_str(s).ok())
    }
}
