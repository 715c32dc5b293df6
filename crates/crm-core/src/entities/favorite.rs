use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's bookmark on a business. Not audited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub business_id: String,
    pub created_at: DateTime<Utc>,
}
