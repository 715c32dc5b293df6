use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::enums::{BusinessStatus, EntityType};

/// A company whose relationship is being tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub status: BusinessStatus,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub num_employees: Option<i64>,
    pub revenue: Option<f64>,
    pub year_founded: Option<i64>,
    pub point_of_contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Business {
    const TYPE: EntityType = EntityType::Business;

    fn key(&self) -> &str {
        &self.id
    }
}
