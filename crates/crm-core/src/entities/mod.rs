//! Entity structs for all CRM domain objects.
//!
//! Each audited entity maps to one table and implements [`Entity`], which
//! lets the record store hand back typed values instead of raw field maps.

mod audit;
mod business;
mod contact;
mod document;
mod favorite;
mod note;
mod setting;
mod task;
mod user;

pub use audit::AuditLogEntry;
pub use business::Business;
pub use contact::Contact;
pub use document::Document;
pub use favorite::Favorite;
pub use note::Note;
pub use setting::SystemSetting;
pub use task::Task;
pub use user::User;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::enums::EntityType;

/// A record type stored and audited through the record store.
pub trait Entity: Serialize + DeserializeOwned + Send {
    const TYPE: EntityType;

    /// Value of the primary key column.
    fn key(&self) -> &str;
}
