//! ID prefix constants for all CRM entities.
//!
//! IDs are generated by the database as `{prefix}-{16 hex chars}`
//! (e.g. `biz-a3f8b2c19e04d71f`). Users are the exception: their id is
//! supplied by the access gate. System settings are keyed by `key`.

pub const PREFIX_BUSINESS: &str = "biz";
pub const PREFIX_CONTACT: &str = "con";
pub const PREFIX_TASK: &str = "tsk";
pub const PREFIX_NOTE: &str = "not";
pub const PREFIX_DOCUMENT: &str = "doc";
pub const PREFIX_USER: &str = "usr";
pub const PREFIX_AUDIT: &str = "log";
pub const PREFIX_FAVORITE: &str = "fav";

/// Whether `id` looks like a generated id with the given prefix.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
