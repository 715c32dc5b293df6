//! Audit field-name classification and snapshot redaction.
//!
//! Snapshots are whole-record JSON. Any object key containing `secret` or
//! `token` (case-insensitive) has its value replaced by [`REDACTED`] before
//! serialization, at every nesting level.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FieldMap;

/// Replacement written in place of a sensitive value.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_MARKERS: &[&str] = &["secret", "token"];

/// Column excluded when diffing pre- and post-images.
const IGNORED_IN_DIFF: &[&str] = &["updated_at"];

/// The `field_name` recorded for a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldName {
    Creation,
    Deletion,
    MultipleFields,
    Field(String),
}

impl FieldName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creation => "creation",
            Self::Deletion => "deletion",
            Self::MultipleFields => "multiple fields",
            Self::Field(name) => name,
        }
    }

    /// Name an update from the columns that actually changed.
    ///
    /// One changed column names itself; several collapse to
    /// `multiple fields`. When nothing changed the submitted patch decides
    /// the name the same way.
    #[must_use]
    pub fn for_update<S: AsRef<str>>(changed: &[S], submitted: &[S]) -> Self {
        let source = if changed.is_empty() { submitted } else { changed };
        match source {
            [single] => Self::Field(single.as_ref().to_string()),
            _ => Self::MultipleFields,
        }
    }
}

impl From<String> for FieldName {
    fn from(value: String) -> Self {
        match value.as_str() {
            "creation" => Self::Creation,
            "deletion" => Self::Deletion,
            "multiple fields" => Self::MultipleFields,
            _ => Self::Field(value),
        }
    }
}

impl From<FieldName> for String {
    fn from(value: FieldName) -> Self {
        match value {
            FieldName::Field(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a key names a secret.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Copy of `value` with every sensitive key's value replaced.
#[must_use]
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn redact_map(map: &FieldMap) -> FieldMap {
    map.iter()
        .map(|(k, v)| {
            let v = if is_sensitive_key(k) && !v.is_null() {
                Value::String(REDACTED.to_string())
            } else {
                redact(v)
            };
            (k.clone(), v)
        })
        .collect()
}

/// Redact a whole record.
///
/// Beyond key-based redaction, a key/value row whose `key` names a secret
/// (a settings row such as `dropbox_token`) has its `value` redacted too.
#[must_use]
pub fn redact_record(record: &FieldMap) -> FieldMap {
    let mut out = redact_map(record);
    let secret_row = record
        .get("key")
        .and_then(Value::as_str)
        .is_some_and(is_sensitive_key);
    if secret_row {
        if let Some(value) = out.get_mut("value") {
            if !value.is_null() {
                *value = Value::String(REDACTED.to_string());
            }
        }
    }
    out
}

/// Serialized, redacted snapshot of a record.
#[must_use]
pub fn snapshot(record: &FieldMap) -> String {
    Value::Object(redact_record(record)).to_string()
}

/// Columns whose values differ between two images of the same record.
#[must_use]
pub fn changed_fields(before: &FieldMap, after: &FieldMap) -> Vec<String> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter()
        .filter(|k| !IGNORED_IN_DIFF.contains(&k.as_str()))
        .filter(|k| before.get(*k).unwrap_or(&Value::Null) != after.get(*k).unwrap_or(&Value::Null))
        .cloned()
        .collect()
}
