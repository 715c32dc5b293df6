//! Required-field and type validation for record-store writes.
//!
//! Everything here is pure: a write that fails validation never reaches the
//! database, and therefore never produces an audit entry.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::FieldMap;
use crate::documents::StorageReference;
use crate::enums::EntityType;
use crate::errors::ValidationError;
use crate::paths::normalize_path;
use crate::schema::{ColumnKind, TableSchema, schema_for};

/// Column names the store manages itself.
pub const MANAGED_COLUMNS: &[&str] = &["created_at", "updated_at"];

/// Document `type` value marking a folder row.
pub const FOLDER_TYPE: &str = "folder";

/// Validate the fields of a new record and fill in column defaults.
///
/// Rejects unknown and store-managed columns, missing required columns,
/// values of the wrong kind, and out-of-set enum values. Document paths are
/// normalized.
pub fn validate_create(entity: EntityType, mut fields: FieldMap) -> Result<FieldMap, ValidationError> {
    let schema = schema_for(entity);
    check_columns(schema, &fields, true)?;

    for column in schema.columns {
        if let Some(default) = column.default {
            let missing = fields.get(column.name).is_none_or(Value::is_null);
            if missing {
                fields.insert(column.name.to_string(), default.to_json());
            }
        }
    }

    normalize(schema, &mut fields);
    check_kinds(schema, &fields)?;
    check_required(entity, &fields)?;
    check_invariants(entity, &fields)?;
    Ok(fields)
}

/// Validate a partial update.
///
/// The patch may not be empty, may not touch the primary key, and may not
/// clear a required column. The merged record is re-checked by the store
/// with [`check_required`] and [`check_invariants`].
pub fn validate_update(entity: EntityType, mut fields: FieldMap) -> Result<FieldMap, ValidationError> {
    let schema = schema_for(entity);
    if fields.is_empty() {
        return Err(ValidationError::new(entity.as_str(), "no fields to update"));
    }
    if fields.contains_key(schema.primary_key) {
        return Err(ValidationError::new(
            entity.as_str(),
            format!("{} cannot be changed", schema.primary_key),
        )
        .with_fields([schema.primary_key]));
    }
    check_columns(schema, &fields, false)?;
    normalize(schema, &mut fields);
    check_kinds(schema, &fields)?;

    let cleared: Vec<&str> = schema
        .columns
        .iter()
        .filter(|c| c.required)
        .filter(|c| fields.get(c.name).is_some_and(is_blank))
        .map(|c| c.name)
        .collect();
    if !cleared.is_empty() {
        return Err(ValidationError::new(
            entity.as_str(),
            format!("required field(s) cannot be cleared: {}", cleared.join(", ")),
        )
        .with_fields(cleared));
    }
    Ok(fields)
}

/// Fail when any required column of `entity` is missing, null, or blank.
pub fn check_required(entity: EntityType, record: &FieldMap) -> Result<(), ValidationError> {
    let missing: Vec<&str> = schema_for(entity)
        .columns
        .iter()
        .filter(|c| c.required)
        .filter(|c| record.get(c.name).is_none_or(is_blank))
        .map(|c| c.name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            entity.as_str(),
            format!("missing required field(s): {}", missing.join(", ")),
        )
        .with_fields(missing))
    }
}

/// Cross-field rules on a complete record.
///
/// A document whose `type` is `folder` carries no storage reference, and any
/// reference a file carries must decode as a [`StorageReference`].
pub fn check_invariants(entity: EntityType, record: &FieldMap) -> Result<(), ValidationError> {
    if entity != EntityType::Document {
        return Ok(());
    }
    let is_folder = record.get("type").and_then(Value::as_str) == Some(FOLDER_TYPE);
    let Some(reference) = record.get("storage_reference").filter(|v| !v.is_null()) else {
        return Ok(());
    };
    if is_folder {
        return Err(ValidationError::new(
            entity.as_str(),
            "a folder cannot carry a storage reference",
        )
        .with_fields(["storage_reference"]));
    }
    match serde_json::from_value::<StorageReference>(reference.clone()) {
        Ok(_) => Ok(()),
        Err(e) => Err(ValidationError::new(
            entity.as_str(),
            format!("storage_reference: not a storage reference ({e})"),
        )
        .with_fields(["storage_reference"])),
    }
}

fn check_columns(schema: &TableSchema, fields: &FieldMap, creating: bool) -> Result<(), ValidationError> {
    let entity = schema.entity.as_str();

    let managed: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|k| {
            MANAGED_COLUMNS.contains(k)
                || (creating && *k == schema.primary_key && !schema.client_supplied_key())
        })
        .collect();
    if !managed.is_empty() {
        return Err(ValidationError::new(
            entity,
            format!("field(s) managed by the store: {}", managed.join(", ")),
        )
        .with_fields(managed));
    }

    let unknown: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|k| schema.column(k).is_none() && *k != schema.primary_key)
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::new(
            entity,
            format!("unknown field(s): {}", unknown.join(", ")),
        )
        .with_fields(unknown));
    }
    Ok(())
}

fn check_kinds(schema: &TableSchema, fields: &FieldMap) -> Result<(), ValidationError> {
    for (name, value) in fields {
        if value.is_null() {
            continue;
        }
        let Some(kind) = schema.kind_of(name) else {
            continue;
        };
        if let Err(reason) = check_kind(kind, value) {
            return Err(ValidationError::new(
                schema.entity.as_str(),
                format!("{name}: {reason}"),
            )
            .with_fields([name.as_str()]));
        }
    }
    Ok(())
}

/// Check that a non-null `value` fits `kind`.
pub fn check_kind(kind: ColumnKind, value: &Value) -> Result<(), String> {
    match kind {
        ColumnKind::Text => value
            .as_str()
            .map(|_| ())
            .ok_or_else(|| format!("expected text, got {value}")),
        ColumnKind::Integer => value
            .as_i64()
            .map(|_| ())
            .ok_or_else(|| format!("expected an integer, got {value}")),
        ColumnKind::Real => value
            .as_f64()
            .map(|_| ())
            .ok_or_else(|| format!("expected a number, got {value}")),
        ColumnKind::Bool => value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| format!("expected true or false, got {value}")),
        ColumnKind::Json => Ok(()),
        ColumnKind::Timestamp => match value.as_str() {
            Some(s) if is_timestamp(s) => Ok(()),
            _ => Err(format!("expected an RFC 3339 timestamp, got {value}")),
        },
        ColumnKind::Date => match value.as_str() {
            Some(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || is_timestamp(s) => Ok(()),
            _ => Err(format!("expected a YYYY-MM-DD date, got {value}")),
        },
        ColumnKind::Enum(values) => match value.as_str() {
            Some(s) if values.contains(&s) => Ok(()),
            _ => Err(format!("expected one of {}, got {value}", values.join(", "))),
        },
    }
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn normalize(schema: &TableSchema, fields: &mut FieldMap) {
    for (name, value) in fields.iter_mut() {
        if schema.kind_of(name) != Some(ColumnKind::Date) {
            continue;
        }
        if let Value::String(s) = value {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                *s = ts.date_naive().format("%Y-%m-%d").to_string();
            }
        }
    }
    if schema.entity != EntityType::Document {
        return;
    }
    if let Some(path) = fields.get_mut("path") {
        match path {
            Value::String(s) => *s = normalize_path(s),
            Value::Null => *path = Value::String(normalize_path("")),
            _ => {}
        }
    }
}
