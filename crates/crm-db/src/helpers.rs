//! Conversion between JSON field maps and libSQL values.
//!
//! The record store exchanges records as JSON objects; each column's
//! [`ColumnKind`] decides how a value is written and read back. Timestamps
//! are written in one fixed-width RFC 3339 form so they sort as text.

use chrono::{DateTime, SecondsFormat, Utc};
use crm_core::FieldMap;
use crm_core::schema::{ColumnKind, TableSchema};
use libsql::Value as SqlValue;
use serde_json::Value;

use crate::error::DatabaseError;

/// Parse a TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Storage form of a timestamp: RFC 3339, microseconds, `Z` suffix.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in storage form.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Convert a validated JSON value into the SQL value for a column of `kind`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` when the value does not fit the column.
pub fn json_to_sql(kind: ColumnKind, value: &Value) -> Result<SqlValue, DatabaseError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    let mismatch = || DatabaseError::Query(format!("value {value} does not fit a {kind:?} column"));
    Ok(match kind {
        ColumnKind::Text | ColumnKind::Date | ColumnKind::Enum(_) => {
            SqlValue::Text(value.as_str().ok_or_else(mismatch)?.to_string())
        }
        ColumnKind::Timestamp => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            SqlValue::Text(format_timestamp(parse_datetime(raw)?))
        }
        ColumnKind::Integer => SqlValue::Integer(value.as_i64().ok_or_else(mismatch)?),
        ColumnKind::Real => SqlValue::Real(value.as_f64().ok_or_else(mismatch)?),
        ColumnKind::Bool => SqlValue::Integer(i64::from(value.as_bool().ok_or_else(mismatch)?)),
        ColumnKind::Json => SqlValue::Text(value.to_string()),
    })
}

/// Convert a SQL value read from a column of `kind` back into JSON.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for stored values that cannot be decoded.
pub fn sql_to_json(kind: ColumnKind, value: SqlValue) -> Result<Value, DatabaseError> {
    Ok(match (kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnKind::Bool, SqlValue::Integer(i)) => Value::Bool(i != 0),
        (ColumnKind::Json, SqlValue::Text(s)) => {
            if s.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&s)
                    .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?
            }
        }
        (ColumnKind::Timestamp, SqlValue::Text(s)) => {
            Value::String(format_timestamp(parse_datetime(&s)?))
        }
        (_, SqlValue::Text(s)) => Value::String(s),
        (_, SqlValue::Integer(i)) => Value::from(i),
        (_, SqlValue::Real(f)) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        (_, SqlValue::Blob(_)) => {
            return Err(DatabaseError::Query(format!(
                "unexpected BLOB in a {kind:?} column"
            )));
        }
    })
}

/// Read a row selected with `schema.all_columns()` into a field map.
///
/// # Errors
///
/// Returns `DatabaseError` if a column cannot be read or decoded.
pub fn row_to_record(schema: &TableSchema, row: &libsql::Row) -> Result<FieldMap, DatabaseError> {
    let mut record = FieldMap::new();
    for (idx, name) in schema.all_columns().enumerate() {
        let kind = schema.kind_of(name).unwrap_or(ColumnKind::Text);
        let idx = i32::try_from(idx).map_err(|e| DatabaseError::Other(e.into()))?;
        let value = sql_to_json(kind, row.get_value(idx)?)?;
        record.insert(name.to_string(), value);
    }
    Ok(record)
}

/// Unwrap a JSON object into a field map. Anything else yields an empty map.
#[must_use]
pub fn object(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = format_timestamp(parse_datetime("2024-05-01T10:00:00Z").unwrap());
        let b = format_timestamp(parse_datetime("2024-05-01T10:00:00.5+00:00").unwrap());
        assert_eq!(a, "2024-05-01T10:00:00.000000Z");
        assert_eq!(b, "2024-05-01T10:00:00.500000Z");
        assert!(a < b);
    }

    #[test]
    fn sqlite_default_datetime_parses() {
        let dt = parse_datetime("2024-05-01 10:00:00").unwrap();
        assert_eq!(format_timestamp(dt), "2024-05-01T10:00:00.000000Z");
    }

    #[test]
    fn bool_and_json_columns() {
        assert_eq!(
            json_to_sql(ColumnKind::Bool, &json!(true)).unwrap(),
            SqlValue::Integer(1)
        );
        assert_eq!(
            sql_to_json(ColumnKind::Bool, SqlValue::Integer(0)).unwrap(),
            json!(false)
        );

        let blob = json!({"provider": "bucket", "provider_path": "/crm/a.pdf"});
        let SqlValue::Text(text) = json_to_sql(ColumnKind::Json, &blob).unwrap() else {
            panic!("expected text");
        };
        assert_eq!(sql_to_json(ColumnKind::Json, SqlValue::Text(text)).unwrap(), blob);
    }

    #[test]
    fn mismatched_value_is_rejected() {
        assert!(json_to_sql(ColumnKind::Integer, &json!("ten")).is_err());
        assert_eq!(
            json_to_sql(ColumnKind::Text, &Value::Null).unwrap(),
            SqlValue::Null
        );
    }
}
