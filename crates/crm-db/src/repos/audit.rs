//! Change-log repository.
//!
//! Append-only entries pairing every successful mutation with redacted
//! before/after snapshots. Supports the admin log screen's filters and a
//! per-record history.

use chrono::{DateTime, Utc};
use crm_core::FieldMap;
use crm_core::audit::{FieldName, snapshot};
use crm_core::entities::AuditLogEntry;
use crm_core::ids::PREFIX_AUDIT;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_opt_string, now_timestamp, parse_datetime};
use crate::report::Incident;
use crate::service::CrmService;

const SELECT_COLS: &str =
    "id, table_name, record_id, field_name, old_value, new_value, changed_by, changed_at";

const DEFAULT_LIMIT: u32 = 50;

/// Filter criteria for the change log. Empty filters match everything.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub changed_by: Option<String>,
    /// Inclusive lower bound on `changed_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `changed_at`.
    pub to: Option<DateTime<Utc>>,
    pub offset: u32,
    pub limit: Option<u32>,
}

/// A page of change-log entries, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub total: u64,
}

fn row_to_entry(row: &libsql::Row) -> Result<AuditLogEntry, DatabaseError> {
    Ok(AuditLogEntry {
        id: row.get::<String>(0)?,
        table_name: row.get::<String>(1)?,
        record_id: row.get::<String>(2)?,
        field_name: FieldName::from(row.get::<String>(3)?),
        old_value: get_opt_string(row, 4)?,
        new_value: get_opt_string(row, 5)?,
        changed_by: row.get::<String>(6)?,
        changed_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl CrmService {
    /// Append one change-log entry.
    ///
    /// `old`/`new` are whole-record images; secrets are redacted before
    /// they are serialized.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn record_audit(
        &self,
        table_name: &str,
        record_id: &str,
        field_name: FieldName,
        old: Option<&FieldMap>,
        new: Option<&FieldMap>,
        actor: &str,
    ) -> Result<AuditLogEntry, DatabaseError> {
        let id = self.db().generate_id(PREFIX_AUDIT).await?;
        let changed_at = now_timestamp();
        let old_value = old.map(snapshot);
        let new_value = new.map(snapshot);

        self.db()
            .execute_with(
                &format!("INSERT INTO change_logs ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                || {
                    libsql::params![
                        id.as_str(),
                        table_name,
                        record_id,
                        field_name.as_str(),
                        old_value.as_deref(),
                        new_value.as_deref(),
                        actor,
                        changed_at.as_str()
                    ]
                },
            )
            .await?;

        Ok(AuditLogEntry {
            id,
            table_name: table_name.to_string(),
            record_id: record_id.to_string(),
            field_name,
            old_value,
            new_value,
            changed_by: actor.to_string(),
            changed_at: parse_datetime(&changed_at)?,
        })
    }

    /// Log a committed mutation. A failed write is reported, not returned.
    pub(crate) async fn log_mutation(
        &self,
        actor: &str,
        table_name: &str,
        record_id: &str,
        field_name: FieldName,
        old: Option<&FieldMap>,
        new: Option<&FieldMap>,
    ) -> Option<AuditLogEntry> {
        let label = field_name.as_str().to_string();
        match self
            .record_audit(table_name, record_id, field_name, old, new, actor)
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                self.reporter().report(&Incident::AuditWriteFailed {
                    table_name: table_name.to_string(),
                    record_id: record_id.to_string(),
                    field_name: label,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Query the change log, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref table) = filter.table_name {
            params.push(libsql::Value::Text(table.clone()));
            conditions.push(format!("table_name = ?{}", params.len()));
        }
        if let Some(ref record_id) = filter.record_id {
            params.push(libsql::Value::Text(record_id.clone()));
            conditions.push(format!("record_id = ?{}", params.len()));
        }
        if let Some(ref actor) = filter.changed_by {
            params.push(libsql::Value::Text(actor.clone()));
            conditions.push(format!("changed_by = ?{}", params.len()));
        }
        if let Some(from) = filter.from {
            params.push(libsql::Value::Text(format_timestamp(from)));
            conditions.push(format!("changed_at >= ?{}", params.len()));
        }
        if let Some(to) = filter.to {
            params.push(libsql::Value::Text(format_timestamp(to)));
            conditions.push(format!("changed_at < ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let (_, max_limit) = self.page_limits();
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, max_limit);
        let offset = filter.offset;
        let sql = format!(
            "SELECT {SELECT_COLS} FROM change_logs {where_clause}
             ORDER BY changed_at DESC, rowid DESC LIMIT {limit} OFFSET {offset}"
        );

        let mut rows = self
            .db()
            .query_with(&sql, || libsql::params_from_iter(params.clone()))
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }

        let mut rows = self
            .db()
            .query_with(
                &format!("SELECT COUNT(*) FROM change_logs {where_clause}"),
                || libsql::params_from_iter(params.clone()),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        let total = u64::try_from(row.get::<i64>(0)?).map_err(|e| DatabaseError::Other(e.into()))?;

        Ok(AuditPage { entries, total })
    }

    /// Every entry for one record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn history(
        &self,
        table_name: &str,
        record_id: &str,
    ) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let mut rows = self
            .db()
            .query_with(
                &format!(
                    "SELECT {SELECT_COLS} FROM change_logs
                     WHERE table_name = ?1 AND record_id = ?2
                     ORDER BY changed_at ASC, rowid ASC"
                ),
                || libsql::params![table_name, record_id],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }
}
