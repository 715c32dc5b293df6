//! Generic record store: create, get, update, delete, and list for every
//! audited entity table, driven by the column schema in `crm_core::schema`.
//!
//! Records travel as [`FieldMap`]s. The `*_as` variants decode into the
//! typed entity structs.

use crm_core::FieldMap;
use crm_core::audit::{FieldName, changed_fields};
use crm_core::entities::Entity;
use crm_core::enums::EntityType;
use crm_core::errors::ValidationError;
use crm_core::schema::{ColumnKind, TableSchema, schema_for};
use crm_core::validation::{
    check_invariants, check_kind, check_required, validate_create, validate_update,
};
use serde_json::Value;

use crate::error::DatabaseError;
use crate::helpers::{json_to_sql, now_timestamp, row_to_record};
use crate::service::CrmService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    /// Case-insensitive substring match on a text column.
    Contains,
}

impl FilterOp {
    const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::IsNull => "IS NULL",
            Self::Contains => "LIKE",
        }
    }
}

/// One column condition. Conditions are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    /// Ignored for [`FilterOp::IsNull`]. `Eq` with `null` matches NULL columns.
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Offset/limit window. A missing limit means the service's default page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub offset: u32,
    pub limit: Option<u32>,
}

/// Filter, sort, and pagination for [`CrmService::list`].
///
/// Without an explicit sort, records come newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub page: Page,
    pub with_total: bool,
}

impl ListQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn filter_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    #[must_use]
    pub fn filter_gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    #[must_use]
    pub fn filter_gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    #[must_use]
    pub fn filter_lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    #[must_use]
    pub fn filter_lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    #[must_use]
    pub fn filter_contains(self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Contains, needle.into())
    }

    #[must_use]
    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(column, FilterOp::IsNull, Value::Null)
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn page(mut self, offset: u32, limit: u32) -> Self {
        self.page = Page {
            offset,
            limit: Some(limit),
        };
        self
    }

    #[must_use]
    pub const fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub records: Vec<T>,
    /// Rows matching the filters across all pages, when requested.
    pub total: Option<u64>,
    pub offset: u32,
    /// Effective limit after clamping.
    pub limit: u32,
}

impl<T> ListPage<T> {
    fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<ListPage<U>, E> {
        Ok(ListPage {
            records: self.records.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        })
    }
}

/// Build a `WHERE` clause for `filters`, numbering parameters from `?1`.
pub(crate) fn build_where(
    schema: &TableSchema,
    filters: &[Filter],
) -> Result<(String, Vec<libsql::Value>), DatabaseError> {
    let entity = schema.entity.as_str();
    let mut clauses = Vec::with_capacity(filters.len());
    let mut params: Vec<libsql::Value> = Vec::new();

    for filter in filters {
        let kind = schema.kind_of(&filter.column).ok_or_else(|| {
            ValidationError::new(entity, format!("unknown column: {}", filter.column))
                .with_fields([filter.column.as_str()])
        })?;
        let column = &filter.column;

        if filter.op == FilterOp::IsNull || (filter.op == FilterOp::Eq && filter.value.is_null()) {
            clauses.push(format!("{column} IS NULL"));
            continue;
        }
        if filter.value.is_null() {
            return Err(ValidationError::new(entity, format!("cannot compare {column} with null"))
                .with_fields([column.as_str()])
                .into());
        }
        if filter.op == FilterOp::Contains {
            let needle = match (kind, filter.value.as_str()) {
                (ColumnKind::Text | ColumnKind::Enum(_), Some(needle)) => needle,
                _ => {
                    return Err(ValidationError::new(
                        entity,
                        format!("{column}: substring match needs a text column and a text value"),
                    )
                    .with_fields([column.as_str()])
                    .into());
                }
            };
            params.push(libsql::Value::Text(format!("%{}%", escape_like(needle))));
            clauses.push(format!("{column} LIKE ?{} ESCAPE '\\'", params.len()));
            continue;
        }
        check_kind(kind, &filter.value).map_err(|reason| {
            ValidationError::new(entity, format!("{column}: {reason}")).with_fields([column.as_str()])
        })?;

        params.push(json_to_sql(kind, &filter.value)?);
        clauses.push(format!("{column} {} ?{}", filter.op.sql(), params.len()));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    Ok((sql, params))
}

/// Escape `LIKE` wildcards so `needle` matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn select_list(schema: &TableSchema) -> String {
    schema.all_columns().collect::<Vec<_>>().join(", ")
}

pub(crate) fn decode<T: Entity>(record: FieldMap) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DatabaseError::InvalidState(format!("cannot decode {}: {e}", T::TYPE)))
}

fn encode<T: Entity>(value: &T) -> Result<FieldMap, DatabaseError> {
    match serde_json::to_value(value).map_err(|e| DatabaseError::Other(e.into()))? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidState(format!(
            "{} did not serialize to an object: {other}",
            T::TYPE
        ))),
    }
}

impl CrmService {
    /// Insert a new record and log its creation.
    ///
    /// Validation happens before any database call. The returned record is
    /// read back from the store, so it carries the generated id, defaults,
    /// and timestamps. Once the insert succeeds the call succeeds.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Validation` for bad input; otherwise the backend error.
    pub async fn create(
        &self,
        actor: &str,
        entity: EntityType,
        fields: FieldMap,
    ) -> Result<FieldMap, DatabaseError> {
        let mut record = validate_create(entity, fields)?;
        let schema = schema_for(entity);

        let id = match schema.id_prefix {
            Some(prefix) => {
                let id = self.db().generate_id(prefix).await?;
                record.insert(schema.primary_key.to_string(), Value::String(id.clone()));
                id
            }
            None => record
                .get(schema.primary_key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ValidationError::new(
                        entity.as_str(),
                        format!("missing required field(s): {}", schema.primary_key),
                    )
                    .with_fields([schema.primary_key])
                })?,
        };

        let now = Value::String(now_timestamp());
        record.insert("created_at".to_string(), now.clone());
        record.insert("updated_at".to_string(), now);

        let columns: Vec<&str> = schema.all_columns().collect();
        let mut params = Vec::with_capacity(columns.len());
        for column in &columns {
            let kind = schema.kind_of(column).unwrap_or(ColumnKind::Text);
            params.push(json_to_sql(kind, record.get(*column).unwrap_or(&Value::Null))?);
        }
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.db()
            .execute_with(&sql, || libsql::params_from_iter(params.clone()))
            .await?;

        for column in &columns {
            record.entry((*column).to_string()).or_insert(Value::Null);
        }
        let created = self.read_back(entity, &id, record).await;
        self.log_mutation(actor, schema.table, &id, FieldName::Creation, None, Some(&created))
            .await;
        tracing::info!(entity = %entity, id = %id, actor, "record created");
        Ok(created)
    }

    /// Re-read a row that was just written, falling back to the record as
    /// written when the read fails. The write has already committed, so the
    /// caller still succeeds and the mutation is still logged.
    async fn read_back(&self, entity: EntityType, id: &str, written: FieldMap) -> FieldMap {
        match self.get(entity, id).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(entity = %entity, id, error = %e, "read-back after write failed");
                written
            }
        }
    }

    /// Fetch one record by primary key.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` when no row has that key.
    pub async fn get(&self, entity: EntityType, id: &str) -> Result<FieldMap, DatabaseError> {
        let schema = schema_for(entity);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            select_list(schema),
            schema.table,
            schema.primary_key
        );
        let mut rows = self.db().query_with(&sql, || [id]).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found(entity.as_str(), id))?;
        row_to_record(schema, &row)
    }

    /// Apply a partial update and log it.
    ///
    /// The merged record must still satisfy the required-field and
    /// folder invariants. The log entry names the single changed column or
    /// `multiple fields`.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Validation` for a bad patch, `NotFound` for a missing
    /// row, otherwise the backend error.
    pub async fn update(
        &self,
        actor: &str,
        entity: EntityType,
        id: &str,
        patch: FieldMap,
    ) -> Result<FieldMap, DatabaseError> {
        let patch = validate_update(entity, patch)?;
        let schema = schema_for(entity);

        let before = self.get(entity, id).await?;
        let mut merged = before.clone();
        for (column, value) in &patch {
            merged.insert(column.clone(), value.clone());
        }
        check_required(entity, &merged)?;
        check_invariants(entity, &merged)?;

        let mut sets = Vec::with_capacity(patch.len() + 1);
        let mut params: Vec<libsql::Value> = Vec::with_capacity(patch.len() + 2);
        for (column, value) in &patch {
            let kind = schema.kind_of(column).unwrap_or(ColumnKind::Text);
            params.push(json_to_sql(kind, value)?);
            sets.push(format!("{column} = ?{}", params.len()));
        }
        let now = now_timestamp();
        params.push(now.clone().into());
        sets.push(format!("updated_at = ?{}", params.len()));
        params.push(id.to_string().into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            schema.table,
            sets.join(", "),
            schema.primary_key,
            params.len()
        );

        let affected = self
            .db()
            .execute_with(&sql, || libsql::params_from_iter(params.clone()))
            .await?;
        if affected == 0 {
            return Err(DatabaseError::not_found(entity.as_str(), id));
        }

        merged.insert("updated_at".to_string(), Value::String(now));
        let after = self.read_back(entity, id, merged).await;
        let changed = changed_fields(&before, &after);
        let submitted: Vec<String> = patch.keys().cloned().collect();
        let field_name = FieldName::for_update(&changed, &submitted);
        tracing::info!(entity = %entity, id, actor, field = %field_name, "record updated");
        self.log_mutation(actor, schema.table, id, field_name, Some(&before), Some(&after))
            .await;
        Ok(after)
    }

    /// Delete a record and log its last state.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing row; a `Conflict`-kind backend error when
    /// other rows still reference it.
    pub async fn delete(&self, actor: &str, entity: EntityType, id: &str) -> Result<(), DatabaseError> {
        let schema = schema_for(entity);
        let before = self.get(entity, id).await?;

        let sql = format!("DELETE FROM {} WHERE {} = ?1", schema.table, schema.primary_key);
        let affected = self.db().execute_with(&sql, || [id]).await?;
        if affected == 0 {
            return Err(DatabaseError::not_found(entity.as_str(), id));
        }

        tracing::info!(entity = %entity, id, actor, "record deleted");
        self.log_mutation(actor, schema.table, id, FieldName::Deletion, Some(&before), None)
            .await;
        Ok(())
    }

    /// List records matching `query`.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Validation` for an unknown column or a filter value
    /// of the wrong kind; otherwise the backend error.
    pub async fn list(
        &self,
        entity: EntityType,
        query: &ListQuery,
    ) -> Result<ListPage<FieldMap>, DatabaseError> {
        let schema = schema_for(entity);
        let (where_sql, params) = build_where(schema, &query.filters)?;

        let order_sql = match &query.order_by {
            Some(order) => {
                if !schema.has_column(&order.column) {
                    return Err(ValidationError::new(
                        entity.as_str(),
                        format!("unknown sort column: {}", order.column),
                    )
                    .with_fields([order.column.as_str()])
                    .into());
                }
                let dir = order.direction.sql();
                format!("{} {dir}, rowid {dir}", order.column)
            }
            None => "created_at DESC, rowid DESC".to_string(),
        };

        let (default_limit, max_limit) = self.page_limits();
        let limit = query.page.limit.unwrap_or(default_limit).clamp(1, max_limit);
        let offset = query.page.offset;

        let sql = format!(
            "SELECT {} FROM {}{where_sql} ORDER BY {order_sql} LIMIT {limit} OFFSET {offset}",
            select_list(schema),
            schema.table,
        );
        tracing::debug!(entity = %entity, %sql, "list");
        let mut rows = self
            .db()
            .query_with(&sql, || libsql::params_from_iter(params.clone()))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(schema, &row)?);
        }

        let total = if query.with_total {
            let count_sql = format!("SELECT COUNT(*) FROM {}{where_sql}", schema.table);
            let mut rows = self
                .db()
                .query_with(&count_sql, || libsql::params_from_iter(params.clone()))
                .await?;
            let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
            let count = row.get::<i64>(0)?;
            Some(u64::try_from(count).map_err(|e| DatabaseError::Other(e.into()))?)
        } else {
            None
        };

        Ok(ListPage {
            records,
            total,
            offset,
            limit,
        })
    }

    /// [`Self::create`] returning a typed entity.
    ///
    /// # Errors
    ///
    /// As [`Self::create`].
    pub async fn create_as<T: Entity>(&self, actor: &str, fields: FieldMap) -> Result<T, DatabaseError> {
        decode(self.create(actor, T::TYPE, fields).await?)
    }

    /// [`Self::get`] returning a typed entity.
    ///
    /// # Errors
    ///
    /// As [`Self::get`].
    pub async fn get_as<T: Entity>(&self, id: &str) -> Result<T, DatabaseError> {
        decode(self.get(T::TYPE, id).await?)
    }

    /// [`Self::update`] returning a typed entity.
    ///
    /// # Errors
    ///
    /// As [`Self::update`].
    pub async fn update_as<T: Entity>(
        &self,
        actor: &str,
        id: &str,
        patch: FieldMap,
    ) -> Result<T, DatabaseError> {
        decode(self.update(actor, T::TYPE, id, patch).await?)
    }

    /// [`Self::list`] returning typed entities.
    ///
    /// # Errors
    ///
    /// As [`Self::list`].
    pub async fn list_as<T: Entity>(&self, query: &ListQuery) -> Result<ListPage<T>, DatabaseError> {
        self.list(T::TYPE, query).await?.try_map(decode)
    }

    /// Write every column of `value` back, logging the columns that changed.
    ///
    /// # Errors
    ///
    /// As [`Self::update`].
    pub async fn save<T: Entity>(&self, actor: &str, value: &T) -> Result<T, DatabaseError> {
        let schema = schema_for(T::TYPE);
        let mut patch = encode(value)?;
        patch.retain(|column, _| schema.column(column).is_some() && column != schema.primary_key);
        self.update_as(actor, value.key(), patch).await
    }
}
