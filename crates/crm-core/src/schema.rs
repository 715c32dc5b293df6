//! Column schema for every entity table.
//!
//! The record store is generic over entity type, so the per-entity rules
//! (which columns exist, which are required, which values an enum column
//! accepts) live here as static tables consumed by [`crate::validation`]
//! and by the SQL layer when it converts values.

use crate::enums::{
    BusinessStatus, DocumentCategory, EntityType, NoteCategory, TaskStatus, UserRole,
};
use crate::ids;

/// Storage kind of a column. Drives both validation and SQL value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as `INTEGER` 0/1, exchanged as a JSON boolean.
    Bool,
    /// Stored as serialized JSON text, exchanged as any JSON value.
    Json,
    /// RFC 3339 date-time string.
    Timestamp,
    /// `YYYY-MM-DD` or an RFC 3339 date-time.
    Date,
    /// Text restricted to a fixed set of values.
    Enum(&'static [&'static str]),
}

/// Literal default applied on create when the caller omits the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Text(&'static str),
    Bool(bool),
}

impl ColumnDefault {
    #[must_use]
    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.to_string()),
            Self::Bool(b) => serde_json::Value::Bool(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    pub default: Option<ColumnDefault>,
}

impl Column {
    const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    const fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// Static description of one entity table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub entity: EntityType,
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Prefix for database-generated ids. `None` when the caller supplies the key.
    pub id_prefix: Option<&'static str>,
    /// Caller-writable columns. Excludes `created_at`/`updated_at` and a
    /// generated primary key.
    pub columns: &'static [Column],
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the primary key is supplied by the caller instead of generated.
    #[must_use]
    pub const fn client_supplied_key(&self) -> bool {
        self.id_prefix.is_none()
    }

    /// Whether `name` is any column of the table, including store-managed ones.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        name == self.primary_key
            || name == "created_at"
            || name == "updated_at"
            || self.column(name).is_some()
    }

    /// Kind of any column, including store-managed ones.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        match name {
            "created_at" | "updated_at" => Some(ColumnKind::Timestamp),
            _ if name == self.primary_key => Some(ColumnKind::Text),
            _ => self.column(name).map(|c| c.kind),
        }
    }

    /// All column names in table order: key, caller columns, timestamps.
    pub fn all_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.primary_key)
            .chain(
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .filter(move |n| *n != self.primary_key),
            )
            .chain(["created_at", "updated_at"])
    }
}

use ColumnKind::{Bool, Date, Integer, Json, Real, Text, Timestamp};

const BUSINESS_COLUMNS: &[Column] = &[
    Column::required("name", Text),
    Column::required("status", ColumnKind::Enum(BusinessStatus::VALUES)),
    Column::optional("description", Text),
    Column::optional("industry", Text),
    Column::optional("address", Text),
    Column::optional("website", Text),
    Column::optional("logo_url", Text),
    Column::optional("num_employees", Integer),
    Column::optional("revenue", Real),
    Column::optional("year_founded", Integer),
    Column::optional("point_of_contact_id", Text),
];

const CONTACT_COLUMNS: &[Column] = &[
    Column::required("name", Text),
    Column::required("business_id", Text),
    Column::optional("title", Text),
    Column::optional("email", Text),
    Column::optional("phone", Text),
    Column::optional("notes", Text),
    Column::optional("is_point_of_contact", Bool).with_default(ColumnDefault::Bool(false)),
    Column::optional("business_card_url", Text),
];

const TASK_COLUMNS: &[Column] = &[
    Column::required("title", Text),
    Column::required("due_date", Date),
    Column::required("business_id", Text),
    Column::optional("status", ColumnKind::Enum(TaskStatus::VALUES))
        .with_default(ColumnDefault::Text("Pending")),
    Column::optional("description", Text),
    Column::optional("assigned_to", Text),
];

const NOTE_COLUMNS: &[Column] = &[
    Column::required("title", Text),
    Column::required("business_id", Text),
    Column::optional("content", Text),
    Column::optional("category", ColumnKind::Enum(NoteCategory::VALUES))
        .with_default(ColumnDefault::Text("General")),
    Column::optional("created_by", Text),
];

const DOCUMENT_COLUMNS: &[Column] = &[
    Column::required("name", Text),
    Column::required("business_id", Text),
    Column::optional("type", Text),
    Column::optional("category", ColumnKind::Enum(DocumentCategory::VALUES)),
    Column::optional("description", Text),
    Column::optional("path", Text).with_default(ColumnDefault::Text("/")),
    Column::optional("storage_reference", Json),
    Column::optional("created_by", Text),
];

const USER_COLUMNS: &[Column] = &[
    Column::required("id", Text),
    Column::required("email", Text),
    Column::optional("full_name", Text),
    Column::optional("role", ColumnKind::Enum(UserRole::VALUES))
        .with_default(ColumnDefault::Text("user")),
    Column::optional("approved", Bool).with_default(ColumnDefault::Bool(false)),
    Column::optional("last_login", Timestamp),
];

const SETTING_COLUMNS: &[Column] = &[
    Column::required("key", Text),
    Column::optional("value", Json),
    Column::optional("updated_by", Text),
];

static BUSINESSES: TableSchema = TableSchema {
    entity: EntityType::Business,
    table: "businesses",
    primary_key: "id",
    id_prefix: Some(ids::PREFIX_BUSINESS),
    columns: BUSINESS_COLUMNS,
};

static CONTACTS: TableSchema = TableSchema {
    entity: EntityType::Contact,
    table: "contacts",
    primary_key: "id",
    id_prefix: Some(ids::PREFIX_CONTACT),
    columns: CONTACT_COLUMNS,
};

static TASKS: TableSchema = TableSchema {
    entity: EntityType::Task,
    table: "tasks",
    primary_key: "id",
    id_prefix: Some(ids::PREFIX_TASK),
    columns: TASK_COLUMNS,
};

static NOTES: TableSchema = TableSchema {
    entity: EntityType::Note,
    table: "notes",
    primary_key: "id",
    id_prefix: Some(ids::PREFIX_NOTE),
    columns: NOTE_COLUMNS,
};

static DOCUMENTS: TableSchema = TableSchema {
    entity: EntityType::Document,
    table: "documents",
    primary_key: "id",
    id_prefix: Some(ids::PREFIX_DOCUMENT),
    columns: DOCUMENT_COLUMNS,
};

static USERS: TableSchema = TableSchema {
    entity: EntityType::User,
    table: "users",
    primary_key: "id",
    id_prefix: None,
    columns: USER_COLUMNS,
};

static SYSTEM_SETTINGS: TableSchema = TableSchema {
    entity: EntityType::SystemSetting,
    table: "system_settings",
    primary_key: "key",
    id_prefix: None,
    columns: SETTING_COLUMNS,
};

/// Schema of the table backing `entity`.
#[must_use]
pub fn schema_for(entity: EntityType) -> &'static TableSchema {
    match entity {
        EntityType::Business => &BUSINESSES,
        EntityType::Contact => &CONTACTS,
        EntityType::Task => &TASKS,
        EntityType::Note => &NOTES,
        EntityType::Document => &DOCUMENTS,
        EntityType::User => &USERS,
        EntityType::SystemSetting => &SYSTEM_SETTINGS,
    }
}
