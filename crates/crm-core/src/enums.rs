//! Entity types, roles, statuses, and categories for the CRM core.
//!
//! Statuses and categories serialize to the display strings stored in the
//! database (`"Researching"`, `"In Progress"`, ...). Each enum exposes a
//! `VALUES` table that the column schema uses for validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every stored string form, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($text),+];

            /// Return the string representation used in SQL storage.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(CoreError::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

string_enum! {
    /// Every entity type that flows through the record store.
    ///
    /// The serialized form is the entity name callers pass to the store
    /// (`"business"`, `"contact"`, ...); [`EntityType::table_name`] maps it to
    /// the backing table.
    EntityType {
        Business => "business",
        Contact => "contact",
        Task => "task",
        Note => "note",
        Document => "document",
        User => "user",
        SystemSetting => "setting",
    }
}

impl EntityType {
    /// All entity types in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Business,
        Self::Contact,
        Self::Task,
        Self::Note,
        Self::Document,
        Self::User,
        Self::SystemSetting,
    ];

    /// Backing table name. This is also the `table_name` recorded in the audit log.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Business => "businesses",
            Self::Contact => "contacts",
            Self::Task => "tasks",
            Self::Note => "notes",
            Self::Document => "documents",
            Self::User => "users",
            Self::SystemSetting => "system_settings",
        }
    }

    /// Resolve an entity type from its table name.
    #[must_use]
    pub fn from_table_name(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.table_name() == table)
    }
}

// ---------------------------------------------------------------------------
// UserRole
// ---------------------------------------------------------------------------

string_enum! {
    /// Role assigned to a user by an administrator.
    UserRole {
        User => "user",
        Admin => "admin",
    }
}

// ---------------------------------------------------------------------------
// BusinessStatus
// ---------------------------------------------------------------------------

string_enum! {
    /// Relationship stage of a tracked business.
    BusinessStatus {
        Researching => "Researching",
        Contacting => "Contacting",
        Negotiating => "Negotiating",
        Partner => "Partner",
        Inactive => "Inactive",
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

string_enum! {
    /// Progress of a follow-up task.
    TaskStatus {
        Pending => "Pending",
        InProgress => "In Progress",
        Completed => "Completed",
    }
}

// ---------------------------------------------------------------------------
// NoteCategory
// ---------------------------------------------------------------------------

string_enum! {
    NoteCategory {
        General => "General",
        Meeting => "Meeting",
        Call => "Call",
        Email => "Email",
        Task => "Task",
        Idea => "Idea",
        Issue => "Issue",
        Other => "Other",
    }
}

// ---------------------------------------------------------------------------
// DocumentCategory
// ---------------------------------------------------------------------------

string_enum! {
    DocumentCategory {
        Contract => "Contract",
        Agreement => "Agreement",
        Proposal => "Proposal",
        Report => "Report",
        Presentation => "Presentation",
        Financial => "Financial",
        Legal => "Legal",
        Other => "Other",
    }
}
