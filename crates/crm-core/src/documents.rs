//! Document listing types and the virtual folder view.
//!
//! Documents are stored flat, each with the directory `path` it lives in.
//! [`build_listing`] turns the rows at one directory plus the set of all
//! document paths into the hierarchical view the document browser shows,
//! synthesizing folders that have no row of their own.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entities::Document;
use crate::paths::{child_path, next_segment, normalize_path};

/// Opaque pointer from a document row into the object-storage provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageReference {
    /// Adapter that holds the object (`"bucket"`, ...).
    pub provider: String,
    /// Provider-assigned identifier, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Full provider-side path of the object.
    pub provider_path: String,
    /// Shareable link handed to users.
    pub shared_url: String,
}

/// Where a folder entry came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FolderSource {
    /// Derived from deeper document paths; there is no row to edit or delete.
    Synthesized,
    /// Backed by a `type = folder` document row of one business.
    Explicit { id: String, business_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    /// Directory path this folder opens (`parent + name + "/"`).
    pub path: String,
    #[serde(flatten)]
    pub source: FolderSource,
}

impl FolderEntry {
    #[must_use]
    pub const fn is_synthesized(&self) -> bool {
        matches!(self.source, FolderSource::Synthesized)
    }

    /// Owning business of an explicit folder.
    #[must_use]
    pub fn business_id(&self) -> Option<&str> {
        match &self.source {
            FolderSource::Explicit { business_id, .. } => Some(business_id),
            FolderSource::Synthesized => None,
        }
    }
}

/// One item in a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum DocumentEntry {
    File(Document),
    Folder(FolderEntry),
}

impl DocumentEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File(doc) => &doc.name,
            Self::Folder(folder) => &folder.name,
        }
    }

    #[must_use]
    pub const fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    #[must_use]
    pub const fn as_folder(&self) -> Option<&FolderEntry> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::File(_) => None,
        }
    }

    #[must_use]
    pub const fn as_file(&self) -> Option<&Document> {
        match self {
            Self::File(doc) => Some(doc),
            Self::Folder(_) => None,
        }
    }
}

/// Build the listing of directory `current`.
///
/// `rows` are the documents whose `path` equals `current`; folder rows among
/// them become explicit folders, one per business and name. Every path in
/// `all_paths` strictly below `current` contributes a synthesized folder for
/// its next segment unless an explicit folder already opens that path.
/// Folders come first, then files, each group ordered by name.
pub fn build_listing<I, S>(current: &str, rows: Vec<Document>, all_paths: I) -> Vec<DocumentEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let current = normalize_path(current);
    let mut folders: Vec<FolderEntry> = Vec::new();
    let mut files = Vec::new();

    let mut explicit: BTreeSet<(String, String)> = BTreeSet::new();
    for doc in rows {
        if !doc.is_folder() {
            files.push(doc);
            continue;
        }
        let path = child_path(&current, &doc.name);
        if explicit.insert((path.clone(), doc.business_id.clone())) {
            folders.push(FolderEntry {
                name: doc.name,
                path,
                source: FolderSource::Explicit {
                    id: doc.id,
                    business_id: doc.business_id,
                },
            });
        }
    }

    let opened: BTreeSet<String> = explicit.into_iter().map(|(path, _)| path).collect();
    let mut synthesized: BTreeSet<String> = BTreeSet::new();
    for stored in all_paths {
        let stored = normalize_path(stored.as_ref());
        let Some(segment) = next_segment(&current, &stored) else {
            continue;
        };
        let path = child_path(&current, segment);
        if !opened.contains(&path) && synthesized.insert(path.clone()) {
            folders.push(FolderEntry {
                name: segment.to_string(),
                path,
                source: FolderSource::Synthesized,
            });
        }
    }

    folders.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.business_id().cmp(&b.business_id()))
    });
    files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    folders
        .into_iter()
        .map(DocumentEntry::Folder)
        .chain(files.into_iter().map(DocumentEntry::File))
        .collect()
}
