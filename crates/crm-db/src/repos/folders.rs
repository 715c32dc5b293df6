//! Virtual folder listing over the flat `documents` table.

use crm_core::documents::{DocumentEntry, build_listing};
use crm_core::entities::Document;
use crm_core::enums::EntityType;
use crm_core::paths::normalize_path;
use crm_core::schema::schema_for;

use crate::error::DatabaseError;
use crate::helpers::row_to_record;
use crate::service::CrmService;

impl CrmService {
    /// List the virtual directory `path`, optionally within one business.
    ///
    /// Returns the rows stored at `path` plus one folder entry per distinct
    /// next segment of any deeper path. Folders come before files.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails. Rows that do not decode as a
    /// [`Document`] are left out of the listing.
    pub async fn list_folder(
        &self,
        business_id: Option<&str>,
        path: &str,
    ) -> Result<Vec<DocumentEntry>, DatabaseError> {
        let current = normalize_path(path);
        let schema = schema_for(EntityType::Document);
        let columns = schema.all_columns().collect::<Vec<_>>().join(", ");

        let mut params: Vec<libsql::Value> = vec![current.clone().into()];
        let business_clause = business_id.map_or_else(String::new, |id| {
            params.push(id.to_string().into());
            " AND business_id = ?2".to_string()
        });

        let mut rows = self
            .db()
            .query_with(
                &format!("SELECT {columns} FROM documents WHERE path = ?1{business_clause}"),
                || libsql::params_from_iter(params.clone()),
            )
            .await?;
        let mut here = Vec::new();
        while let Some(row) = rows.next().await? {
            let record = row_to_record(schema, &row)?;
            let id = record.get("id").cloned().unwrap_or_default();
            match serde_json::from_value::<Document>(serde_json::Value::Object(record)) {
                Ok(doc) => here.push(doc),
                Err(e) => tracing::warn!(%id, path = %current, error = %e, "skipping undecodable document"),
            }
        }

        let mut rows = self
            .db()
            .query_with(
                &format!(
                    "SELECT DISTINCT path FROM documents
                     WHERE substr(path, 1, length(?1)) = ?1 AND path != ?1{business_clause}"
                ),
                || libsql::params_from_iter(params.clone()),
            )
            .await?;
        let mut deeper = Vec::new();
        while let Some(row) = rows.next().await? {
            deeper.push(row.get::<String>(0)?);
        }

        tracing::debug!(
            path = %current,
            business_id,
            rows = here.len(),
            deeper = deeper.len(),
            "list folder"
        );
        Ok(build_listing(&current, here, deeper))
    }
}

#[cfg(test)]
mod tests {
    use crm_core::documents::FolderSource;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_support::helpers::{ACTOR, fields, seed_business, test_service};

    async fn add_row(svc: &CrmService, business_id: &str, name: &str, path: &str, kind: &str) -> String {
        let created = svc
            .create(
                ACTOR,
                EntityType::Document,
                fields(json!({"name": name, "business_id": business_id, "path": path, "type": kind})),
            )
            .await
            .unwrap();
        created["id"].as_str().unwrap().to_string()
    }

    fn names(entries: &[DocumentEntry]) -> Vec<&str> {
        entries.iter().map(DocumentEntry::name).collect()
    }

    #[tokio::test]
    async fn synthesizes_each_folder_once() {
        let svc = test_service().await;
        let biz = seed_business(&svc, "Acme").await;
        add_row(&svc, &biz, "root.pdf", "/", "pdf").await;
        add_row(&svc, &biz, "a.pdf", "/a/", "pdf").await;
        add_row(&svc, &biz, "x.pdf", "/a/b/", "pdf").await;
        add_row(&svc, &biz, "x2.pdf", "/a/b/", "pdf").await;
        add_row(&svc, &biz, "y.pdf", "/a/c/", "pdf").await;

        let listing = svc.list_folder(Some(&biz), "/a/").await.unwrap();
        assert_eq!(names(&listing), vec!["b", "c", "a.pdf"]);
        assert!(listing[0].as_folder().unwrap().is_synthesized());
        assert_eq!(listing[1].as_folder().unwrap().path, "/a/c/");

        let root = svc.list_folder(Some(&biz), "").await.unwrap();
        assert_eq!(names(&root), vec!["a", "root.pdf"]);
    }

    #[tokio::test]
    async fn explicit_folder_wins_over_synthesized() {
        let svc = test_service().await;
        let biz = seed_business(&svc, "Acme").await;
        let folder_id = add_row(&svc, &biz, "b", "/a/", "folder").await;
        add_row(&svc, &biz, "x.pdf", "/a/b/", "pdf").await;

        let listing = svc.list_folder(Some(&biz), "/a").await.unwrap();
        assert_eq!(listing.len(), 1);
        let folder = listing[0].as_folder().unwrap();
        assert_eq!(
            folder.source,
            FolderSource::Explicit {
                id: folder_id,
                business_id: biz.clone(),
            }
        );
        assert_eq!(folder.path, "/a/b/");
    }

    #[tokio::test]
    async fn business_filter_scopes_rows_and_folders() {
        let svc = test_service().await;
        let acme = seed_business(&svc, "Acme").await;
        let globex = seed_business(&svc, "Globex").await;
        add_row(&svc, &acme, "a.pdf", "/contracts/", "pdf").await;
        add_row(&svc, &globex, "g.pdf", "/reports/", "pdf").await;
        add_row(&svc, &globex, "top.pdf", "/", "pdf").await;

        let acme_root = svc.list_folder(Some(&acme), "/").await.unwrap();
        assert_eq!(names(&acme_root), vec!["contracts"]);

        let everything = svc.list_folder(None, "/").await.unwrap();
        assert_eq!(names(&everything), vec!["contracts", "reports", "top.pdf"]);
    }

    #[tokio::test]
    async fn unscoped_listing_keeps_each_business_folder() {
        let svc = test_service().await;
        let acme = seed_business(&svc, "Acme").await;
        let globex = seed_business(&svc, "Globex").await;
        let acme_folder = add_row(&svc, &acme, "Contracts", "/", "folder").await;
        let globex_folder = add_row(&svc, &globex, "Contracts", "/", "folder").await;
        add_row(&svc, &globex, "signed.pdf", "/Contracts/", "pdf").await;

        let listing = svc.list_folder(None, "/").await.unwrap();
        let mut ids: Vec<String> = listing
            .iter()
            .filter_map(DocumentEntry::as_folder)
            .map(|f| match &f.source {
                FolderSource::Explicit { id, .. } => id.clone(),
                FolderSource::Synthesized => panic!("unexpected synthesized folder {f:?}"),
            })
            .collect();
        ids.sort();
        let mut expected = vec![acme_folder, globex_folder];
        expected.sort();
        assert_eq!(ids, expected);

        let scoped = svc.list_folder(Some(&acme), "/").await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].as_folder().unwrap().business_id(), Some(acme.as_str()));
    }

    #[tokio::test]
    async fn undecodable_rows_are_left_out() {
        let svc = test_service().await;
        let biz = seed_business(&svc, "Acme").await;
        add_row(&svc, &biz, "ok.pdf", "/", "pdf").await;
        svc.db()
            .execute_with(
                "INSERT INTO documents
                     (id, name, business_id, type, path, storage_reference, created_at, updated_at)
                 VALUES ('doc-legacy', 'legacy.pdf', ?1, 'pdf', '/', '\"https://dropbox/legacy\"',
                         '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
                || [biz.as_str()],
            )
            .await
            .unwrap();

        let listing = svc.list_folder(Some(&biz), "/").await.unwrap();
        assert_eq!(names(&listing), vec!["ok.pdf"]);

        svc.delete_document(ACTOR, "doc-legacy").await.unwrap();
        assert!(svc.get(EntityType::Document, "doc-legacy").await.is_err());
    }

    #[tokio::test]
    async fn empty_directory_lists_nothing() {
        let svc = test_service().await;
        let biz = seed_business(&svc, "Acme").await;
        assert!(svc.list_folder(Some(&biz), "/nowhere/").await.unwrap().is_empty());
    }
}
