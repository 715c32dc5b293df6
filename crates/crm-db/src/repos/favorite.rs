//! User favorites: a join table of bookmarked businesses. Not audited.

use crm_core::entities::Favorite;
use crm_core::ids::PREFIX_FAVORITE;

use crate::error::DatabaseError;
use crate::helpers::{now_timestamp, parse_datetime};
use crate::service::CrmService;

fn row_to_favorite(row: &libsql::Row) -> Result<Favorite, DatabaseError> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        business_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
    })
}

impl CrmService {
    /// Bookmark a business for a user. Adding an existing favorite returns it unchanged.
    ///
    /// # Errors
    ///
    /// A `Conflict`-kind error when the user or business does not exist.
    pub async fn add_favorite(&self, user_id: &str, business_id: &str) -> Result<Favorite, DatabaseError> {
        let id = self.db().generate_id(PREFIX_FAVORITE).await?;
        let now = now_timestamp();
        self.db()
            .execute_with(
                "INSERT INTO user_favorites (id, user_id, business_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, business_id) DO NOTHING",
                || libsql::params![id.as_str(), user_id, business_id, now.as_str()],
            )
            .await?;

        let mut rows = self
            .db()
            .query_with(
                "SELECT id, user_id, business_id, created_at FROM user_favorites
                 WHERE user_id = ?1 AND business_id = ?2",
                || libsql::params![user_id, business_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_favorite(&row)
    }

    /// Remove a bookmark. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the DELETE fails.
    pub async fn remove_favorite(&self, user_id: &str, business_id: &str) -> Result<bool, DatabaseError> {
        let affected = self
            .db()
            .execute_with(
                "DELETE FROM user_favorites WHERE user_id = ?1 AND business_id = ?2",
                || libsql::params![user_id, business_id],
            )
            .await?;
        Ok(affected > 0)
    }

    /// A user's favorites, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, DatabaseError> {
        let mut rows = self
            .db()
            .query_with(
                "SELECT id, user_id, business_id, created_at FROM user_favorites
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                || [user_id],
            )
            .await?;
        let mut favorites = Vec::new();
        while let Some(row) = rows.next().await? {
            favorites.push(row_to_favorite(&row)?);
        }
        Ok(favorites)
    }
}

#[cfg(test)]
mod tests {
    use crm_core::enums::EntityType;
    use crm_core::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::repos::audit::AuditFilter;
    use crate::test_support::helpers::{ACTOR, seed_business, test_service};

    #[tokio::test]
    async fn add_is_idempotent_and_unaudited() {
        let svc = test_service().await;
        svc.register_user(ACTOR, "usr-ada", "ada@example.com", None).await.unwrap();
        let biz = seed_business(&svc, "Acme").await;
        let logged = svc.query_audit(&AuditFilter::default()).await.unwrap().total;

        let first = svc.add_favorite("usr-ada", &biz).await.unwrap();
        let again = svc.add_favorite("usr-ada", &biz).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(svc.list_favorites("usr-ada").await.unwrap(), vec![first]);
        assert_eq!(svc.query_audit(&AuditFilter::default()).await.unwrap().total, logged);
    }

    #[tokio::test]
    async fn remove_reports_whether_present() {
        let svc = test_service().await;
        svc.register_user(ACTOR, "usr-ada", "ada@example.com", None).await.unwrap();
        let biz = seed_business(&svc, "Acme").await;
        svc.add_favorite("usr-ada", &biz).await.unwrap();

        assert!(svc.remove_favorite("usr-ada", &biz).await.unwrap());
        assert!(!svc.remove_favorite("usr-ada", &biz).await.unwrap());
        assert!(svc.list_favorites("usr-ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn favorites_follow_their_business() {
        let svc = test_service().await;
        svc.register_user(ACTOR, "usr-ada", "ada@example.com", None).await.unwrap();
        let biz = seed_business(&svc, "Acme").await;
        svc.add_favorite("usr-ada", &biz).await.unwrap();

        svc.delete(ACTOR, EntityType::Business, &biz).await.unwrap();
        assert!(svc.list_favorites("usr-ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_business_is_conflict() {
        let svc = test_service().await;
        svc.register_user(ACTOR, "usr-ada", "ada@example.com", None).await.unwrap();
        let err = svc.add_favorite("usr-ada", "biz-ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
