//! User administration: registration, approval, roles, and logins.
//!
//! All of these are ordinary audited updates on the `users` table.

use crm_core::entities::User;
use crm_core::enums::UserRole;
use serde_json::json;

use crate::error::DatabaseError;
use crate::helpers::{now_timestamp, object};
use crate::repos::records::{Direction, ListQuery};
use crate::service::CrmService;

impl CrmService {
    /// Register a user under the id issued by the identity provider.
    /// New users start unapproved with the `user` role.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing id or email; a `Conflict`-kind error
    /// when the id or email is taken.
    pub async fn register_user(
        &self,
        actor: &str,
        id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<User, DatabaseError> {
        self.create_as(
            actor,
            object(json!({"id": id, "email": email, "full_name": full_name})),
        )
        .await
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown user.
    pub async fn approve_user(&self, actor: &str, id: &str) -> Result<User, DatabaseError> {
        self.update_as(actor, id, object(json!({"approved": true}))).await
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown user.
    pub async fn set_user_role(
        &self,
        actor: &str,
        id: &str,
        role: UserRole,
    ) -> Result<User, DatabaseError> {
        self.update_as(actor, id, object(json!({"role": role.as_str()}))).await
    }

    /// Stamp `last_login` with the current time. The user is the actor.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user.
    pub async fn record_login(&self, id: &str) -> Result<User, DatabaseError> {
        self.update_as(id, id, object(json!({"last_login": now_timestamp()})))
            .await
    }

    /// Users waiting for approval, oldest registration first. Reads page by
    /// page until the queue is exhausted, so the result is never cut at the
    /// page-size cap.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn pending_users(&self) -> Result<Vec<User>, DatabaseError> {
        let (_, max) = self.page_limits();
        let mut pending = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self
                .list_as::<User>(
                    &ListQuery::new()
                        .filter_eq("approved", false)
                        .order_by("created_at", Direction::Asc)
                        .page(offset, max),
                )
                .await?;
            let fetched = page.records.len();
            pending.extend(page.records);
            if fetched < max as usize {
                return Ok(pending);
            }
            offset = offset.saturating_add(max);
        }
    }
}
