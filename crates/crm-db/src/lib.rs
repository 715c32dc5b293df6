//! # crm-db
//!
//! libSQL-backed record store for the CRM core.
//!
//! Handles all relational state: businesses, contacts, tasks, notes,
//! documents, users, system settings, favorites, and the change log.
//! [`service::CrmService`] is the entry point; every mutation goes through
//! it so that each one is paired with exactly one audit entry.
//!
//! Uses the `libsql` crate: a local file (or `:memory:`) for development and
//! tests, or a remote libSQL backend when one is configured.

pub mod error;
pub mod helpers;
mod migrations;
pub mod report;
pub mod repos;
pub mod retry;
pub mod service;
#[cfg(test)]
mod test_support;

use std::path::Path;
use std::time::Duration;

use crm_config::DatabaseConfig;
use error::DatabaseError;
use libsql::Builder;
use libsql::params::IntoParams;
use retry::{RetryConfig, is_transient_remote_error};

/// Central database handle.
///
/// Wraps a libSQL database and connection. Every statement goes through
/// [`CrmDb::execute_with`] or [`CrmDb::query_with`], which bound it with a
/// timeout and retry transient remote errors.
pub struct CrmDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    timeout: Duration,
    retry: RetryConfig,
    remote: bool,
}

impl CrmDb {
    /// Default per-call bound.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let db = Builder::new_local(path).build().await?;
        Self::init(db, false).await
    }

    /// Open a remote libSQL database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        Self::init(db, true).await
    }

    /// Open whichever backend `config` describes.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db = if config.is_remote() {
            tracing::debug!(url = %config.url, "opening remote database");
            Self::open_remote(&config.url, &config.auth_token).await?
        } else {
            tracing::debug!(path = %config.path, "opening local database");
            Self::open_local(&config.path).await?
        };
        Ok(db.with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    async fn init(db: libsql::Database, remote: bool) -> Result<Self, DatabaseError> {
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let crm_db = Self {
            db,
            conn,
            timeout: Self::DEFAULT_TIMEOUT,
            retry: if remote {
                RetryConfig::default()
            } else {
                RetryConfig::none()
            },
            remote,
        };
        crm_db.run_migrations().await?;
        Ok(crm_db)
    }

    /// Replace the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the retry policy for transient remote errors.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"biz-a3f8b2c19e04d71f"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .query_with(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(8)))"),
                || (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Execute a statement, returning the number of affected rows.
    ///
    /// `params` is called once per attempt.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Timeout` when an attempt exceeds the bound,
    /// or the libSQL error of the last attempt.
    pub async fn execute_with<P, F>(&self, sql: &str, params: F) -> Result<u64, DatabaseError>
    where
        P: IntoParams,
        F: Fn() -> P,
    {
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.timeout, self.conn.execute(sql, params()))
                .await
                .map_err(|_| DatabaseError::Timeout(self.timeout))?;
            match result {
                Ok(affected) => return Ok(affected),
                Err(e) if self.should_retry(&e, attempt) => {
                    self.back_off(&e, attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run a query. `params` is called once per attempt.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Timeout` when an attempt exceeds the bound,
    /// or the libSQL error of the last attempt.
    pub async fn query_with<P, F>(&self, sql: &str, params: F) -> Result<libsql::Rows, DatabaseError>
    where
        P: IntoParams,
        F: Fn() -> P,
    {
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.timeout, self.conn.query(sql, params()))
                .await
                .map_err(|_| DatabaseError::Timeout(self.timeout))?;
            match result {
                Ok(rows) => return Ok(rows),
                Err(e) if self.should_retry(&e, attempt) => {
                    self.back_off(&e, attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn should_retry(&self, e: &libsql::Error, attempt: u32) -> bool {
        self.remote && attempt < self.retry.max_attempts && is_transient_remote_error(e)
    }

    async fn back_off(&self, e: &libsql::Error, attempt: u32) {
        let delay = self.retry.delay_for(attempt);
        tracing::warn!(attempt, ?delay, error = %e, "transient database error, retrying");
        tokio::time::sleep(delay).await;
    }
}
