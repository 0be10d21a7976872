// src/repositories/identity_repository.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::auth::{Identity, SessionRecord},
    repositories::db_error,
};

/// Credentials and sessions of the auth provider.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create(&self, email: &str, password_hash: &str, metadata: Value) -> AppResult<Identity>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Identity>>;
    async fn create_session(&self, identity_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<SessionRecord>;
    async fn find_session(&self, id: Uuid) -> AppResult<Option<SessionRecord>>;
    /// Revoking an already revoked or unknown session is not an error.
    async fn revoke_session(&self, id: Uuid) -> AppResult<()>;
}

pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const IDENTITY_COLUMNS: &str = "id, email, password_hash, metadata, created_at";
const SESSION_COLUMNS: &str = "id, identity_id, created_at, expires_at, revoked_at";

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create(&self, email: &str, password_hash: &str, metadata: Value) -> AppResult<Identity> {
        sqlx::query_as::<_, Identity>(&format!(
            "INSERT INTO identities (email, password_hash, metadata) VALUES ($1, $2, $3) RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(Json(metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create identity", &format!("Email '{email}' is already registered"), e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find identity", "", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find identity", "", e))
    }

    async fn create_session(&self, identity_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<SessionRecord> {
        sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO auth_sessions (identity_id, expires_at) VALUES ($1, $2) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(identity_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create session", "", e))
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<SessionRecord>> {
        sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM auth_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find session", "", e))
    }

    async fn revoke_session(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE auth_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("revoke session", "", e))?;
        Ok(())
    }
}
