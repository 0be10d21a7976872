// src/repositories/profile_repository.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::profile::{NewProfile, Profile, ProfileUpdate},
    repositories::db_error,
};

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Newest first. `exclude_admins` keeps students only.
    async fn list(&self, exclude_admins: bool) -> AppResult<Vec<Profile>>;
    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>>;
    async fn create(&self, profile: NewProfile) -> AppResult<Profile>;
    /// `NotFound` when the row is gone.
    async fn update(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Profile>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str =
    "id, email, first_name, last_name, phone, avatar_url, is_admin, created_at, updated_at";

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn list(&self, exclude_admins: bool) -> AppResult<Vec<Profile>> {
        let sql = if exclude_admins {
            format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE is_admin = FALSE ORDER BY created_at DESC")
        } else {
            format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC")
        };

        sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list profiles", "", e))
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1) ORDER BY created_at DESC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list profiles by id", "", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch profile", "", e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch profile", "", e))
    }

    async fn create(&self, profile: NewProfile) -> AppResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (id, email, first_name, last_name, phone, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone)
        .bind(profile.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create profile", &format!("Profile for '{}' already exists", profile.email), e))
    }

    async fn update(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Profile> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE profiles SET updated_at = NOW()");

        if let Some(email) = &update.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(first_name) = &update.first_name {
            builder.push(", first_name = ").push_bind(first_name.trim());
        }
        if let Some(last_name) = &update.last_name {
            builder.push(", last_name = ").push_bind(last_name.trim());
        }
        if let Some(phone) = &update.phone {
            builder.push(", phone = ").push_bind(phone);
        }
        if let Some(avatar_url) = &update.avatar_url {
            builder.push(", avatar_url = ").push_bind(avatar_url);
        }
        if let Some(is_admin) = update.is_admin {
            builder.push(", is_admin = ").push_bind(is_admin);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {PROFILE_COLUMNS}"));

        builder
            .build_query_as::<Profile>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update profile", "Email is already in use", e))?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete profile", "", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Profile not found".to_string()));
        }
        Ok(())
    }
}
