// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::not_blank;

/// Application role, derived from `profiles.is_admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Role::Admin } else { Role::Student }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// Represents the 'identities' table (the auth provider's user record).
/// The password hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    /// Extra sign-up data (names), kept alongside the credentials.
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'auth_sessions' table. Sign-out sets `revoked_at`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub identity_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// DTO for user login.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

/// DTO for registration: the login fields plus the profile names.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,

    #[validate(length(max = 100), custom(function = not_blank))]
    pub first_name: String,

    #[validate(length(max = 100), custom(function = not_blank))]
    pub last_name: String,

    #[validate(length(max = 32, message = "Phone number is too long"))]
    #[serde(default)]
    pub phone: Option<String>,
}

/// Returned by sign-in; persisted client side under `user-session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Answer to "is my session still valid?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}
