// src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::{not_blank, validate_url_string};

/// Represents the 'profiles' table.
/// One row per authenticated identity; shares the identity's id.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Row written at registration time.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_admin: bool,
}

/// Self-service or admin edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 100), custom(function = not_blank))]
    pub first_name: Option<String>,

    #[validate(length(max = 100), custom(function = not_blank))]
    pub last_name: Option<String>,

    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub avatar_url: Option<String>,

    /// Only honoured when an admin performs the edit.
    pub is_admin: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.avatar_url.is_none()
            && self.is_admin.is_none()
    }
}

/// Query parameters for the user list.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileListParams {
    /// The user-management screen lists students only.
    #[serde(default)]
    pub exclude_admins: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_rejects_bad_avatar_url_and_blank_name() {
        let update = ProfileUpdate {
            first_name: Some("  ".to_string()),
            avatar_url: Some("not a url".to_string()),
            ..Default::default()
        };
        let errors = update.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("avatar_url"));
    }

    #[test]
    fn empty_update_detected() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(update.validate().is_ok());
    }
}
