// src/services/profiles.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::profile::{Profile, ProfileListParams, ProfileUpdate},
    repositories::{ProfileRepository, Repositories},
    utils::jwt::Actor,
};

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            profiles: repos.profiles.clone(),
        }
    }

    /// Admin only.
    pub async fn list(&self, actor: &Actor, params: &ProfileListParams) -> AppResult<Vec<Profile>> {
        actor.require_admin()?;
        self.profiles.list(params.exclude_admins).await
    }

    /// Admins get every requested row; students only their own.
    pub async fn list_by_ids(&self, actor: &Actor, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        if actor.is_admin() {
            return self.profiles.list_by_ids(ids).await;
        }
        let own: Vec<Uuid> = ids.iter().copied().filter(|id| *id == actor.user_id).collect();
        self.profiles.list_by_ids(&own).await
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Profile> {
        actor.require_self_or_admin(id)?;
        self.profiles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Self-service edit, or any edit by an admin. Only admins may change `is_admin`.
    pub async fn update(&self, actor: &Actor, id: Uuid, update: ProfileUpdate) -> AppResult<Profile> {
        actor.require_self_or_admin(id)?;
        update.validate()?;

        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        if update.is_admin.is_some() && !actor.is_admin() {
            return Err(AppError::Forbidden("Only admins can change roles".to_string()));
        }

        let profile = self.profiles.update(id, &update).await?;
        tracing::info!(user = %id, by = %actor.user_id, "Profile updated");
        Ok(profile)
    }

    /// Admin only, and never the caller's own profile.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        if id == actor.user_id {
            return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
        }

        self.profiles.delete(id).await?;
        tracing::info!(user = %id, by = %actor.user_id, "Profile deleted");
        Ok(())
    }
}
