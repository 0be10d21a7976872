// src/handlers/profiles.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::IdsQuery,
    models::profile::{ProfileListParams, ProfileUpdate},
    services::Services,
    utils::jwt::Actor,
};

/// Lists profiles.
///
/// * Without `ids`: admin only, newest first; `exclude_admins=true` lists students only.
/// * With `ids`: the matching profiles the caller may read.
pub async fn list_profiles(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<ProfileListParams>,
    Query(ids): Query<IdsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let profiles = match ids.parse()? {
        Some(ids) => services.profiles.list_by_ids(&actor, &ids).await?,
        None => services.profiles.list(&actor, &params).await?,
    };
    Ok(Json(profiles))
}

/// Fetches one profile. Self or admin.
pub async fn get_profile(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = services.profiles.get(&actor, id).await?;
    Ok(Json(profile))
}

/// Updates a profile.
///
/// * Self or admin.
/// * `is_admin` may only be changed by an admin.
/// * Field errors come back as 400 with a `fields` map.
pub async fn update_profile(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let profile = services.profiles.update(&actor, id, payload).await?;
    Ok(Json(profile))
}

/// Deletes a profile (admin, never self). Returns 204 No Content.
pub async fn delete_profile(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.profiles.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
