// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::auth::{LoginRequest, RegisterRequest, Role},
    services::Services,
    utils::jwt::Actor,
};

/// Registers a new student.
///
/// * Creates the identity (Argon2 password hash), then the profile.
/// * Returns 201 Created and the profile.
/// * A profile failure after the identity was stored is a partial failure (500).
pub async fn register(
    State(services): State<Services>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = services.auth.register(payload, Role::Student).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Registers a new admin. Requires an admin session.
pub async fn register_admin(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = services.auth.register_as(&actor, payload, Role::Admin).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Authenticates with email and password.
///
/// Opens a server-side session and returns a bearer token bound to it.
pub async fn login(
    State(services): State<Services>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = services.auth.login(payload).await?;
    Ok(Json(session))
}

/// Revokes the caller's session. Returns 204 No Content.
pub async fn logout(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    services.auth.logout(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the current session (user id, role, expiry).
pub async fn session(
    State(services): State<Services>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let info = services.auth.session_info(&actor).await?;
    Ok(Json(info))
}
