// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::auth::Role,
    state::AppState,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject - the identity (and profile) id.
    pub sub: Uuid,
    /// Session id; sign-out revokes it server side.
    pub sid: Uuid,
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new JWT for an identity's session.
pub fn sign_jwt(
    user_id: Uuid,
    session_id: Uuid,
    role: Role,
    secret: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        role,
        exp: expires_at.timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// The authenticated caller, as seen by services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, session_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            session_id,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if !self.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(())
    }

    /// Own rows, or any row for admins.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> AppResult<()> {
        if self.user_id != user_id && !self.is_admin() {
            return Err(AppError::Forbidden("Not allowed to access this user".to_string()));
        }
        Ok(())
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Actor::new(claims.sub, claims.sid, claims.role)
    }
}

pub fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and checks that the
/// session it names is still active (not signed out, not expired).
/// If valid, injects the `Actor` into the request extensions.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let actor = state.services.auth.authenticate(token).await?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks that the injected `Actor` is an admin.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let actor = req
        .extensions()
        .get::<Actor>()
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    actor.require_admin()?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_round_trip_keeps_session_and_role() {
        let (user, session) = (Uuid::new_v4(), Uuid::new_v4());
        let token = sign_jwt(user, session, Role::Admin, "secret", Utc::now() + Duration::minutes(5)).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.sid, session);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_or_expired_token_is_rejected() {
        let future = Utc::now() + Duration::minutes(5);
        let token = sign_jwt(Uuid::new_v4(), Uuid::new_v4(), Role::Student, "secret", future).unwrap();
        assert!(matches!(verify_jwt(&token, "other"), Err(AppError::AuthError(_))));

        let past = Utc::now() - Duration::hours(1);
        let token = sign_jwt(Uuid::new_v4(), Uuid::new_v4(), Role::Student, "secret", past).unwrap();
        assert!(verify_jwt(&token, "secret").is_err());
    }

    #[test]
    fn students_only_reach_their_own_rows() {
        let student = Actor::new(Uuid::new_v4(), Uuid::new_v4(), Role::Student);
        assert!(student.require_self_or_admin(student.user_id).is_ok());
        assert!(matches!(
            student.require_self_or_admin(Uuid::new_v4()),
            Err(AppError::Forbidden(_))
        ));
        assert!(student.require_admin().is_err());

        let admin = Actor::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        assert!(admin.require_self_or_admin(Uuid::new_v4()).is_ok());
    }
}
