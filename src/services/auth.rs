// src/services/auth.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        auth::{AuthSession, LoginRequest, RegisterRequest, Role, SessionInfo},
        profile::{NewProfile, Profile},
    },
    repositories::{IdentityRepository, ProfileRepository, Repositories},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Actor, sign_jwt, verify_jwt},
    },
};

/// Identities, sessions and the profile row created at sign-up.
#[derive(Clone)]
pub struct AuthService {
    identities: Arc<dyn IdentityRepository>,
    profiles: Arc<dyn ProfileRepository>,
    jwt_secret: String,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(repos: &Repositories, config: &Config) -> Self {
        Self {
            identities: repos.identities.clone(),
            profiles: repos.profiles.clone(),
            jwt_secret: config.jwt_secret.clone(),
            session_ttl: i64::try_from(config.jwt_expiration)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or_else(|| Duration::days(1)),
        }
    }

    /// Creates the identity, then the profile.
    ///
    /// The two writes are not atomic. If the profile insert fails the
    /// identity stays and the error is a `PartialFailure`.
    pub async fn register(&self, req: RegisterRequest, role: Role) -> AppResult<Profile> {
        req.validate()?;

        let email = req.email.trim().to_string();
        let password_hash = hash_password(&req.password)?;
        let metadata = json!({
            "first_name": req.first_name.trim(),
            "last_name": req.last_name.trim(),
        });

        let identity = self
            .identities
            .create(&email, &password_hash, metadata)
            .await?;

        let profile = NewProfile {
            id: identity.id,
            email,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            phone: req.phone.filter(|p| !p.trim().is_empty()),
            is_admin: role.is_admin(),
        };

        let profile = self.profiles.create(profile).await.map_err(|e| {
            tracing::error!(identity = %identity.id, "Profile creation failed after sign-up: {}", e);
            AppError::partial(&["identity"], "profile", e)
        })?;

        tracing::info!(user = %profile.id, ?role, "Registered new user");
        Ok(profile)
    }

    /// Admin-only variant that can create another admin.
    pub async fn register_as(&self, actor: &Actor, req: RegisterRequest, role: Role) -> AppResult<Profile> {
        actor.require_admin()?;
        self.register(req, role).await
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthSession> {
        req.validate()?;

        let invalid = || AppError::AuthError("Invalid email or password".to_string());

        let identity = self
            .identities
            .find_by_email(req.email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &identity.password_hash)? {
            return Err(invalid());
        }

        // A missing profile leaves the caller with student rights.
        let role = self
            .profiles
            .find_by_id(identity.id)
            .await?
            .map(|p| Role::from_admin_flag(p.is_admin))
            .unwrap_or(Role::Student);

        let expires_at = Utc::now() + self.session_ttl;
        let session = self.identities.create_session(identity.id, expires_at).await?;
        let access_token = sign_jwt(identity.id, session.id, role, &self.jwt_secret, expires_at)?;

        tracing::info!(user = %identity.id, session = %session.id, "Signed in");

        Ok(AuthSession {
            access_token,
            token_type: "Bearer".to_string(),
            user_id: identity.id,
            session_id: session.id,
            email: identity.email,
            role,
            expires_at,
        })
    }

    /// Revokes the caller's session. Later requests with the same token get 401.
    pub async fn logout(&self, actor: &Actor) -> AppResult<()> {
        self.identities.revoke_session(actor.session_id).await?;
        tracing::info!(user = %actor.user_id, session = %actor.session_id, "Signed out");
        Ok(())
    }

    /// Token plus session check, run for every authenticated request.
    pub async fn authenticate(&self, token: &str) -> AppResult<Actor> {
        let claims = verify_jwt(token, &self.jwt_secret)?;

        let session = self
            .identities
            .find_session(claims.sid)
            .await?
            .filter(|s| s.identity_id == claims.sub)
            .ok_or_else(|| AppError::AuthError("Session not found".to_string()))?;

        if !session.is_active(Utc::now()) {
            return Err(AppError::AuthError("Session expired or signed out".to_string()));
        }

        Ok(Actor::from(&claims))
    }

    pub async fn session_info(&self, actor: &Actor) -> AppResult<SessionInfo> {
        let session = self
            .identities
            .find_session(actor.session_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Session not found".to_string()))?;

        Ok(SessionInfo {
            user_id: actor.user_id,
            session_id: session.id,
            role: actor.role,
            expires_at: session.expires_at,
        })
    }

    /// Creates the configured admin account once. Returns whether it was created.
    pub async fn seed_admin(&self, email: &str, password: &str) -> AppResult<bool> {
        if self.identities.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        tracing::info!("Seeding admin user: {}", email);
        let req = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            phone: None,
        };
        self.register(req, Role::Admin).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::services::test_support::{FailingProfiles, register_request, repositories};

    fn service(repos: &Repositories) -> AuthService {
        AuthService::new(repos, &Config::in_memory("test-secret"))
    }

    #[tokio::test]
    async fn register_then_login_issues_working_token() {
        let (repos, _store) = repositories();
        let auth = service(&repos);

        let profile = auth.register(register_request("ada@example.com"), Role::Student).await.unwrap();
        assert!(!profile.is_admin);

        let session = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, profile.id);
        assert_eq!(session.role, Role::Student);

        let actor = auth.authenticate(&session.access_token).await.unwrap();
        assert_eq!(actor.user_id, profile.id);
        assert_eq!(actor.session_id, session.session_id);
    }

    #[tokio::test]
    async fn wrong_password_is_auth_error() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        auth.register(register_request("ada@example.com"), Role::Student).await.unwrap();

        let err = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password999".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }

    #[tokio::test]
    async fn logout_revokes_the_session() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        auth.register(register_request("ada@example.com"), Role::Admin).await.unwrap();
        let session = auth
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        let actor = auth.authenticate(&session.access_token).await.unwrap();
        assert!(actor.is_admin());

        auth.logout(&actor).await.unwrap();
        assert!(matches!(
            auth.authenticate(&session.access_token).await,
            Err(AppError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        auth.register(register_request("ada@example.com"), Role::Student).await.unwrap();
        let err = auth
            .register(register_request("ada@example.com"), Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_failure_after_identity_is_partial() {
        let (mut repos, _store) = repositories();
        repos.profiles = Arc::new(FailingProfiles);
        let auth = service(&repos);

        let err = auth
            .register(register_request("ada@example.com"), Role::Student)
            .await
            .unwrap_err();
        match err {
            AppError::PartialFailure(partial) => {
                assert_eq!(partial.completed, vec!["identity".to_string()]);
                assert_eq!(partial.failed, "profile");
            }
            other => panic!("expected partial failure, got {other:?}"),
        }

        // The identity was not rolled back.
        assert!(repos.identities.find_by_email("ada@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_registration_never_reaches_the_store() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        let mut req = register_request("not-an-email");
        req.first_name = " ".into();

        let err = auth.register(req, Role::Student).await.unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("first_name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(repos.identities.find_by_email("not-an-email").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seeding_admin_is_idempotent() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        assert!(auth.seed_admin("root@example.com", "password123").await.unwrap());
        assert!(!auth.seed_admin("root@example.com", "password123").await.unwrap());

        let profile = repos.profiles.find_by_email("root@example.com").await.unwrap().unwrap();
        assert!(profile.is_admin);
    }

    #[tokio::test]
    async fn only_admins_create_admins() {
        let (repos, _store) = repositories();
        let auth = service(&repos);
        let student = Actor::new(Uuid::new_v4(), Uuid::new_v4(), Role::Student);
        let err = auth
            .register_as(&student, register_request("x@example.com"), Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
