// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, auth, profiles, questions, quizzes, realtime},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: register and login.
/// * Everything else requires a bearer token bound to a live session.
/// * Admin-only groups (question bank, admin sign-up) get a second check.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let public_auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let session_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session))
        .merge(
            Router::new()
                .route("/api/auth/register/admin", post(auth::register_admin))
                .route_layer(middleware::from_fn(admin_middleware)),
        );

    let profile_routes = Router::new()
        .route("/", get(profiles::list_profiles))
        .route(
            "/{id}",
            get(profiles::get_profile)
                .put(profiles::update_profile)
                .delete(profiles::delete_profile),
        );

    let quiz_routes = Router::new()
        .route("/", get(quizzes::list_quizzes).post(quizzes::create_quiz))
        .route(
            "/{id}",
            get(quizzes::get_quiz)
                .put(quizzes::update_quiz)
                .delete(quizzes::delete_quiz),
        )
        .route("/{id}/status", patch(quizzes::set_quiz_status))
        .route("/{id}/questions", get(quizzes::list_quiz_questions))
        .route("/{id}/attempts", post(quizzes::start_attempt));

    let question_routes = Router::new()
        .route("/", get(questions::list_questions).post(questions::create_question))
        .route(
            "/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route_layer(middleware::from_fn(admin_middleware));

    let attempt_routes = Router::new()
        .route("/", get(attempts::list_attempts))
        .route(
            "/{id}",
            get(attempts::get_attempt).delete(attempts::delete_attempt),
        )
        .route("/{id}/submit", post(attempts::submit_attempt));

    let protected = session_routes
        .nest("/api/profiles", profile_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/attempts", attempt_routes)
        .route("/api/realtime/{table}", get(realtime::subscribe))
        .route_layer(require_auth);

    Router::new()
        .nest("/api/auth", public_auth_routes)
        .merge(protected)
        // Global Middleware (the last layer is the outermost)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
