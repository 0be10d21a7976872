// tests/profile_tests.rs
//
// Runs against a real Postgres when DATABASE_URL is set; skipped otherwise.

use std::time::Duration;

use futures::StreamExt;
use quizdesk::{
    client::{
        ApiClient,
        api::{AuthProvider, QuizApi},
    },
    config::Config,
    error::AppError,
    models::{
        auth::{LoginRequest, RegisterRequest, Role},
        profile::ProfileUpdate,
        question::QuestionInput,
        quiz::{QuizInput, QuizUpdate},
        quiz_attempt::SubmitAttemptRequest,
    },
    realtime::{ChangeKind, Table, feed::ChangeFeed, listener},
    repositories::Repositories,
    routes,
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use url::Url;

const PASSWORD: &str = "password123";

/// Spawns the app on Postgres with the trigger listener running.
/// Returns the API client and the seeded admin's email, or `None` without a database.
async fn spawn_app() -> Option<(ApiClient, String)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let mut config = Config::in_memory("profile_test_secret");
    config.database_url = Some(database_url);

    let feed = ChangeFeed::new(config.realtime_capacity);
    listener::spawn(pool.clone(), feed.clone());
    let state = AppState::new(config, &Repositories::postgres(pool), feed);

    let admin = unique_email("admin");
    state
        .services
        .auth
        .seed_admin(&admin, PASSWORD)
        .await
        .expect("Failed to seed admin");

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some((ApiClient::new(Url::parse(&address).unwrap()), admin))
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn sign_up_and_in(api: &ApiClient, email: &str) -> (uuid::Uuid, String) {
    api.register(
        &RegisterRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
        },
        Role::Student,
        None,
    )
    .await
    .expect("Failed to register");
    sign_in(api, email).await
}

async fn sign_in(api: &ApiClient, email: &str) -> (uuid::Uuid, String) {
    let session = api
        .sign_in(&LoginRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("Failed to sign in");
    (session.user_id, session.access_token)
}

#[tokio::test]
async fn test_profile_complex_flow() {
    let Some((api, admin_email)) = spawn_app().await else {
        return;
    };
    let (_, admin) = sign_in(&api, &admin_email).await;

    // 1. Setup User A and User B
    let (user_a, token_a) = sign_up_and_in(&api, &unique_email("ua")).await;
    let (user_b, _) = sign_up_and_in(&api, &unique_email("ub")).await;

    // 2. A edits own profile
    let updated = api
        .update_profile(
            &token_a,
            user_a,
            &ProfileUpdate {
                first_name: Some("Alice".into()),
                phone: Some("+33 1 23 45 67 89".into()),
                ..Default::default()
            },
        )
        .await
        .expect("Self edit failed");
    assert_eq!(updated.first_name, "Alice");

    // 3. A cannot edit B, nor self-promote
    let err = api
        .update_profile(
            &token_a,
            user_b,
            &ProfileUpdate {
                first_name: Some("Mallory".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = api
        .update_profile(
            &token_a,
            user_a,
            &ProfileUpdate {
                is_admin: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // 4. Students only see themselves
    let visible = api.profiles_by_ids(&token_a, &[user_a, user_b]).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, user_a);

    // 5. The admin's student list holds both, and no admins
    let students = api.list_profiles(&admin, true).await.unwrap();
    assert!(students.iter().any(|p| p.id == user_a));
    assert!(students.iter().any(|p| p.id == user_b));
    assert!(students.iter().all(|p| !p.is_admin));

    // 6. The admin removes B
    api.delete_profile(&admin, user_b).await.expect("Delete failed");
    let remaining = api.profiles_by_ids(&admin, &[user_a, user_b]).await.unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn test_attempt_is_graded_against_snapshot() {
    let Some((api, admin_email)) = spawn_app().await else {
        return;
    };
    let (_, admin) = sign_in(&api, &admin_email).await;
    let (_, student) = sign_up_and_in(&api, &unique_email("st")).await;

    let quiz = api
        .create_quiz(
            &admin,
            &QuizInput {
                title: "Snapshot quiz".into(),
                description: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
    let question = api
        .create_question(
            &admin,
            &QuestionInput {
                quiz_id: quiz.id.to_string(),
                question_text: "Pick B".into(),
                options: vec!["A".into(), "B".into()],
                correct_answer: "B".into(),
            },
        )
        .await
        .unwrap();

    let started = api.start_attempt(&student, quiz.id).await.unwrap();
    assert_eq!(started.questions.len(), 1);

    // Changing the key after the start does not change the grade.
    api.update_question(
        &admin,
        question.id,
        &quizdesk::models::question::QuestionUpdate {
            correct_answer: Some("A".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let result = api
        .submit_attempt(
            &student,
            started.attempt.id,
            &SubmitAttemptRequest {
                answers: [(question.id, "B".to_string())].into_iter().collect(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.score, 1);
    assert_eq!(result.total_questions, 1);

    let detail = api.attempt_detail(&student, started.attempt.id).await.unwrap();
    assert_eq!(detail.items[0].question.correct_answer, "B");
}

#[tokio::test]
async fn test_row_changes_reach_subscribers_through_triggers() {
    let Some((api, admin_email)) = spawn_app().await else {
        return;
    };
    let (_, admin) = sign_in(&api, &admin_email).await;

    let quiz = api
        .create_quiz(
            &admin,
            &QuizInput {
                title: "Live".into(),
                description: None,
                is_active: false,
            },
        )
        .await
        .unwrap();
    let filter = quizdesk::realtime::Filter::eq("id", quiz.id);
    let mut events = api.subscribe(&admin, Table::Quizzes, Some(&filter)).await.unwrap();

    // The listener connects in the background; retry until it is up.
    for round in 0..10 {
        api.update_quiz(
            &admin,
            quiz.id,
            &QuizUpdate {
                title: Some(format!("Live {round}")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        if let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), events.next()).await {
            let event = event.unwrap();
            assert_eq!(event.kind, ChangeKind::Update);
            assert_eq!(event.field("id"), Some(&serde_json::json!(quiz.id)));
            return;
        }
    }
    panic!("No change event arrived from Postgres");
}
