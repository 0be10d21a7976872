// src/main.rs

use std::{process, time::Duration};

use quizdesk::{
    config::{Config, Storage},
    realtime::{feed::ChangeFeed, listener},
    repositories::Repositories,
    routes,
    state::AppState,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "quizdesk.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let feed = ChangeFeed::new(config.realtime_capacity);

    let repos = match config.storage {
        Storage::Postgres => {
            let pool = connect(&config).await;
            // Row changes reach the feed through LISTEN/NOTIFY.
            listener::spawn(pool.clone(), feed.clone());
            Repositories::postgres(pool)
        }
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Repositories::memory(feed.clone())
        }
    };

    let state = AppState::new(config.clone(), &repos, feed);

    // Seed Admin User
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        match state.services.auth.seed_admin(email, password).await {
            Ok(true) => tracing::info!("Admin user created successfully."),
            Ok(false) => tracing::debug!("Admin user already present"),
            Err(e) => tracing::error!("Failed to seed admin user: {:?}", e),
        }
    }

    let app = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            process::exit(1);
        }
    };
    tracing::info!("quizdesk listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}

/// Connects with retries, then applies pending migrations.
async fn connect(config: &Config) -> PgPool {
    let Some(url) = config.database_url.as_deref() else {
        tracing::error!("DATABASE_URL must be set for postgres storage");
        process::exit(1);
    };

    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > CONNECT_RETRIES {
                    tracing::error!(
                        "Failed to connect to database after {} retries: {}",
                        CONNECT_RETRIES,
                        e
                    );
                    process::exit(1);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        process::exit(1);
    }
    tracing::info!("Migrations applied successfully.");

    pool
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
