// src/config.rs

use std::{env, fmt, path::PathBuf, str::FromStr};

use dotenvy::dotenv;
use url::Url;

/// Default number of questions a quiz should carry before it is activated.
pub const DEFAULT_MIN_QUESTIONS: usize = 5;

/// Buffered change events per realtime subscriber before it starts lagging.
pub const DEFAULT_REALTIME_CAPACITY: usize = 256;

/// Which backend the repositories talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl FromStr for Storage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Storage::Postgres),
            "memory" | "mem" => Ok(Storage::Memory),
            other => Err(ConfigError::Invalid("STORAGE", other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid(key, value) => write!(f, "{key} has an invalid value: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: Storage,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub min_questions_for_activation: usize,
    /// When false the question minimum is only reported back, never enforced.
    pub enforce_min_questions: bool,
    pub realtime_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let storage = match env::var("STORAGE") {
            Ok(value) => value.parse()?,
            Err(_) => Storage::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == Storage::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            storage,
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 60 * 60 * 24)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_origins,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            min_questions_for_activation: parse_or(
                "MIN_QUESTIONS_FOR_ACTIVATION",
                DEFAULT_MIN_QUESTIONS,
            )?,
            enforce_min_questions: parse_or("ENFORCE_MIN_QUESTIONS", false)?,
            realtime_capacity: parse_or("REALTIME_CAPACITY", DEFAULT_REALTIME_CAPACITY)?,
        })
    }

    /// Configuration for tests and local runs against the in-memory backend.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            storage: Storage::Memory,
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origins: Vec::new(),
            admin_email: None,
            admin_password: None,
            min_questions_for_activation: DEFAULT_MIN_QUESTIONS,
            enforce_min_questions: false,
            realtime_capacity: DEFAULT_REALTIME_CAPACITY,
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

/// Settings for the client layer (`quizdesk::client`).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    /// File holding the persisted `user-session` / `user-profile` entries.
    pub state_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw = env::var("QUIZDESK_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let api_url = Url::parse(&raw).map_err(|_| ConfigError::Invalid("QUIZDESK_API_URL", raw))?;

        let state_file = env::var("QUIZDESK_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".quizdesk-state.json"));

        Ok(Self { api_url, state_file })
    }
}
