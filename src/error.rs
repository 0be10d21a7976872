// src/error.rs

use std::{collections::BTreeMap, fmt};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Field name -> messages, as surfaced inline by forms.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Global Application Error Enum.
/// Shared by the HTTP service and the client layer so both speak one error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request, scoped to form fields
    Validation(FieldErrors),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate email, attempt already submitted)
    Conflict(String),

    // 422 Application invariant violated (e.g., snapshot missing)
    Invariant(String),

    // 500 A multi-step sequence stopped after some steps were applied
    PartialFailure(PartialFailure),

    // Client side: the request never produced a response
    Transport(String),
}

/// Which steps of a multi-request sequence went through before one failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialFailure {
    pub completed: Vec<String>,
    pub failed: String,
    pub message: String,
}

impl AppError {
    pub fn partial(completed: &[&str], failed: &str, cause: AppError) -> Self {
        AppError::PartialFailure(PartialFailure {
            completed: completed.iter().map(|s| s.to_string()).collect(),
            failed: failed.to_string(),
            message: cause.to_string(),
        })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) | AppError::PartialFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Invariant(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Rebuilds an error from an API error body. Used by the client layer.
    pub fn from_response(status: StatusCode, body: ErrorBody) -> Self {
        if let Some(partial) = body.partial {
            return AppError::PartialFailure(partial);
        }
        if let Some(fields) = body.fields {
            return AppError::Validation(fields);
        }
        match status {
            StatusCode::BAD_REQUEST => AppError::BadRequest(body.error),
            StatusCode::UNAUTHORIZED => AppError::AuthError(body.error),
            StatusCode::FORBIDDEN => AppError::Forbidden(body.error),
            StatusCode::NOT_FOUND => AppError::NotFound(body.error),
            StatusCode::CONFLICT => AppError::Conflict(body.error),
            StatusCode::UNPROCESSABLE_ENTITY => AppError::Invariant(body.error),
            _ => AppError::InternalServerError(body.error),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg)
            | AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Invariant(msg)
            | AppError::Transport(msg) => f.write_str(msg),
            AppError::Validation(fields) => {
                let summary: Vec<String> = fields
                    .iter()
                    .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                    .collect();
                write!(f, "Validation failed ({})", summary.join("; "))
            }
            AppError::PartialFailure(partial) => write!(
                f,
                "{} (partial state: [{}] applied, {} failed)",
                partial.message,
                partial.completed.join(", "),
                partial.failed
            ),
        }
    }
}

impl std::error::Error for AppError {}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialFailure>,
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                ErrorBody {
                    error: "Internal Server Error".to_string(),
                    fields: None,
                    partial: None,
                }
            }
            AppError::Validation(fields) => ErrorBody {
                error: "Validation failed".to_string(),
                fields: Some(fields),
                partial: None,
            },
            AppError::PartialFailure(partial) => {
                tracing::error!(
                    completed = ?partial.completed,
                    failed = %partial.failed,
                    "Partial failure: {}",
                    partial.message
                );
                ErrorBody {
                    error: partial.message.clone(),
                    fields: None,
                    partial: Some(partial),
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                fields: None,
                partial: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        AppError::Validation(fields)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthError("Invalid token".to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
