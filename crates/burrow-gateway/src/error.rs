use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_shortener::{ShortCode, ShortenerError};

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// The request body or the submitted URL is unusable.
    BadRequest(String),
    /// The long URL is already mapped.
    Conflict { short_code: String, short_url: String },
    /// The short code is not a valid code.
    MalformedCode(String),
    NotFound(String),
    /// The storage backend failed; the client may retry.
    Unavailable(String),
}

impl AppError {
    /// Maps a shortener outcome, using `base_url` to render conflicting codes.
    pub fn from_shortener(err: ShortenerError, base_url: &str) -> Self {
        match err {
            ShortenerError::Conflict(code) => Self::conflict(&code, base_url),
            ShortenerError::InvalidShortCode(message) => Self::MalformedCode(message),
            ShortenerError::NotFound(code) => Self::NotFound(code),
            ShortenerError::Storage(e) => Self::Unavailable(e.to_string()),
        }
    }

    fn conflict(code: &ShortCode, base_url: &str) -> Self {
        Self::Conflict {
            short_code: code.to_string(),
            short_url: code.to_url(base_url),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, error_body(message)),
            AppError::Conflict {
                short_code,
                short_url,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: format!("url already shortened: {short_code}"),
                    short_code: Some(short_code),
                    short_url: Some(short_url),
                },
            ),
            AppError::MalformedCode(message) => (
                StatusCode::BAD_REQUEST,
                error_body(format!("invalid short code: {message}")),
            ),
            AppError::NotFound(code) => (
                StatusCode::NOT_FOUND,
                error_body(format!("short code not found: {code}")),
            ),
            // Backend details stay in the logs.
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_body("storage unavailable".to_string()),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn error_body(error: String) -> ErrorResponse {
    ErrorResponse {
        error,
        short_code: None,
        short_url: None,
    }
}
