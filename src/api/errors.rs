use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::access_policy::PolicyError;
use crate::services::attempts::AttemptError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(String),
    OutOfWindow(String),
    /// Malformed input: unparsable JSON, bad ids or query values.
    BadRequest(String),
    /// Well-formed input that fails validation rules.
    Unprocessable(String),
    NotFound(String),
    Conflict(String),
    AlreadyAttempted(String),
    AlreadySubmitted(String),
    InvalidAttemptToken(String),
    AttemptExpired(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Maps constraint violations from a write to client errors; everything else is internal.
    pub(crate) fn write_failure(err: sqlx::Error, context: &str, conflict: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => return Self::Conflict(conflict.to_string()),
                Some("23514") => {
                    return Self::Unprocessable(format!("{context}: value violates a constraint"))
                }
                _ => {}
            }
        }
        Self::internal(err, context)
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::OutOfWindow(_) => (StatusCode::FORBIDDEN, "out_of_window"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::AlreadyAttempted(_) => (StatusCode::CONFLICT, "already_attempted"),
            Self::AlreadySubmitted(_) => (StatusCode::CONFLICT, "already_submitted"),
            Self::InvalidAttemptToken(_) => (StatusCode::UNAUTHORIZED, "invalid_attempt_token"),
            Self::AttemptExpired(_) => (StatusCode::GONE, "attempt_expired"),
            Self::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        let detail = err.to_string();
        match err {
            AttemptError::QuizNotFound | AttemptError::AttemptNotFound => Self::NotFound(detail),
            AttemptError::WrongPassword | AttemptError::NotOwner | AttemptError::NotFinished => {
                Self::Forbidden(detail)
            }
            AttemptError::OutOfWindow => Self::OutOfWindow(detail),
            AttemptError::AlreadyAttempted => Self::AlreadyAttempted(detail),
            AttemptError::AlreadySubmitted => Self::AlreadySubmitted(detail),
            AttemptError::InvalidToken => Self::InvalidAttemptToken(detail),
            AttemptError::Expired => Self::AttemptExpired(detail),
            AttemptError::Validation(message) => Self::Unprocessable(message),
            AttemptError::Storage(err) => Self::internal(err, "Attempt storage failure"),
            AttemptError::Security(err) => Self::internal(err, "Attempt credential check failed"),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let detail = match self {
            Self::Unauthorized(message) | Self::TooManyRequests(message) => message.to_string(),
            Self::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
            Self::Forbidden(message)
            | Self::OutOfWindow(message)
            | Self::BadRequest(message)
            | Self::Unprocessable(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::AlreadyAttempted(message)
            | Self::AlreadySubmitted(message)
            | Self::InvalidAttemptToken(message)
            | Self::AttemptExpired(message) => message,
        };

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), code, detail })).into_response();
        if status == StatusCode::UNAUTHORIZED && code == "unauthorized" {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
