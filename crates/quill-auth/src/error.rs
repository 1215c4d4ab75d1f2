//! Authentication error types

use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use quill_db::DbError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Message returned for every token failure, whatever the cause
pub const UNAUTHENTICATED: &str = "unauthenticated";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Too many login attempts, retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("Missing session token")]
    MissingToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),

    #[error("Stored credential is malformed: {0}")]
    CredentialFormat(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token issue error: {0}")]
    TokenIssue(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl AuthError {
    /// True for every session-token failure
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::MalformedToken(_)
                | AuthError::InvalidSignature
                | AuthError::TokenExpired
                | AuthError::InvalidSubject(_)
        )
    }

    /// Status code and client-facing message
    ///
    /// Internal variants never expose their detail.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::EmailTaken | AuthError::IncorrectPassword => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AuthError::UserNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AuthError::TooManyAttempts { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts, retry later".to_string(),
            ),
            e if e.is_unauthenticated() => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED.to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!(error = %self, "Authentication internal error");
        } else if self.is_unauthenticated() {
            debug!(reason = %self, "Rejected unauthenticated request");
        }

        let body = axum::Json(json!({
            "message": message
        }));

        let mut response = (status, body).into_response();
        if let AuthError::TooManyAttempts { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
