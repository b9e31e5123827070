use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failure taxonomy for every authentication flow. Each variant maps to a
/// stable machine code and an HTTP status; handler code never builds status
/// tuples by hand.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input, detected locally before any store call.
    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation surfaced by the store.
    #[error("{0}")]
    Conflict(String),

    /// Unknown email and wrong password, deliberately indistinguishable.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// A secret-based flow presented an absent, expired, or consumed secret.
    #[error("{0}")]
    InvalidOrExpired(String),

    /// Lookup miss on a key that is not enumeration-sensitive (phone, email
    /// for the reset request).
    #[error("{0}")]
    NotFound(String),

    /// The external mail/SMS dispatch failed after the secret was issued.
    #[error("{0}")]
    Delivery(String),

    /// Session token missing, malformed, or expired.
    #[error("{0}")]
    Unauthenticated(String),

    /// Anything unexpected. The detail is logged, never returned.
    #[error("Server error.")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidOrExpired(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Delivery(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidOrExpired(_) => "INVALID_OR_EXPIRED",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Delivery(_) => "DELIVERY_FAILED",
            AuthError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate("email") => AuthError::Conflict("Email already in use.".into()),
            StoreError::Duplicate(field) => {
                AuthError::Conflict(format!("Account {field} already in use."))
            }
            StoreError::Backend(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
