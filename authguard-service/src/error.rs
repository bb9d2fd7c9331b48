//! Error taxonomy for the security core.
//!
//! Every rejection is a closed variant so UI layers can branch without
//! matching free text. Audit-write failures are deliberately absent from
//! this enum: logging being down must never fail a security decision, so
//! those surface only through operational telemetry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::PasswordIssue;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Too many attempts")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password does not meet policy requirements")]
    WeakPassword(Vec<PasswordIssue>),

    #[error("Password found in a known breach corpus")]
    LeakedPassword,

    #[error("Insufficient role")]
    InsufficientRole,

    #[error("User not authenticated")]
    UserNotAuthenticated,

    #[error("Identifier already registered")]
    AlreadyRegistered,

    #[error("Storage unavailable")]
    StorageUnavailable(anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: &'static str,
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            issues: Option<Vec<PasswordIssue>>,
        }

        let message = self.to_string();
        let (status, code, issues, retry_after) = match self {
            AuthError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                None,
                retry_after_secs,
            ),
            AuthError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None, None)
            }
            AuthError::WeakPassword(issues) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "weak_password",
                Some(issues),
                None,
            ),
            AuthError::LeakedPassword => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "leaked_password",
                None,
                None,
            ),
            AuthError::InsufficientRole => {
                (StatusCode::FORBIDDEN, "insufficient_role", None, None)
            }
            AuthError::UserNotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "user_not_authenticated",
                None,
                None,
            ),
            AuthError::AlreadyRegistered => {
                (StatusCode::CONFLICT, "already_registered", None, None)
            }
            AuthError::StorageUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_unavailable",
                None,
                None,
            ),
            AuthError::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                None,
                None,
            ),
            AuthError::Config(_) | AuthError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                None,
            ),
        };

        let mut res = (
            status,
            Json(ErrorBody {
                error: code,
                message,
                issues,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let res = AuthError::RateLimited {
            retry_after_secs: Some(120),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers().get(axum::http::header::RETRY_AFTER).unwrap(),
            "120"
        );
    }

    #[test]
    fn test_weak_password_is_unprocessable() {
        let res = AuthError::WeakPassword(vec![PasswordIssue::MissingNumber]).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
