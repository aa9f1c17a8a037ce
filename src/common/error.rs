// src/common/error.rs

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type. Each variant maps to a stable HTTP status in
/// `IntoResponse`; auxiliary failures (event log, email) never reach this
/// type, they are swallowed and logged at their call site.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing/expired/garbled bearer token: the caller is not logged in.
    #[error("invalid token")]
    InvalidToken,

    /// Authenticated at the identity level but absent (or deactivated) in the
    /// admin-user store. Deliberately distinct from `InvalidToken`.
    #[error("account not authorized")]
    Unauthorized,

    /// Logged in, but the role lacks a specific permission.
    #[error("missing permission: {0}")]
    Forbidden(&'static str),

    #[error("lead not found")]
    LeadNotFound,

    #[error("operator not found")]
    AdminNotFound,

    #[error("unknown operator: {0}")]
    InvalidAssignee(String),

    #[error("status transition {from} -> {to} is not allowed")]
    InvalidStatusTransition { from: String, to: String },

    #[error("lead has no amount set")]
    MissingAmount,

    #[error("payment already completed")]
    PaymentAlreadyCompleted,

    #[error("payment provider not configured")]
    PaymentNotConfigured,

    #[error("invalid webhook signature")]
    InvalidWebhookSignature,

    #[error("malformed webhook payload")]
    InvalidWebhookPayload,

    #[error("too many submissions")]
    RateLimited { retry_after_secs: u64 },

    /// Store/connectivity failure in a path where denial would be wrong
    /// (role resolution, data fetch). Retryable, surfaced as 503.
    #[error("transient backend failure: {0}")]
    TransientError(String),

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("payment provider error: {0}")]
    PaymentProviderError(#[from] reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Return every field-level detail at once.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "error": "Too many submissions. Try again later.",
                    "retryAfterSeconds": retry_after_secs,
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    body,
                )
                    .into_response();
            }

            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password.".to_string())
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Authentication token missing or invalid.".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "Access denied. Contact an administrator.".to_string(),
            ),
            AppError::Forbidden(perm) => (
                StatusCode::FORBIDDEN,
                format!("Your role does not grant '{}'.", perm),
            ),
            AppError::LeadNotFound => (StatusCode::NOT_FOUND, "Lead not found.".to_string()),
            AppError::AdminNotFound => {
                (StatusCode::NOT_FOUND, "Operator not found.".to_string())
            }
            AppError::InvalidAssignee(ref who) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("'{}' is not an active operator.", who),
            ),
            AppError::InvalidStatusTransition { ref from, ref to } => (
                StatusCode::CONFLICT,
                format!("Status cannot move from '{}' to '{}'.", from, to),
            ),
            AppError::MissingAmount => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Set an amount on the lead before creating a checkout.".to_string(),
            ),
            AppError::PaymentAlreadyCompleted => {
                (StatusCode::CONFLICT, "This lead is already paid.".to_string())
            }
            AppError::PaymentNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Payments are not configured on this deployment.".to_string(),
            ),
            AppError::InvalidWebhookSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature.".to_string())
            }
            AppError::InvalidWebhookPayload => {
                (StatusCode::BAD_REQUEST, "Malformed webhook payload.".to_string())
            }
            AppError::TransientError(ref detail) => {
                tracing::warn!(detail = %detail, "transient backend failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Temporary backend failure. Retry shortly.".to_string(),
                )
            }

            // Everything else is a 500; the detailed message goes to the log,
            // never to the client.
            ref e => {
                tracing::error!("internal server error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
