// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState, models::admin::AdminUser};

/// Guard for all CRM routes. Two separate checks with two separate failure
/// modes: a bad token means "not logged in" (401), a token whose email is
/// not an active operator means "logged in, not permitted" (403). Role
/// resolution runs here on every request, so deactivation takes effect
/// immediately even with a still-valid token.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    let Some(token) = auth_header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return Err(AppError::InvalidToken);
    };

    let claims = app_state.auth_service.decode_token(token)?;
    let admin = app_state.role_resolver.resolve(&claims.email).await?;

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

/// Extractor for the resolved operator inside handlers.
pub struct CurrentAdmin(pub AdminUser);

impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminUser>()
            .cloned()
            .map(CurrentAdmin)
            .ok_or(AppError::InvalidToken)
    }
}
