// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentAdmin,
    models::admin::{AuthResponse, LoginPayload},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "JWT issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::OK, Json(AuthResponse { token })))
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current operator with derived permissions"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Logged in but not an active operator")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(CurrentAdmin(admin): CurrentAdmin) -> Result<impl IntoResponse, AppError> {
    // Permissions are always the derived set, never the stored cache.
    let permissions = admin.permissions();
    Ok(Json(json!({
        "id": admin.id,
        "email": admin.email,
        "role": admin.role,
        "permissions": permissions,
    })))
}
