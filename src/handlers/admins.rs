// src/handlers/admins.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentAdmin,
    models::admin::{AdminUser, SetActivePayload},
};

// GET /api/crm/admins
#[utoipa::path(
    get,
    path = "/api/crm/admins",
    tag = "Admins",
    responses(
        (status = 200, description = "All operators", body = Vec<AdminUser>),
        (status = 403, description = "Requires can_manage_users")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_admins(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
) -> Result<impl IntoResponse, AppError> {
    if !admin.permissions().can_manage_users {
        return Err(AppError::Forbidden("admins:manage"));
    }

    let admins = app_state.admin_repo.list_all().await?;
    Ok(Json(admins))
}

// PATCH /api/crm/admins/{id}/active
//
// Deactivation takes effect on the target's very next request: the auth
// guard re-resolves the role every time.
#[utoipa::path(
    patch,
    path = "/api/crm/admins/{id}/active",
    tag = "Admins",
    params(("id" = Uuid, Path, description = "Operator id")),
    request_body = SetActivePayload,
    responses(
        (status = 200, description = "Operator updated", body = AdminUser),
        (status = 403, description = "Requires can_manage_users"),
        (status = 404, description = "Operator not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_admin_active(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<impl IntoResponse, AppError> {
    if !admin.permissions().can_manage_users {
        return Err(AppError::Forbidden("admins:manage"));
    }

    let updated = app_state
        .admin_repo
        .set_active(id, payload.is_active)
        .await?;

    tracing::info!(
        target_email = %updated.email,
        is_active = updated.is_active,
        acted_by = %admin.email,
        "operator active flag changed"
    );

    Ok(Json(updated))
}
