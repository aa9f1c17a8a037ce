// src/handlers/payments.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError, config::AppState, middleware::auth::CurrentAdmin,
    services::payments::CheckoutSession,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetAmountPayload {
    pub amount: Decimal,
}

// PATCH /api/crm/leads/{id}/amount
#[utoipa::path(
    patch,
    path = "/api/crm/leads/{id}/amount",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = SetAmountPayload,
    responses(
        (status = 204, description = "Amount set"),
        (status = 403, description = "Requires can_see_payments"),
        (status = 404, description = "Lead not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_amount(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAmountPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payments = app_state
        .payments
        .as_ref()
        .ok_or(AppError::PaymentNotConfigured)?;

    payments.set_amount(id, payload.amount, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/crm/leads/{id}/checkout
#[utoipa::path(
    post,
    path = "/api/crm/leads/{id}/checkout",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 201, description = "Checkout session created", body = CheckoutSession),
        (status = 403, description = "Requires can_see_payments"),
        (status = 409, description = "Lead already paid"),
        (status = 422, description = "Lead has no amount"),
        (status = 503, description = "Payments not configured")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_checkout(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payments = app_state
        .payments
        .as_ref()
        .ok_or(AppError::PaymentNotConfigured)?;

    let session = payments.create_checkout(id, &admin).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

// POST /api/webhooks/payment
//
// Raw body on purpose: the signature covers the exact bytes on the wire.
#[utoipa::path(
    post,
    path = "/api/webhooks/payment",
    tag = "Payments",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Acknowledged"),
        (status = 401, description = "Bad signature"),
        (status = 503, description = "Payments not configured")
    )
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payments = app_state
        .payments
        .as_ref()
        .ok_or(AppError::PaymentNotConfigured)?;

    let signature = headers
        .get("x-payment-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidWebhookSignature)?;

    payments.handle_webhook(signature, &body).await?;
    Ok(StatusCode::OK)
}
