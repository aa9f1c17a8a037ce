// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::LeadFilter,
    middleware::auth::CurrentAdmin,
    models::lead::{AssignLeadPayload, LeadStatus, SubmitLeadPayload, UpdateStatusPayload},
};

// =============================================================================
//  PUBLIC FUNNEL
// =============================================================================

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = SubmitLeadPayload,
    responses(
        (status = 201, description = "Lead recorded"),
        (status = 400, description = "Invalid submission"),
        (status = 429, description = "Too many submissions from this client")
    )
)]
pub async fn submit_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<SubmitLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lead = app_state.lead_service.submit(&payload).await?;

    // Emails are fire-and-forget; the submission result never depends on them.
    if let Some(notifier) = app_state.notifier.clone() {
        let lead_for_mail = lead.clone();
        tokio::spawn(async move {
            notifier.notify_lead_submitted(&lead_for_mail).await;
        });
    }

    Ok((StatusCode::CREATED, Json(json!({ "id": lead.id }))))
}

// =============================================================================
//  CRM
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListLeadsQuery {
    /// Free-text search over name, email, phone and city.
    pub q: Option<String>,
    pub status: Option<LeadStatus>,
    /// Operator email, or "unassigned".
    pub assigned_to: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<ListLeadsQuery> for LeadFilter {
    fn from(query: ListLeadsQuery) -> Self {
        LeadFilter {
            q: query.q,
            status: query.status,
            assigned_to: query.assigned_to,
            from: query.from,
            to: query.to,
        }
    }
}

// GET /api/crm/leads
#[utoipa::path(
    get,
    path = "/api/crm/leads",
    tag = "CRM",
    params(ListLeadsQuery),
    responses(
        (status = 200, description = "Leads visible to the caller, projected by role")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter: LeadFilter = query.into();
    let leads = app_state.lead_service.list_for(&admin, &filter).await?;
    Ok(Json(leads))
}

// GET /api/crm/leads/{id}
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Projected lead"),
        (status = 404, description = "Lead missing or outside the caller's scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.lead_service.get_for(&admin, id).await?;
    Ok(Json(lead))
}

// PATCH /api/crm/leads/{id}/status
#[utoipa::path(
    patch,
    path = "/api/crm/leads/{id}/status",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated; projected lead returned"),
        (status = 404, description = "Lead missing or outside the caller's scope"),
        (status = 409, description = "Transition rejected by the workflow policy")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .lead_service
        .update_status(id, payload.status, &admin)
        .await?;
    Ok(Json(lead))
}

// PATCH /api/crm/leads/{id}/assignment
#[utoipa::path(
    patch,
    path = "/api/crm/leads/{id}/assignment",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = AssignLeadPayload,
    responses(
        (status = 200, description = "Assignment updated; projected lead returned"),
        (status = 403, description = "Role may not assign leads"),
        (status = 422, description = "Assignee is not an active operator")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_lead(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .lead_service
        .assign(id, &payload.assigned_to, &admin)
        .await?;
    Ok(Json(lead))
}

// GET /api/crm/leads/{id}/events
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}/events",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Full timeline, oldest first"),
        (status = 404, description = "Lead missing or outside the caller's scope")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_lead_events(
    State(app_state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.lead_service.events_for(&admin, id).await?;
    Ok(Json(events))
}
