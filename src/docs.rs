// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Public funnel ---
        handlers::leads::submit_lead,

        // --- CRM ---
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::update_status,
        handlers::leads::assign_lead,
        handlers::leads::list_lead_events,

        // --- Operators ---
        handlers::admins::list_admins,
        handlers::admins::set_admin_active,

        // --- Payments ---
        handlers::payments::set_amount,
        handlers::payments::create_checkout,
        handlers::payments::payment_webhook,
    ),
    components(
        schemas(
            models::admin::AdminRole,
            models::admin::PermissionSet,
            models::admin::AdminUser,
            models::admin::LoginPayload,
            models::admin::AuthResponse,
            models::admin::SetActivePayload,
            models::lead::Lead,
            models::lead::LeadStatus,
            models::lead::ClientType,
            models::lead::ConnectionType,
            models::lead::PaymentStatus,
            models::lead::SubmitLeadPayload,
            models::lead::UpdateStatusPayload,
            models::lead::AssignLeadPayload,
            models::event::LeadEvent,
            models::event::LeadEventType,
            services::payments::CheckoutSession,
            handlers::payments::SetAmountPayload,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Operator authentication"),
        (name = "Leads", description = "Public lead submission"),
        (name = "CRM", description = "Internal lead triage"),
        (name = "Admins", description = "Operator management"),
        (name = "Payments", description = "Payment provider wrapper")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
