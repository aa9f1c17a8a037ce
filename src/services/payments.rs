// src/services/payments.rs
//
// Thin wrapper around the external payment provider: checkout-session
// creation and the signed completion webhook. Payment amounts and card
// handling stay entirely on the provider's side.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LeadRepository,
    models::{
        admin::AdminUser,
        event::{LeadEventType, NewLeadEvent},
        lead::PaymentStatus,
    },
    services::events::EventLogger,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: String,
}

/// One-time checkout session as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

// Completion events posted back by the provider.
#[derive(Debug, Deserialize)]
struct ProviderEvent {
    #[serde(rename = "type")]
    kind: String,
    data: ProviderEventData,
}

#[derive(Debug, Deserialize)]
struct ProviderEventData {
    id: String,
    #[serde(default)]
    metadata: Option<ProviderMetadata>,
}

#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    lead_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct PaymentService {
    http: Client,
    config: PaymentConfig,
    lead_repo: LeadRepository,
    events: EventLogger,
}

impl PaymentService {
    pub fn new(
        config: PaymentConfig,
        lead_repo: LeadRepository,
        events: EventLogger,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build payment HTTP client: {e}"))?;

        Ok(Self {
            http,
            config,
            lead_repo,
            events,
        })
    }

    /// Set the amount an operator quoted for the connection service.
    pub async fn set_amount(
        &self,
        lead_id: Uuid,
        amount: Decimal,
        actor: &AdminUser,
    ) -> Result<(), AppError> {
        if !actor.permissions().can_see_payments {
            return Err(AppError::Forbidden("payments:write"));
        }
        if amount <= Decimal::ZERO {
            return Err(AppError::MissingAmount);
        }

        self.lead_repo
            .update_amount(lead_id, amount)
            .await?
            .ok_or(AppError::LeadNotFound)?;
        Ok(())
    }

    /// Create a one-time checkout session for a lead's quoted amount and
    /// advance payment_status unpaid -> pending.
    pub async fn create_checkout(
        &self,
        lead_id: Uuid,
        actor: &AdminUser,
    ) -> Result<CheckoutSession, AppError> {
        if !actor.permissions().can_see_payments {
            return Err(AppError::Forbidden("payments:write"));
        }

        let lead = self
            .lead_repo
            .find_by_id(lead_id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        if lead.payment_status == PaymentStatus::Paid {
            return Err(AppError::PaymentAlreadyCompleted);
        }
        let amount = lead.amount.ok_or(AppError::MissingAmount)?;

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "amount": amount,
                "currency": "eur",
                "description": format!("Grid connection service for {}", lead.full_name),
                "customer_email": lead.email,
                "metadata": { "lead_id": lead.id },
            }))
            .send()
            .await?
            .error_for_status()?;

        let session: CheckoutSession = response.json().await?;

        if lead.payment_status.can_advance_to(PaymentStatus::Pending) {
            self.lead_repo
                .set_payment_session(lead_id, &session.id, PaymentStatus::Pending)
                .await?
                .ok_or(AppError::LeadNotFound)?;

            self.events
                .record(NewLeadEvent::new(
                    lead_id,
                    LeadEventType::PaymentStatusChanged,
                    Some(actor.email.clone()),
                    json!(lead.payment_status),
                    json!(PaymentStatus::Pending),
                ))
                .await;
        } else {
            // Re-issuing a session for an already pending lead just replaces
            // the session reference.
            self.lead_repo
                .set_payment_session(lead_id, &session.id, lead.payment_status)
                .await?
                .ok_or(AppError::LeadNotFound)?;
        }

        tracing::info!(lead_id = %lead_id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Handle the provider's completion webhook. The raw body is verified
    /// against the shared secret before any parsing. Idempotent: repeated or
    /// out-of-order deliveries that would move payment_status backward are
    /// acknowledged and ignored.
    pub async fn handle_webhook(&self, signature: &str, body: &[u8]) -> Result<(), AppError> {
        verify_signature(&self.config.webhook_secret, signature, body)?;

        let event: ProviderEvent =
            serde_json::from_slice(body).map_err(|_| AppError::InvalidWebhookPayload)?;

        if event.kind != "checkout.session.completed" {
            tracing::debug!(kind = %event.kind, "ignoring webhook event type");
            return Ok(());
        }

        // Match by session id first, lead-id metadata as fallback.
        let lead = match self.lead_repo.find_by_payment_session(&event.data.id).await? {
            Some(lead) => lead,
            None => {
                let lead_id = event
                    .data
                    .metadata
                    .as_ref()
                    .and_then(|m| m.lead_id)
                    .ok_or(AppError::LeadNotFound)?;
                self.lead_repo
                    .find_by_id(lead_id)
                    .await?
                    .ok_or(AppError::LeadNotFound)?
            }
        };

        if !lead.payment_status.can_advance_to(PaymentStatus::Paid) {
            tracing::warn!(
                lead_id = %lead.id,
                current = lead.payment_status.as_str(),
                "webhook would not advance payment_status; ignoring"
            );
            return Ok(());
        }

        self.lead_repo
            .update_payment_status(lead.id, PaymentStatus::Paid)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        self.events
            .record(NewLeadEvent::new(
                lead.id,
                LeadEventType::PaymentStatusChanged,
                None, // acted on by the provider, not an operator
                json!(lead.payment_status),
                json!(PaymentStatus::Paid),
            ))
            .await;

        tracing::info!(lead_id = %lead.id, "payment completed via webhook");
        Ok(())
    }
}

/// Constant-time check of the hex-encoded HMAC-SHA256 signature over the
/// raw request body.
pub(crate) fn verify_signature(
    secret: &str,
    signature_hex: &str,
    body: &[u8],
) -> Result<(), AppError> {
    let signature = hex::decode(signature_hex.trim())
        .map_err(|_| AppError::InvalidWebhookSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("bad webhook secret: {e}")))?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidWebhookSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"type":"checkout.session.completed","data":{"id":"cs_1"}}"#;
        let sig = sign("whsec_test", body);
        assert!(verify_signature("whsec_test", &sig, body).is_ok());
    }

    #[test]
    fn tampered_body_is_rejected() {
        let body = br#"{"type":"checkout.session.completed","data":{"id":"cs_1"}}"#;
        let sig = sign("whsec_test", body);
        let tampered = br#"{"type":"checkout.session.completed","data":{"id":"cs_2"}}"#;
        assert!(matches!(
            verify_signature("whsec_test", &sig, tampered),
            Err(AppError::InvalidWebhookSignature)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"payload";
        let sig = sign("whsec_other", body);
        assert!(verify_signature("whsec_test", &sig, body).is_err());
    }

    #[test]
    fn garbage_signature_is_rejected_not_a_panic() {
        assert!(matches!(
            verify_signature("whsec_test", "not-hex!!", b"payload"),
            Err(AppError::InvalidWebhookSignature)
        ));
    }

    #[test]
    fn provider_event_parses_with_metadata_fallback() {
        let raw = br#"{
            "type": "checkout.session.completed",
            "data": {
                "id": "cs_42",
                "metadata": { "lead_id": "550e8400-e29b-41d4-a716-446655440000" }
            }
        }"#;
        let event: ProviderEvent = serde_json::from_slice(raw).unwrap();
        assert_eq!(event.kind, "checkout.session.completed");
        assert_eq!(event.data.id, "cs_42");
        assert!(event.data.metadata.unwrap().lead_id.is_some());
    }
}
