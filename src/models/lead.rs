// src/models/lead.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

// Maps CREATE TYPE lead_status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    InProgress,
    QuoteSent,
    Validated,
    Refused,
}

impl LeadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Validated | LeadStatus::Refused)
    }

    /// Position in the funnel; both terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::InProgress => 2,
            LeadStatus::QuoteSent => 3,
            LeadStatus::Validated | LeadStatus::Refused => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::QuoteSent => "quote_sent",
            LeadStatus::Validated => "validated",
            LeadStatus::Refused => "refused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_type", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum ClientType {
    Individual,
    Professional,
    PublicEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "connection_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    New,
    Temporary,
    Upgrade,
    Collective,
}

// Maps CREATE TYPE payment_status. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
}

impl PaymentStatus {
    fn rank(self) -> u8 {
        match self {
            PaymentStatus::Unpaid => 0,
            PaymentStatus::Pending => 1,
            PaymentStatus::Paid => 2,
        }
    }

    /// unpaid -> pending -> paid, never backward. Skipping pending is fine
    /// (a webhook can land before the session write).
    pub fn can_advance_to(self, next: PaymentStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

// --- LEAD (the record) ---

/// One inbound connection-service request. Never hard-deleted.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,

    // Requester
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub client_type: ClientType,
    pub company_name: Option<String>,
    pub siret: Option<String>,

    // Project
    pub connection_type: ConnectionType,
    pub project_type: Option<String>,
    pub power_kva: Option<Decimal>,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub project_status: Option<String>,
    pub desired_timeline: Option<String>,
    pub comments: Option<String>,

    // Workflow
    pub status: LeadStatus,
    pub assigned_to: Option<String>,
    pub payment_status: PaymentStatus,
    pub amount: Option<Decimal>,
    pub payment_session_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PAYLOADS ---

/// Public submission form. Partial submissions are accepted: only contact
/// and site fields are mandatory.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeadPayload {
    #[validate(length(min = 2, message = "Name must be at least 2 characters."))]
    pub full_name: String,

    #[validate(email(message = "A valid email is required."))]
    pub email: String,

    #[validate(length(min = 6, message = "A valid phone number is required."))]
    pub phone: String,

    pub client_type: ClientType,

    // Required for professionals / public entities, checked in the service.
    pub company_name: Option<String>,
    pub siret: Option<String>,

    pub connection_type: ConnectionType,
    pub project_type: Option<String>,
    pub power_kva: Option<Decimal>,

    #[validate(length(min = 3, message = "Site address is required."))]
    pub address: String,

    #[validate(length(min = 4, max = 10, message = "A valid postal code is required."))]
    pub postal_code: String,

    #[validate(length(min = 1, message = "City is required."))]
    pub city: String,

    pub project_status: Option<String>,
    pub desired_timeline: Option<String>,

    #[validate(length(max = 4000, message = "Comments are limited to 4000 characters."))]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: LeadStatus,
}

/// `assignedTo` is either an operator email or the literal `"unassigned"`.
/// The sentinel keeps "explicitly unassign" distinct from "field omitted",
/// which is rejected by deserialization.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignLeadPayload {
    pub assigned_to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_only_moves_forward() {
        use PaymentStatus::*;
        assert!(Unpaid.can_advance_to(Pending));
        assert!(Unpaid.can_advance_to(Paid));
        assert!(Pending.can_advance_to(Paid));

        assert!(!Paid.can_advance_to(Pending));
        assert!(!Paid.can_advance_to(Unpaid));
        assert!(!Pending.can_advance_to(Unpaid));
        assert!(!Pending.can_advance_to(Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(LeadStatus::Validated.is_terminal());
        assert!(LeadStatus::Refused.is_terminal());
        assert!(!LeadStatus::QuoteSent.is_terminal());
        assert!(!LeadStatus::New.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::QuoteSent).unwrap(),
            "\"quote_sent\""
        );
        assert_eq!(
            serde_json::from_str::<LeadStatus>("\"in_progress\"").unwrap(),
            LeadStatus::InProgress
        );
    }

    #[test]
    fn client_type_uses_kebab_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ClientType::PublicEntity).unwrap(),
            "\"public-entity\""
        );
    }
}
