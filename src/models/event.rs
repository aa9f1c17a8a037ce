// src/models/event.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Maps CREATE TYPE lead_event_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadEventType {
    StatusChanged,
    AssignmentChanged,
    PaymentStatusChanged,
}

/// Immutable audit entry. One row per mutation, ordered by `created_at`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub event_type: LeadEventType,
    pub actor_email: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// What the caller hands to the event logger; the id and timestamp are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLeadEvent {
    pub lead_id: Uuid,
    pub event_type: LeadEventType,
    pub actor_email: Option<String>,
    pub payload: Value,
}

impl NewLeadEvent {
    pub fn new(
        lead_id: Uuid,
        event_type: LeadEventType,
        actor_email: Option<String>,
        old: Value,
        new: Value,
    ) -> Self {
        Self {
            lead_id,
            event_type,
            actor_email,
            payload: json!({ "old": old, "new": new }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_old_and_new() {
        let ev = NewLeadEvent::new(
            Uuid::new_v4(),
            LeadEventType::AssignmentChanged,
            Some("manager@example.com".into()),
            Value::Null,
            json!("ops1@example.com"),
        );
        assert_eq!(ev.payload["old"], Value::Null);
        assert_eq!(ev.payload["new"], json!("ops1@example.com"));
    }
}
