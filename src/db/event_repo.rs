// src/db/event_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::event::{LeadEvent, NewLeadEvent},
};

// Append-only access to 'lead_events'. No update or delete exists on purpose.
#[derive(Clone)]
pub struct LeadEventRepository {
    pool: PgPool,
}

impl LeadEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, event: &NewLeadEvent) -> Result<LeadEvent, AppError> {
        let row = sqlx::query_as::<_, LeadEvent>(
            r#"
            INSERT INTO lead_events (lead_id, event_type, actor_email, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(event.lead_id)
        .bind(event.event_type)
        .bind(&event.actor_email)
        .bind(&event.payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_by_lead(&self, lead_id: Uuid) -> Result<Vec<LeadEvent>, AppError> {
        let events = sqlx::query_as::<_, LeadEvent>(
            "SELECT * FROM lead_events WHERE lead_id = $1 ORDER BY created_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
