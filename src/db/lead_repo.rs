// src/db/lead_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::lead::{Lead, LeadStatus, PaymentStatus, SubmitLeadPayload},
    services::visibility::LeadScope,
};

/// CRM list filters. All optional; combined with AND.
#[derive(Debug, Default, Clone)]
pub struct LeadFilter {
    pub q: Option<String>,
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// All interactions with the 'leads' table.
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, payload: &SubmitLeadPayload) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                full_name, email, phone, client_type, company_name, siret,
                connection_type, project_type, power_kva,
                address, postal_code, city,
                project_status, desired_timeline, comments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&payload.full_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(payload.client_type)
        .bind(&payload.company_name)
        .bind(&payload.siret)
        .bind(payload.connection_type)
        .bind(&payload.project_type)
        .bind(payload.power_kva)
        .bind(&payload.address)
        .bind(&payload.postal_code)
        .bind(&payload.city)
        .bind(&payload.project_status)
        .bind(&payload.desired_timeline)
        .bind(&payload.comments)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }

    /// Fetch one lead through the caller's row scope. A lead outside the
    /// scope is indistinguishable from a missing one.
    pub async fn find_scoped(&self, id: Uuid, scope: &LeadScope) -> Result<Option<Lead>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads WHERE id = ");
        qb.push_bind(id);
        push_scope(&mut qb, scope);

        let lead = qb.build_query_as::<Lead>().fetch_optional(&self.pool).await?;
        Ok(lead)
    }

    pub async fn list(&self, scope: &LeadScope, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM leads WHERE 1=1");
        push_scope(&mut qb, scope);

        if let Some(q) = &filter.q {
            let term = format!("%{}%", q);
            qb.push(" AND (full_name ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR email ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR phone ILIKE ");
            qb.push_bind(term.clone());
            qb.push(" OR city ILIKE ");
            qb.push_bind(term);
            qb.push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(assigned) = &filter.assigned_to {
            if assigned.eq_ignore_ascii_case("unassigned") {
                qb.push(" AND assigned_to IS NULL");
            } else {
                qb.push(" AND assigned_to = ");
                qb.push_bind(assigned.clone());
            }
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at::date >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at::date <= ");
            qb.push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC LIMIT 200");

        let leads = qb.build_query_as::<Lead>().fetch_all(&self.pool).await?;
        Ok(leads)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        status: LeadStatus,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn update_assignment(
        &self,
        id: Uuid,
        assignee: Option<&str>,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET assigned_to = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(assignee)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn update_amount(&self, id: Uuid, amount: Decimal) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET amount = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(amount)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn set_payment_session(
        &self,
        id: Uuid,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET payment_session_id = $1, payment_status = $2, updated_at = now()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET payment_status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn find_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE payment_session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }
}

fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &LeadScope) {
    match scope {
        LeadScope::All => {}
        LeadScope::AssignedOrUnassigned(email) => {
            qb.push(" AND (assigned_to IS NULL OR assigned_to = ");
            qb.push_bind(email.clone());
            qb.push(")");
        }
    }
}
