// src/db/admin_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::admin::{AdminRole, AdminUser, PermissionSet},
};

// All interactions with the 'admin_users' table.
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The Role Resolver lookup: active operators only. Returns the raw
    /// sqlx error so the caller can distinguish "no row" from "store down".
    pub async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminUser>, sqlx::Error> {
        sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE email = $1 AND is_active = TRUE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<AdminUser>, AppError> {
        let admins = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<AdminUser, AppError> {
        sqlx::query_as::<_, AdminUser>(
            "UPDATE admin_users SET is_active = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::AdminNotFound)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Used only by the startup bootstrap; regular provisioning is out of
    /// band. The stored bundle is written from the derived permission set.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        role: AdminRole,
        perms: PermissionSet,
    ) -> Result<AdminUser, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO admin_users
                (email, password_hash, role, can_see_payments, can_manage_users, can_see_all_leads)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(perms.can_see_payments)
        .bind(perms.can_manage_users)
        .bind(perms.can_see_all_leads)
        .fetch_one(&self.pool)
        .await?;

        Ok(admin)
    }
}
