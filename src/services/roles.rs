// src/services/roles.rs

use crate::{common::error::AppError, db::AdminRepository, models::admin::AdminUser};

/// Maps an authenticated principal's email to an operator record.
///
/// Re-invoked on every request so that deactivating an operator revokes CRM
/// access on the next check, regardless of token lifetime.
#[derive(Clone)]
pub struct RoleResolver {
    repo: AdminRepository,
}

impl RoleResolver {
    pub fn new(repo: AdminRepository) -> Self {
        Self { repo }
    }

    pub async fn resolve(&self, email: &str) -> Result<AdminUser, AppError> {
        let lookup = self.repo.find_active_by_email(email).await;
        let admin = decide(lookup)?;

        if admin.stored_bundle_is_stale() {
            // Stored bundle is a cache only; the derived set wins.
            tracing::warn!(
                email = %admin.email,
                role = ?admin.role,
                "stored permission bundle is out of sync with role"
            );
        }

        Ok(admin)
    }
}

/// The resolver's decision table, kept separate from I/O:
/// - a present active row is the operator,
/// - an absent row means authenticated-but-unauthorized,
/// - a store failure is transient and must never read as a denial.
pub(crate) fn decide(
    lookup: Result<Option<AdminUser>, sqlx::Error>,
) -> Result<AdminUser, AppError> {
    match lookup {
        Ok(Some(admin)) => Ok(admin),
        Ok(None) => Err(AppError::Unauthorized),
        Err(e) => Err(AppError::TransientError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::admin::AdminRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn some_admin() -> AdminUser {
        AdminUser {
            id: Uuid::new_v4(),
            email: "manager@example.com".into(),
            password_hash: "x".into(),
            role: AdminRole::Manager,
            can_see_payments: true,
            can_manage_users: false,
            can_see_all_leads: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn active_row_resolves() {
        let admin = decide(Ok(Some(some_admin()))).unwrap();
        assert_eq!(admin.email, "manager@example.com");
    }

    #[test]
    fn absent_row_is_unauthorized_not_an_error() {
        // Covers deactivation too: the lookup filters on is_active = TRUE,
        // so a deactivated operator produces no row on the next check.
        let err = decide(Ok(None)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn store_failure_is_transient_never_a_denial() {
        let err = decide(Err(sqlx::Error::PoolTimedOut)).unwrap_err();
        assert!(matches!(err, AppError::TransientError(_)));
    }
}
