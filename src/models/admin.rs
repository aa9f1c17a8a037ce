// src/models/admin.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Maps the CREATE TYPE admin_role in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "admin_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Superadmin,
    Manager,
    Traiteur,
}

/// Effective grants for a role. Always derived via [`permissions_for_role`];
/// the booleans stored on `admin_users` are a cache of that function's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub can_see_payments: bool,
    pub can_manage_users: bool,
    pub can_see_all_leads: bool,
    pub can_assign_leads: bool,
}

/// Single source of truth for role -> permissions.
pub fn permissions_for_role(role: AdminRole) -> PermissionSet {
    match role {
        AdminRole::Superadmin => PermissionSet {
            can_see_payments: true,
            can_manage_users: true,
            can_see_all_leads: true,
            can_assign_leads: true,
        },
        AdminRole::Manager => PermissionSet {
            can_see_payments: true,
            can_manage_users: false,
            can_see_all_leads: true,
            can_assign_leads: true,
        },
        AdminRole::Traiteur => PermissionSet {
            can_see_payments: false,
            can_manage_users: false,
            can_see_all_leads: false,
            can_assign_leads: false,
        },
    }
}

// An internal operator as stored in the database.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // never leaks through the API
    pub password_hash: String,

    pub role: AdminRole,

    // Cached permission bundle; compare against `permissions()` before trust.
    pub can_see_payments: bool,
    pub can_manage_users: bool,
    pub can_see_all_leads: bool,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// Effective permissions, recomputed from the role. The stored booleans
    /// are ignored here on purpose.
    pub fn permissions(&self) -> PermissionSet {
        permissions_for_role(self.role)
    }

    /// True when the stored bundle no longer matches the derived one.
    pub fn stored_bundle_is_stale(&self) -> bool {
        let derived = self.permissions();
        self.can_see_payments != derived.can_see_payments
            || self.can_manage_users != derived.can_manage_users
            || self.can_see_all_leads != derived.can_see_all_leads
    }
}

// Login payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // operator id
    pub email: String, // resolved against the admin store on every request
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivePayload {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superadmin_and_manager_see_payments_traiteur_does_not() {
        assert!(permissions_for_role(AdminRole::Superadmin).can_see_payments);
        assert!(permissions_for_role(AdminRole::Manager).can_see_payments);
        assert!(!permissions_for_role(AdminRole::Traiteur).can_see_payments);
    }

    #[test]
    fn only_superadmin_manages_users() {
        assert!(permissions_for_role(AdminRole::Superadmin).can_manage_users);
        assert!(!permissions_for_role(AdminRole::Manager).can_manage_users);
        assert!(!permissions_for_role(AdminRole::Traiteur).can_manage_users);
    }

    #[test]
    fn assignment_is_restricted_to_superadmin_and_manager() {
        assert!(permissions_for_role(AdminRole::Superadmin).can_assign_leads);
        assert!(permissions_for_role(AdminRole::Manager).can_assign_leads);
        assert!(!permissions_for_role(AdminRole::Traiteur).can_assign_leads);
    }

    #[test]
    fn permissions_are_deterministic() {
        for role in [AdminRole::Superadmin, AdminRole::Manager, AdminRole::Traiteur] {
            assert_eq!(permissions_for_role(role), permissions_for_role(role));
        }
    }

    fn admin(role: AdminRole, bundle: (bool, bool, bool)) -> AdminUser {
        AdminUser {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            password_hash: "x".into(),
            role,
            can_see_payments: bundle.0,
            can_manage_users: bundle.1,
            can_see_all_leads: bundle.2,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stale_bundle_is_detected() {
        // A traiteur row that was left with manager-level cached flags.
        let drifted = admin(AdminRole::Traiteur, (true, false, true));
        assert!(drifted.stored_bundle_is_stale());

        let in_sync = admin(AdminRole::Traiteur, (false, false, false));
        assert!(!in_sync.stored_bundle_is_stale());
    }
}
