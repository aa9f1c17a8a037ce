// src/services/visibility.rs
//
// Field-level and row-level visibility. Everything here is a pure function
// of the role: same role in, same field set and scope out.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::{
    common::error::AppError,
    models::{
        admin::{AdminRole, AdminUser},
        lead::Lead,
    },
};

/// Closed set of projectable lead fields. Redaction works on this enum, not
/// on string lists, so a typo cannot silently leak a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LeadField {
    Id,
    FullName,
    Email,
    Phone,
    ClientType,
    CompanyName,
    Siret,
    ConnectionType,
    ProjectType,
    PowerKva,
    Address,
    PostalCode,
    City,
    ProjectStatus,
    DesiredTimeline,
    Comments,
    Status,
    AssignedTo,
    PaymentStatus,
    Amount,
    PaymentSessionId,
    CreatedAt,
    UpdatedAt,
}

impl LeadField {
    /// The JSON key this field serializes to (Lead uses camelCase).
    pub fn key(self) -> &'static str {
        match self {
            LeadField::Id => "id",
            LeadField::FullName => "fullName",
            LeadField::Email => "email",
            LeadField::Phone => "phone",
            LeadField::ClientType => "clientType",
            LeadField::CompanyName => "companyName",
            LeadField::Siret => "siret",
            LeadField::ConnectionType => "connectionType",
            LeadField::ProjectType => "projectType",
            LeadField::PowerKva => "powerKva",
            LeadField::Address => "address",
            LeadField::PostalCode => "postalCode",
            LeadField::City => "city",
            LeadField::ProjectStatus => "projectStatus",
            LeadField::DesiredTimeline => "desiredTimeline",
            LeadField::Comments => "comments",
            LeadField::Status => "status",
            LeadField::AssignedTo => "assignedTo",
            LeadField::PaymentStatus => "paymentStatus",
            LeadField::Amount => "amount",
            LeadField::PaymentSessionId => "paymentSessionId",
            LeadField::CreatedAt => "createdAt",
            LeadField::UpdatedAt => "updatedAt",
        }
    }
}

/// Visible to every role.
pub const BASE_FIELDS: &[LeadField] = &[
    LeadField::Id,
    LeadField::FullName,
    LeadField::Email,
    LeadField::Phone,
    LeadField::ClientType,
    LeadField::ConnectionType,
    LeadField::ProjectType,
    LeadField::PowerKva,
    LeadField::Address,
    LeadField::PostalCode,
    LeadField::City,
    LeadField::ProjectStatus,
    LeadField::DesiredTimeline,
    LeadField::Comments,
    LeadField::Status,
    LeadField::AssignedTo,
    LeadField::CreatedAt,
    LeadField::UpdatedAt,
];

/// Financial fields, gated by `can_see_payments`.
pub const PAYMENT_FIELDS: &[LeadField] = &[
    LeadField::PaymentStatus,
    LeadField::Amount,
    LeadField::PaymentSessionId,
];

/// Legal/registration identifiers, superadmin and manager only.
pub const SENSITIVE_FIELDS: &[LeadField] = &[LeadField::CompanyName, LeadField::Siret];

/// The field projection a role is allowed to see.
pub fn fields_for_role(role: AdminRole) -> BTreeSet<LeadField> {
    let perms = crate::models::admin::permissions_for_role(role);
    let mut fields: BTreeSet<LeadField> = BASE_FIELDS.iter().copied().collect();
    if perms.can_see_payments {
        fields.extend(PAYMENT_FIELDS.iter().copied());
    }
    if matches!(role, AdminRole::Superadmin | AdminRole::Manager) {
        fields.extend(SENSITIVE_FIELDS.iter().copied());
    }
    fields
}

/// Row-level restriction applied before any query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadScope {
    /// Full table, unrestricted by assignment.
    All,
    /// Only leads assigned to this operator or not assigned at all.
    AssignedOrUnassigned(String),
}

pub fn scope_for(admin: &AdminUser) -> LeadScope {
    if admin.permissions().can_see_all_leads {
        LeadScope::All
    } else {
        LeadScope::AssignedOrUnassigned(admin.email.clone())
    }
}

/// Project a lead onto the allowed field set. Redacted fields are absent
/// from the output, not null-filled, so callers cannot branch on them.
pub fn project(lead: &Lead, fields: &BTreeSet<LeadField>) -> Result<Value, AppError> {
    let value = serde_json::to_value(lead).map_err(anyhow::Error::new)?;
    let Value::Object(full) = value else {
        return Err(anyhow::anyhow!("lead did not serialize to an object").into());
    };

    let allowed: BTreeSet<&str> = fields.iter().map(|f| f.key()).collect();
    let projected = full
        .into_iter()
        .filter(|(key, _)| allowed.contains(key.as_str()))
        .collect();

    Ok(Value::Object(projected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lead::{ClientType, ConnectionType, LeadStatus, PaymentStatus};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn sample_lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            full_name: "Jean Dupont".into(),
            email: "jean@example.com".into(),
            phone: "+33600000000".into(),
            client_type: ClientType::Professional,
            company_name: Some("Dupont SARL".into()),
            siret: Some("12345678900011".into()),
            connection_type: ConnectionType::New,
            project_type: Some("house".into()),
            power_kva: Some(Decimal::new(12, 0)),
            address: "1 rue de la Paix".into(),
            postal_code: "75002".into(),
            city: "Paris".into(),
            project_status: None,
            desired_timeline: Some("3 months".into()),
            comments: None,
            status: LeadStatus::New,
            assigned_to: Some("ops1@example.com".into()),
            payment_status: PaymentStatus::Pending,
            amount: Some(Decimal::new(12900, 2)),
            payment_session_id: Some("cs_123".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admin_with_role(role: AdminRole) -> AdminUser {
        let perms = crate::models::admin::permissions_for_role(role);
        AdminUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            password_hash: "x".into(),
            role,
            can_see_payments: perms.can_see_payments,
            can_manage_users: perms.can_manage_users,
            can_see_all_leads: perms.can_see_all_leads,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn field_sets_match_the_role_matrix_exactly() {
        let full: BTreeSet<LeadField> = BASE_FIELDS
            .iter()
            .chain(PAYMENT_FIELDS)
            .chain(SENSITIVE_FIELDS)
            .copied()
            .collect();

        assert_eq!(fields_for_role(AdminRole::Superadmin), full);
        assert_eq!(fields_for_role(AdminRole::Manager), full);

        let restricted: BTreeSet<LeadField> = BASE_FIELDS.iter().copied().collect();
        assert_eq!(fields_for_role(AdminRole::Traiteur), restricted);
    }

    #[test]
    fn traiteur_projection_omits_payment_and_sensitive_keys_entirely() {
        let lead = sample_lead();
        let projected = project(&lead, &fields_for_role(AdminRole::Traiteur)).unwrap();
        let obj = projected.as_object().unwrap();

        for redacted in ["paymentStatus", "amount", "paymentSessionId", "companyName", "siret"] {
            assert!(!obj.contains_key(redacted), "{redacted} leaked");
        }
        // Base fields are all present.
        for field in BASE_FIELDS {
            assert!(obj.contains_key(field.key()), "{} missing", field.key());
        }
        assert_eq!(obj.len(), BASE_FIELDS.len());
    }

    #[test]
    fn manager_projection_includes_payment_fields() {
        let lead = sample_lead();
        let projected = project(&lead, &fields_for_role(AdminRole::Manager)).unwrap();
        let obj = projected.as_object().unwrap();

        assert_eq!(obj["paymentStatus"], serde_json::json!("pending"));
        assert!(obj.contains_key("amount"));
        assert!(obj.contains_key("siret"));
    }

    #[test]
    fn projection_is_deterministic() {
        let lead = sample_lead();
        let a = project(&lead, &fields_for_role(AdminRole::Traiteur)).unwrap();
        let b = project(&lead, &fields_for_role(AdminRole::Traiteur)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scope_restricts_traiteur_to_own_or_unassigned() {
        let traiteur = admin_with_role(AdminRole::Traiteur);
        assert_eq!(
            scope_for(&traiteur),
            LeadScope::AssignedOrUnassigned(traiteur.email.clone())
        );

        assert_eq!(scope_for(&admin_with_role(AdminRole::Manager)), LeadScope::All);
        assert_eq!(scope_for(&admin_with_role(AdminRole::Superadmin)), LeadScope::All);
    }
}
