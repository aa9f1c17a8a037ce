// src/services/leads.rs

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AdminRepository, LeadEventRepository, LeadFilter, LeadRepository},
    models::{
        admin::{AdminRole, AdminUser},
        event::{LeadEvent, LeadEventType, NewLeadEvent},
        lead::{ClientType, Lead, LeadStatus, SubmitLeadPayload},
    },
    services::{
        events::EventLogger,
        visibility::{fields_for_role, project, scope_for},
    },
};

/// Workflow policy, resolved once from configuration. Both knobs exist
/// because the product has not settled them: status writes default to all
/// roles and transitions default to lax, matching the live behavior.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowPolicy {
    pub strict_transitions: bool,
    pub traiteur_can_update_status: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            strict_transitions: false,
            traiteur_can_update_status: true,
        }
    }
}

impl WorkflowPolicy {
    pub fn can_update_status(&self, role: AdminRole) -> bool {
        match role {
            AdminRole::Superadmin | AdminRole::Manager => true,
            AdminRole::Traiteur => self.traiteur_can_update_status,
        }
    }

    /// The transition table. Lax mode allows everything; strict mode allows
    /// forward moves only and freezes terminal states. A same-status write
    /// is always accepted (it is a no-op for the audit trail).
    pub fn transition_allowed(&self, from: LeadStatus, to: LeadStatus) -> bool {
        if from == to {
            return true;
        }
        if !self.strict_transitions {
            return true;
        }
        !from.is_terminal() && to.rank() > from.rank()
    }
}

/// The `status_changed` payload, or `None` when no event must be emitted:
/// either the previous status is unknown or the write is a no-op.
pub(crate) fn status_change(old: Option<LeadStatus>, new: LeadStatus) -> Option<Value> {
    match old {
        Some(old) if old != new => Some(json!({ "old": old, "new": new })),
        _ => None,
    }
}

/// Parse the assignment sentinel: `"unassigned"` means SQL NULL, anything
/// else is an operator email to be verified against the admin store.
pub(crate) fn parse_assignee(raw: &str) -> Option<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.eq_ignore_ascii_case("unassigned") {
        return Some(None);
    }
    if !trimmed.contains('@') {
        return None;
    }
    Some(Some(trimmed.to_string()))
}

#[derive(Clone)]
pub struct LeadService {
    repo: LeadRepository,
    admin_repo: AdminRepository,
    event_repo: LeadEventRepository,
    events: EventLogger,
    policy: WorkflowPolicy,
}

impl LeadService {
    pub fn new(
        repo: LeadRepository,
        admin_repo: AdminRepository,
        event_repo: LeadEventRepository,
        events: EventLogger,
        policy: WorkflowPolicy,
    ) -> Self {
        Self {
            repo,
            admin_repo,
            event_repo,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    // =========================================================================
    //  PUBLIC SUBMISSION
    // =========================================================================

    pub async fn submit(&self, payload: &SubmitLeadPayload) -> Result<Lead, AppError> {
        // Company identity is conditional on the client type.
        match payload.client_type {
            ClientType::Professional => {
                if payload.company_name.as_deref().map_or(true, str::is_empty) {
                    return Err(field_error("companyName", "Company name is required."));
                }
                if payload.siret.as_deref().map_or(true, str::is_empty) {
                    return Err(field_error("siret", "SIRET is required for professionals."));
                }
            }
            ClientType::PublicEntity => {
                if payload.company_name.as_deref().map_or(true, str::is_empty) {
                    return Err(field_error("companyName", "Entity name is required."));
                }
            }
            ClientType::Individual => {}
        }

        let lead = self.repo.insert(payload).await?;
        tracing::info!(lead_id = %lead.id, city = %lead.city, "new lead submitted");
        Ok(lead)
    }

    // =========================================================================
    //  CRM READS (scoped + projected)
    // =========================================================================

    pub async fn list_for(
        &self,
        admin: &AdminUser,
        filter: &LeadFilter,
    ) -> Result<Vec<Value>, AppError> {
        let scope = scope_for(admin);
        let fields = fields_for_role(admin.role);

        let leads = self.repo.list(&scope, filter).await?;
        leads.iter().map(|lead| project(lead, &fields)).collect()
    }

    pub async fn get_for(&self, admin: &AdminUser, id: Uuid) -> Result<Value, AppError> {
        let lead = self.fetch_scoped(admin, id).await?;
        project(&lead, &fields_for_role(admin.role))
    }

    /// Timeline of a lead the caller is allowed to see. Events themselves
    /// are not redacted by role.
    pub async fn events_for(&self, admin: &AdminUser, id: Uuid) -> Result<Vec<LeadEvent>, AppError> {
        self.fetch_scoped(admin, id).await?;
        self.event_repo.list_by_lead(id).await
    }

    // =========================================================================
    //  LIFECYCLE MUTATIONS
    // =========================================================================

    /// Persist a new status, then emit a `status_changed` event best-effort.
    /// The event is skipped for no-op writes; the mutation still refreshes
    /// `updated_at`. Last-write-wins: no concurrency token.
    pub async fn update_status(
        &self,
        id: Uuid,
        new_status: LeadStatus,
        actor: &AdminUser,
    ) -> Result<Value, AppError> {
        if !self.policy.can_update_status(actor.role) {
            return Err(AppError::Forbidden("leads:update_status"));
        }

        let current = self.fetch_scoped(actor, id).await?;

        if !self.policy.transition_allowed(current.status, new_status) {
            return Err(AppError::InvalidStatusTransition {
                from: current.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        let updated = self
            .repo
            .update_status(id, new_status)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        if let Some(change) = status_change(Some(current.status), new_status) {
            self.events
                .record(NewLeadEvent {
                    lead_id: id,
                    event_type: LeadEventType::StatusChanged,
                    actor_email: Some(actor.email.clone()),
                    payload: change,
                })
                .await;
        }

        project(&updated, &fields_for_role(actor.role))
    }

    /// Reassign a lead. Requires `can_assign_leads`; the assignee must be an
    /// existing active operator, or the explicit `"unassigned"` sentinel.
    pub async fn assign(
        &self,
        id: Uuid,
        raw_assignee: &str,
        actor: &AdminUser,
    ) -> Result<Value, AppError> {
        if !actor.permissions().can_assign_leads {
            return Err(AppError::Forbidden("leads:assign"));
        }

        let assignee = parse_assignee(raw_assignee)
            .ok_or_else(|| AppError::InvalidAssignee(raw_assignee.to_string()))?;

        // assigned_to is NULL or a valid operator identifier, never a
        // dangling email.
        if let Some(email) = &assignee {
            let found = self
                .admin_repo
                .find_active_by_email(email)
                .await
                .map_err(|e| AppError::TransientError(e.to_string()))?;
            if found.is_none() {
                return Err(AppError::InvalidAssignee(email.clone()));
            }
        }

        let current = self.fetch_scoped(actor, id).await?;

        let updated = self
            .repo
            .update_assignment(id, assignee.as_deref())
            .await?
            .ok_or(AppError::LeadNotFound)?;

        if current.assigned_to != updated.assigned_to {
            self.events
                .record(NewLeadEvent {
                    lead_id: id,
                    event_type: LeadEventType::AssignmentChanged,
                    actor_email: Some(actor.email.clone()),
                    payload: json!({ "old": current.assigned_to, "new": updated.assigned_to }),
                })
                .await;
        }

        project(&updated, &fields_for_role(actor.role))
    }

    async fn fetch_scoped(&self, admin: &AdminUser, id: Uuid) -> Result<Lead, AppError> {
        let scope = scope_for(admin);
        self.repo
            .find_scoped(id, &scope)
            .await?
            .ok_or(AppError::LeadNotFound)
    }
}

fn field_error(field: &str, message: &str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    let mut err = validator::ValidationError::new("required");
    err.message = Some(message.to_string().into());
    let static_field: &'static str = Box::leak(field.to_string().into_boxed_str());
    errors.add(static_field, err);
    AppError::ValidationError(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lax_policy_allows_any_transition() {
        let policy = WorkflowPolicy::default();
        use LeadStatus::*;
        for from in [New, Contacted, InProgress, QuoteSent, Validated, Refused] {
            for to in [New, Contacted, InProgress, QuoteSent, Validated, Refused] {
                assert!(policy.transition_allowed(from, to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn strict_policy_is_forward_only_with_frozen_terminals() {
        let policy = WorkflowPolicy {
            strict_transitions: true,
            ..Default::default()
        };
        use LeadStatus::*;

        assert!(policy.transition_allowed(New, Contacted));
        assert!(policy.transition_allowed(New, Refused)); // forward jump
        assert!(policy.transition_allowed(QuoteSent, Validated));
        assert!(policy.transition_allowed(Contacted, QuoteSent));

        assert!(!policy.transition_allowed(Contacted, New));
        assert!(!policy.transition_allowed(Validated, New));
        assert!(!policy.transition_allowed(Refused, Contacted));
        assert!(!policy.transition_allowed(Validated, Refused)); // terminal frozen

        // Same-status stays a permitted no-op.
        assert!(policy.transition_allowed(InProgress, InProgress));
    }

    #[test]
    fn status_policy_knob_withdraws_traiteur_writes() {
        let open = WorkflowPolicy::default();
        assert!(open.can_update_status(AdminRole::Traiteur));

        let locked = WorkflowPolicy {
            traiteur_can_update_status: false,
            ..Default::default()
        };
        assert!(!locked.can_update_status(AdminRole::Traiteur));
        assert!(locked.can_update_status(AdminRole::Manager));
        assert!(locked.can_update_status(AdminRole::Superadmin));
    }

    #[test]
    fn no_event_for_noop_or_unknown_previous_status() {
        assert!(status_change(Some(LeadStatus::New), LeadStatus::New).is_none());
        assert!(status_change(None, LeadStatus::Refused).is_none());
    }

    #[test]
    fn event_payload_carries_old_and_new_status() {
        let change = status_change(Some(LeadStatus::New), LeadStatus::Refused).unwrap();
        assert_eq!(change, json!({ "old": "new", "new": "refused" }));
    }

    #[test]
    fn unassigned_sentinel_maps_to_null() {
        assert_eq!(parse_assignee("unassigned"), Some(None));
        assert_eq!(parse_assignee("Unassigned"), Some(None));
        assert_eq!(
            parse_assignee("ops1@example.com"),
            Some(Some("ops1@example.com".to_string()))
        );
        assert_eq!(parse_assignee(""), None);
        assert_eq!(parse_assignee("not-an-email"), None);
    }
}
