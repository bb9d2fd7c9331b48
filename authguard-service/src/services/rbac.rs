//! Role-based authorization evaluator.
//!
//! The base rule is a comparison in the role total order. Admin roles
//! always pass, and the decision records that the admin bypass fired even
//! when the plain comparison would have been enough, so the audit trail can
//! tell the two apart. A permission override for the exact
//! (organization, resource, action) triple replaces the caller-supplied
//! required role before the comparison runs.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{PermissionOverride, Role};

/// Closed reason set so callers and the audit trail branch without string
/// matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Ok,
    InsufficientRole,
    UserNotAuthenticated,
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionReason::Ok => write!(f, "ok"),
            DecisionReason::InsufficientRole => write!(f, "insufficient_role"),
            DecisionReason::UserNotAuthenticated => write!(f, "user_not_authenticated"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    /// True when an admin role carried the decision.
    pub is_admin: bool,
    /// The requirement actually compared against, after any override.
    pub required_role: Role,
    pub override_applied: bool,
}

/// Lookup seam for permission overrides.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn find(
        &self,
        organization_id: Uuid,
        resource_type: &str,
        action: &str,
    ) -> Result<Option<PermissionOverride>, anyhow::Error>;
}

/// In-memory override store keyed by the full triple.
#[derive(Default)]
pub struct InMemoryOverrideStore {
    overrides: DashMap<(Uuid, String, String), PermissionOverride>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, value: PermissionOverride) {
        self.overrides.insert(
            (
                value.organization_id,
                value.resource_type.clone(),
                value.action.clone(),
            ),
            value,
        );
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn find(
        &self,
        organization_id: Uuid,
        resource_type: &str,
        action: &str,
    ) -> Result<Option<PermissionOverride>, anyhow::Error> {
        Ok(self
            .overrides
            .get(&(
                organization_id,
                resource_type.to_string(),
                action.to_string(),
            ))
            .map(|entry| entry.value().clone()))
    }
}

#[derive(Clone)]
pub struct RbacEvaluator {
    overrides: Arc<dyn OverrideStore>,
}

impl RbacEvaluator {
    pub fn new(overrides: Arc<dyn OverrideStore>) -> Self {
        Self { overrides }
    }

    /// Evaluate whether `actor_role` satisfies `required_role`.
    ///
    /// `actor_role == None` means the actor could not be resolved; that is
    /// denied up front without consulting overrides.
    pub async fn evaluate(
        &self,
        actor_role: Option<Role>,
        required_role: Role,
        organization_id: Uuid,
        resource_type: Option<&str>,
        action: Option<&str>,
    ) -> Result<PermissionDecision, anyhow::Error> {
        let actor_role = match actor_role {
            Some(role) => role,
            None => {
                return Ok(PermissionDecision {
                    allowed: false,
                    reason: DecisionReason::UserNotAuthenticated,
                    is_admin: false,
                    required_role,
                    override_applied: false,
                });
            }
        };

        let (required_role, override_applied) = match (resource_type, action) {
            (Some(resource), Some(action)) => {
                match self.overrides.find(organization_id, resource, action).await? {
                    Some(entry) => (entry.required_role, true),
                    None => (required_role, false),
                }
            }
            _ => (required_role, false),
        };

        let is_admin = actor_role.is_admin();
        let allowed = is_admin || actor_role >= required_role;

        if !allowed {
            tracing::debug!(
                actor_role = %actor_role,
                required_role = %required_role,
                organization_id = %organization_id,
                override_applied,
                "Permission denied"
            );
        }

        Ok(PermissionDecision {
            allowed,
            reason: if allowed {
                DecisionReason::Ok
            } else {
                DecisionReason::InsufficientRole
            },
            is_admin,
            required_role,
            override_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> (RbacEvaluator, Arc<InMemoryOverrideStore>) {
        let store = Arc::new(InMemoryOverrideStore::new());
        (RbacEvaluator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_equal_or_higher_role_allowed() {
        let (eval, _) = evaluator();
        let org = Uuid::new_v4();

        for role in [Role::Auditor, Role::RiskManager, Role::ComplianceOfficer] {
            let decision = eval
                .evaluate(Some(role), Role::Auditor, org, None, None)
                .await
                .unwrap();
            assert!(decision.allowed, "{} should satisfy auditor", role);
            assert_eq!(decision.reason, DecisionReason::Ok);
        }
    }

    #[tokio::test]
    async fn test_lower_role_denied() {
        let (eval, _) = evaluator();
        let decision = eval
            .evaluate(Some(Role::User), Role::Auditor, Uuid::new_v4(), None, None)
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::InsufficientRole);
    }

    #[tokio::test]
    async fn test_monotonicity_in_the_total_order() {
        // If a role is permitted, every higher role is too.
        let (eval, _) = evaluator();
        let org = Uuid::new_v4();
        let required = Role::RiskManager;

        let mut permitted_seen = false;
        for role in [
            Role::Viewer,
            Role::User,
            Role::Auditor,
            Role::RiskManager,
            Role::ComplianceOfficer,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            let decision = eval
                .evaluate(Some(role), required, org, None, None)
                .await
                .unwrap();
            if permitted_seen {
                assert!(decision.allowed, "{} must be allowed above the bar", role);
            }
            permitted_seen |= decision.allowed;
        }
    }

    #[tokio::test]
    async fn test_admin_bypass_is_recorded() {
        let (eval, _) = evaluator();
        let decision = eval
            .evaluate(
                Some(Role::Admin),
                Role::SuperAdmin,
                Uuid::new_v4(),
                None,
                None,
            )
            .await
            .unwrap();
        assert!(decision.allowed);
        assert!(decision.is_admin);

        // Recorded even when the plain comparison alone would have passed.
        let decision = eval
            .evaluate(Some(Role::Admin), Role::User, Uuid::new_v4(), None, None)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert!(decision.is_admin);
    }

    #[tokio::test]
    async fn test_unauthenticated_denied_before_overrides() {
        let (eval, store) = evaluator();
        let org = Uuid::new_v4();
        store.insert(PermissionOverride {
            organization_id: org,
            resource_type: "policy".to_string(),
            action: "read".to_string(),
            required_role: Role::Viewer,
        });

        let decision = eval
            .evaluate(None, Role::Viewer, org, Some("policy"), Some("read"))
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::UserNotAuthenticated);
        assert!(!decision.override_applied);
    }

    #[tokio::test]
    async fn test_override_raises_the_bar() {
        let (eval, store) = evaluator();
        let org = Uuid::new_v4();
        store.insert(PermissionOverride {
            organization_id: org,
            resource_type: "policy".to_string(),
            action: "approve".to_string(),
            required_role: Role::ComplianceOfficer,
        });

        // user >= user would pass, but the override demands more.
        let decision = eval
            .evaluate(
                Some(Role::User),
                Role::User,
                org,
                Some("policy"),
                Some("approve"),
            )
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::InsufficientRole);
        assert!(decision.override_applied);
        assert_eq!(decision.required_role, Role::ComplianceOfficer);
    }

    #[tokio::test]
    async fn test_override_scoped_to_its_organization() {
        let (eval, store) = evaluator();
        let org = Uuid::new_v4();
        store.insert(PermissionOverride {
            organization_id: org,
            resource_type: "policy".to_string(),
            action: "approve".to_string(),
            required_role: Role::ComplianceOfficer,
        });

        let other_org = Uuid::new_v4();
        let decision = eval
            .evaluate(
                Some(Role::User),
                Role::User,
                other_org,
                Some("policy"),
                Some("approve"),
            )
            .await
            .unwrap();
        assert!(decision.allowed);
        assert!(!decision.override_applied);
    }
}
