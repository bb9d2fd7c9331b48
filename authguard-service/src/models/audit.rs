//! Audit event model. Append-only; the core never mutates or deletes
//! recorded events (retention is an external policy).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Security-relevant event types.
///
/// Two classes share this enum: authentication-attempt events (login,
/// registration, rate limiting, password checks) and generic lifecycle
/// events (role changes, permission denials). Both are queryable by actor,
/// type, and time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Login,
    Registration,
    RateLimited,
    WeakPasswordRejected,
    LeakedPasswordRejected,
    /// Breach corpus was unreachable; the check was skipped, not passed.
    BreachCheckDegraded,
    PermissionCheck,
    UnauthorizedAccess,
    RoleChanged,
    SessionInvalidated,
    StorageFailure,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditEventType::Login => "login",
            AuditEventType::Registration => "registration",
            AuditEventType::RateLimited => "rate_limited",
            AuditEventType::WeakPasswordRejected => "weak_password_rejected",
            AuditEventType::LeakedPasswordRejected => "leaked_password_rejected",
            AuditEventType::BreachCheckDegraded => "breach_check_degraded",
            AuditEventType::PermissionCheck => "permission_check",
            AuditEventType::UnauthorizedAccess => "unauthorized_access",
            AuditEventType::RoleChanged => "role_changed",
            AuditEventType::SessionInvalidated => "session_invalidated",
            AuditEventType::StorageFailure => "storage_failure",
        };
        write!(f, "{}", s)
    }
}

/// One recorded security event. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub actor_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub success: bool,
    /// 0-100, derived deterministically by the audit trail before storage.
    pub risk_score: u8,
    /// Marks events that are attacks or policy violations rather than
    /// routine activity; raises the derived risk score.
    pub security_event: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            actor_id: None,
            organization_id: None,
            success,
            risk_score: 0,
            security_event: false,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn as_security_event(mut self) -> Self {
        self.security_event = true;
        self
    }
}

/// Query shape for incident investigation.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,
    pub event_type: Option<AuditEventType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
