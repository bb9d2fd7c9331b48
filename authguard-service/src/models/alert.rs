//! Security alerts derived from audit events by the monitor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::audit::AuditEventType;

/// Alert severity, ordered so thresholds can be compared directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Who an alert goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientScope {
    /// The acting user only.
    Actor,
    /// Every active admin/super_admin in the organization.
    OrgAdmins,
}

/// Alert handed to the notification sink. The sink owns delivery; this core
/// only decides what and to whom.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAlert {
    pub event_type: AuditEventType,
    pub severity: Severity,
    pub scope: RecipientScope,
    pub recipient: Uuid,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}
