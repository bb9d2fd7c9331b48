//! Event classification and alert fan-out.
//!
//! Severity comes from explicit thresholds, checked in priority order:
//!
//! 1. leaked-password involvement is always `critical`
//! 2. a role change that lands on admin/super_admin is always `high`
//! 3. failed-login streaks: >= 10 -> `high`, >= 5 -> `medium` (the streak
//!    count rides in the event metadata under `failed_attempts`)
//! 4. otherwise by risk score: >= 80 `critical`, >= 60 `high`,
//!    >= 30 `medium`, else `low`
//!
//! Dispatch notifies the acting user at every severity and fans out to the
//! organization's admins for `high`/`critical`. The fan-out is concurrent
//! and failure-isolated per recipient: one unreachable admin never blocks
//! the rest, and failures are logged rather than retried.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    AuditEvent, AuditEventType, RecipientScope, Role, SecurityAlert, Severity,
};

/// Resolves the active admin/super_admin actors of an organization.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn admins(&self, organization_id: Uuid) -> Result<Vec<Uuid>, anyhow::Error>;
}

/// In-memory directory for library deployments and tests.
#[derive(Default)]
pub struct InMemoryAdminDirectory {
    admins: DashMap<Uuid, Vec<Uuid>>,
}

impl InMemoryAdminDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_admin(&self, organization_id: Uuid, actor_id: Uuid) {
        self.admins.entry(organization_id).or_default().push(actor_id);
    }
}

#[async_trait]
impl AdminDirectory for InMemoryAdminDirectory {
    async fn admins(&self, organization_id: Uuid) -> Result<Vec<Uuid>, anyhow::Error> {
        Ok(self
            .admins
            .get(&organization_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

/// Delivery boundary. The sink owns the how (email, in-app, webhook); this
/// core only decides what and to whom.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), anyhow::Error>;
}

/// Default sink: structured log lines, picked up by the operational
/// pipeline.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), anyhow::Error> {
        tracing::warn!(
            severity = %alert.severity,
            recipient = %alert.recipient,
            scope = ?alert.scope,
            event_type = %alert.event_type,
            title = %alert.title,
            "Security alert"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct SecurityMonitor {
    directory: Arc<dyn AdminDirectory>,
    sink: Arc<dyn AlertSink>,
}

impl SecurityMonitor {
    pub fn new(directory: Arc<dyn AdminDirectory>, sink: Arc<dyn AlertSink>) -> Self {
        Self { directory, sink }
    }

    /// Map an audit event to a severity. Pure function of the event.
    pub fn classify(event: &AuditEvent) -> Severity {
        if event.event_type == AuditEventType::LeakedPasswordRejected {
            return Severity::Critical;
        }

        if event.event_type == AuditEventType::RoleChanged {
            let escalated_to_admin = event
                .metadata
                .get("new_role")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<Role>().ok())
                .map(|r| r.is_admin())
                .unwrap_or(false);
            if escalated_to_admin {
                return Severity::High;
            }
        }

        if event.event_type == AuditEventType::Login && !event.success {
            let failed_attempts = event
                .metadata
                .get("failed_attempts")
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            if failed_attempts >= 10 {
                return Severity::High;
            }
            if failed_attempts >= 5 {
                return Severity::Medium;
            }
        }

        match event.risk_score {
            score if score >= 80 => Severity::Critical,
            score if score >= 60 => Severity::High,
            score if score >= 30 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Classify and dispatch in one step; the orchestrator's entry point.
    pub async fn observe(&self, event: &AuditEvent) -> Severity {
        let severity = Self::classify(event);
        self.dispatch(event, severity).await;
        severity
    }

    /// Deliver alerts for an already-classified event.
    pub async fn dispatch(&self, event: &AuditEvent, severity: Severity) {
        if let Some(actor_id) = event.actor_id {
            let alert = self.build_alert(event, severity, RecipientScope::Actor, actor_id);
            if let Err(e) = self.sink.deliver(&alert).await {
                tracing::error!(
                    error = %e,
                    recipient = %actor_id,
                    "Failed to deliver actor alert"
                );
            }
        }

        if severity < Severity::High {
            return;
        }

        let Some(organization_id) = event.organization_id else {
            return;
        };

        let admins = match self.directory.admins(organization_id).await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    organization_id = %organization_id,
                    "Failed to resolve organization admins for alert fan-out"
                );
                return;
            }
        };

        // Independent per recipient; one failure never stops the rest.
        let deliveries = admins.into_iter().map(|admin_id| {
            let alert = self.build_alert(event, severity, RecipientScope::OrgAdmins, admin_id);
            let sink = self.sink.clone();
            async move {
                if let Err(e) = sink.deliver(&alert).await {
                    tracing::error!(
                        error = %e,
                        recipient = %admin_id,
                        "Failed to deliver admin alert"
                    );
                }
            }
        });
        join_all(deliveries).await;
    }

    fn build_alert(
        &self,
        event: &AuditEvent,
        severity: Severity,
        scope: RecipientScope,
        recipient: Uuid,
    ) -> SecurityAlert {
        SecurityAlert {
            event_type: event.event_type,
            severity,
            scope,
            recipient,
            title: format!("Security event: {}", event.event_type),
            message: match scope {
                RecipientScope::Actor => {
                    format!("A {} event was recorded on your account", event.event_type)
                }
                RecipientScope::OrgAdmins => format!(
                    "A {} severity {} event occurred in your organization",
                    severity, event.event_type
                ),
            },
            data: serde_json::json!({
                "event_id": event.id,
                "risk_score": event.risk_score,
                "metadata": event.metadata,
            }),
        }
    }
}
