//! Append-only audit trail.
//!
//! The risk score is derived here, in one place, so the monitor's severity
//! mapping rests on a documented function rather than per-call-site
//! judgement:
//!
//! | event                         | success | baseline |
//! |-------------------------------|---------|----------|
//! | login                         | yes     | 0        |
//! | login                         | no      | 30       |
//! | registration                  | yes     | 0        |
//! | registration                  | no      | 20       |
//! | rate_limited                  | -       | 40       |
//! | weak_password_rejected        | -       | 20       |
//! | leaked_password_rejected      | -       | 60       |
//! | breach_check_degraded         | -       | 25       |
//! | permission_check              | yes     | 0        |
//! | permission_check              | no      | 30       |
//! | unauthorized_access           | -       | 50       |
//! | role_changed                  | -       | 60       |
//! | session_invalidated           | -       | 40       |
//! | storage_failure               | -       | 45       |
//!
//! Events flagged `security_event` get +30, capped at 100.
//!
//! Writes are best effort: a failed append never fails the security
//! decision that produced the event. The failure goes to operational
//! telemetry instead.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{AuditEvent, AuditEventType, AuditQuery};

/// Storage seam for audit events. Append-only by contract: there is no
/// update or delete operation.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<(), anyhow::Error>;
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, anyhow::Error>;
}

/// In-memory append-only store.
#[derive(Default)]
pub struct InMemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, event: AuditEvent) -> Result<(), anyhow::Error> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, anyhow::Error> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| query.actor_id.map_or(true, |id| e.actor_id == Some(id)))
            .filter(|e| query.event_type.map_or(true, |t| e.event_type == t))
            .filter(|e| query.from.map_or(true, |from| e.created_at >= from))
            .filter(|e| query.to.map_or(true, |to| e.created_at <= to))
            .cloned()
            .collect())
    }
}

fn baseline_score(event_type: AuditEventType, success: bool) -> u8 {
    match (event_type, success) {
        (AuditEventType::Login, true) => 0,
        (AuditEventType::Login, false) => 30,
        (AuditEventType::Registration, true) => 0,
        (AuditEventType::Registration, false) => 20,
        (AuditEventType::RateLimited, _) => 40,
        (AuditEventType::WeakPasswordRejected, _) => 20,
        (AuditEventType::LeakedPasswordRejected, _) => 60,
        (AuditEventType::BreachCheckDegraded, _) => 25,
        (AuditEventType::PermissionCheck, true) => 0,
        (AuditEventType::PermissionCheck, false) => 30,
        (AuditEventType::UnauthorizedAccess, _) => 50,
        (AuditEventType::RoleChanged, _) => 60,
        (AuditEventType::SessionInvalidated, _) => 40,
        (AuditEventType::StorageFailure, _) => 45,
    }
}

/// Derive the risk score for an event. Deterministic: same event shape,
/// same score.
pub fn risk_score(event: &AuditEvent) -> u8 {
    let base = baseline_score(event.event_type, event.success);
    if event.security_event {
        base.saturating_add(30).min(100)
    } else {
        base
    }
}

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Score and append an event, returning the stored form.
    ///
    /// Never returns an error to the caller: a failed write is logged to
    /// operational telemetry and the scored event is still handed back so
    /// the monitor can classify it.
    pub async fn record(&self, mut event: AuditEvent) -> AuditEvent {
        event.risk_score = risk_score(&event);

        if let Err(e) = self.store.append(event.clone()).await {
            tracing::error!(
                error = %e,
                event_type = %event.event_type,
                event_id = %event.id,
                "Failed to write audit event"
            );
        } else {
            tracing::info!(
                event_type = %event.event_type,
                success = event.success,
                risk_score = event.risk_score,
                actor_id = ?event.actor_id,
                "Audit event recorded"
            );
        }

        event
    }

    /// Fire-and-forget variant for paths where even the await is unwanted.
    pub fn record_async(&self, event: AuditEvent) {
        let trail = self.clone();
        tokio::spawn(async move {
            trail.record(event).await;
        });
    }

    /// Incident-investigation query by actor, type, and time range.
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, anyhow::Error> {
        self.store.query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    struct FailingStore;

    #[async_trait]
    impl AuditStore for FailingStore {
        async fn append(&self, _event: AuditEvent) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("disk full"))
        }

        async fn query(&self, _query: &AuditQuery) -> Result<Vec<AuditEvent>, anyhow::Error> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    #[test]
    fn test_successful_login_scores_zero() {
        let event = AuditEvent::new(AuditEventType::Login, true);
        assert_eq!(risk_score(&event), 0);
    }

    #[test]
    fn test_failures_score_above_zero() {
        for event_type in [
            AuditEventType::Login,
            AuditEventType::Registration,
            AuditEventType::PermissionCheck,
        ] {
            let event = AuditEvent::new(event_type, false);
            assert!(risk_score(&event) > 0, "{} failure must score", event_type);
        }
    }

    #[test]
    fn test_security_flag_raises_score_capped() {
        let plain = AuditEvent::new(AuditEventType::RoleChanged, true);
        let flagged = AuditEvent::new(AuditEventType::RoleChanged, true).as_security_event();
        assert_eq!(risk_score(&plain), 60);
        assert_eq!(risk_score(&flagged), 90);

        let leaked =
            AuditEvent::new(AuditEventType::LeakedPasswordRejected, false).as_security_event();
        assert_eq!(risk_score(&leaked), 90);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let a = AuditEvent::new(AuditEventType::UnauthorizedAccess, false);
        let b = AuditEvent::new(AuditEventType::UnauthorizedAccess, false);
        assert_eq!(risk_score(&a), risk_score(&b));
    }

    #[tokio::test]
    async fn test_record_survives_store_failure() {
        let trail = AuditTrail::new(Arc::new(FailingStore));
        let event = trail
            .record(AuditEvent::new(AuditEventType::Login, false))
            .await;
        // The scored event still comes back for classification.
        assert_eq!(event.risk_score, 30);
    }

    #[tokio::test]
    async fn test_query_by_actor_type_and_range() {
        let store = Arc::new(InMemoryAuditStore::new());
        let trail = AuditTrail::new(store);
        let actor = Uuid::new_v4();

        trail
            .record(AuditEvent::new(AuditEventType::Login, false).with_actor(actor))
            .await;
        trail
            .record(AuditEvent::new(AuditEventType::Login, true).with_actor(actor))
            .await;
        trail
            .record(AuditEvent::new(AuditEventType::Login, false).with_actor(Uuid::new_v4()))
            .await;

        let events = trail
            .query(&AuditQuery {
                actor_id: Some(actor),
                event_type: Some(AuditEventType::Login),
                from: Some(Utc::now() - Duration::minutes(1)),
                to: Some(Utc::now() + Duration::minutes(1)),
            })
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.actor_id == Some(actor)));
    }
}
