//! Session revalidation against the authoritative role store.
//!
//! Pull-based: callers invoke this at trust-boundary crossings (before a
//! sensitive action), not from a poller. On drift the cached session is
//! invalidated, forcing re-authentication, and a role-change event flows
//! through the audit trail and monitor.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{AuditEvent, AuditEventType, Session};
use crate::services::audit::AuditTrail;
use crate::services::identity::IdentityStore;
use crate::services::monitor::SecurityMonitor;

/// Session persistence seam.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), anyhow::Error>;
    async fn get(&self, session_id: Uuid) -> Result<Option<Session>, anyhow::Error>;
    async fn invalidate(&self, session_id: Uuid) -> Result<(), anyhow::Error>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), anyhow::Error> {
        self.sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Session>, anyhow::Error> {
        Ok(self.sessions.get(&session_id).map(|s| s.value().clone()))
    }

    async fn invalidate(&self, session_id: Uuid) -> Result<(), anyhow::Error> {
        self.sessions.remove(&session_id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionGuard {
    identity: Arc<dyn IdentityStore>,
    sessions: Arc<dyn SessionStore>,
    audit: AuditTrail,
    monitor: SecurityMonitor,
}

impl SessionGuard {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
        audit: AuditTrail,
        monitor: SecurityMonitor,
    ) -> Self {
        Self {
            identity,
            sessions,
            audit,
            monitor,
        }
    }

    /// Compare the session's cached role to the authoritative store.
    ///
    /// Returns `true` when the session is still valid. Any drift, including
    /// a revoked assignment, invalidates the session.
    pub async fn revalidate(&self, session: &Session) -> Result<bool, AuthError> {
        let current = self
            .identity
            .get_role(session.actor_id, session.organization_id)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.into()))?;

        if current == Some(session.cached_role) {
            return Ok(true);
        }

        tracing::warn!(
            session_id = %session.session_id,
            actor_id = %session.actor_id,
            cached_role = %session.cached_role,
            current_role = ?current,
            "Session role drift detected, forcing re-authentication"
        );

        if let Err(e) = self.sessions.invalidate(session.session_id).await {
            // The caller still gets `false`; a dangling store entry is
            // preferable to honoring a drifted session.
            tracing::error!(
                error = %e,
                session_id = %session.session_id,
                "Failed to invalidate drifted session"
            );
        }

        let event = self
            .audit
            .record(
                AuditEvent::new(AuditEventType::RoleChanged, false)
                    .with_actor(session.actor_id)
                    .with_organization(session.organization_id)
                    .with_metadata(serde_json::json!({
                        "session_id": session.session_id,
                        "cached_role": session.cached_role.to_string(),
                        "new_role": current.map(|r| r.to_string()),
                    }))
                    .as_security_event(),
            )
            .await;
        self.monitor.observe(&event).await;

        Ok(false)
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::audit::InMemoryAuditStore;
    use crate::services::identity::{InMemoryIdentityStore, Profile};
    use crate::services::monitor::{InMemoryAdminDirectory, TracingAlertSink};
    use crate::utils::Password;

    async fn fixture() -> (SessionGuard, Arc<InMemoryIdentityStore>, Session) {
        let identity = Arc::new(InMemoryIdentityStore::new());
        let actor = identity
            .create_identity(
                "a@x.com",
                &Password::new("Correct-Horse-7-Battery".to_string()),
                Profile::default(),
            )
            .await
            .unwrap();

        let sessions = Arc::new(InMemorySessionStore::new());
        let session = Session::new(actor.actor_id, actor.organization_id, actor.role);
        sessions.insert(session.clone()).await.unwrap();

        let guard = SessionGuard::new(
            identity.clone(),
            sessions,
            AuditTrail::new(Arc::new(InMemoryAuditStore::new())),
            SecurityMonitor::new(
                Arc::new(InMemoryAdminDirectory::new()),
                Arc::new(TracingAlertSink),
            ),
        );
        (guard, identity, session)
    }

    #[tokio::test]
    async fn test_unchanged_role_stays_valid() {
        let (guard, _identity, session) = fixture().await;
        assert!(guard.revalidate(&session).await.unwrap());
        // The session survives.
        assert!(guard
            .sessions()
            .get(session.session_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_drift_invalidates_the_session() {
        let (guard, identity, session) = fixture().await;
        identity.set_role("a@x.com", Role::Admin);

        assert!(!guard.revalidate(&session).await.unwrap());
        assert!(guard
            .sessions()
            .get(session.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_revoked_assignment_counts_as_drift() {
        let identity = Arc::new(InMemoryIdentityStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        // Session references an actor the store no longer knows.
        let session = Session::new(Uuid::new_v4(), Uuid::new_v4(), Role::User);
        sessions.insert(session.clone()).await.unwrap();

        let guard = SessionGuard::new(
            identity,
            sessions,
            AuditTrail::new(Arc::new(InMemoryAuditStore::new())),
            SecurityMonitor::new(
                Arc::new(InMemoryAdminDirectory::new()),
                Arc::new(TracingAlertSink),
            ),
        );

        assert!(!guard.revalidate(&session).await.unwrap());
    }
}
