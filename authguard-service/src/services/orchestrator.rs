//! Request-flow orchestration.
//!
//! Composes the limiter, password engine, breach checker, RBAC evaluator,
//! and audit trail into the operations the rest of the system calls. Each
//! flow ends in accepted or rejected-with-reason, and every rejection path
//! writes exactly one audit record so failed attempts stay forensically
//! visible.
//!
//! Failure policy at the gates: the rate-limit store is fail-closed (an
//! unreachable store rejects the attempt), the audit trail is fail-open
//! (logging being down never blocks authentication), and the breach check
//! is fail-open with its own degraded-check audit event.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::GuardConfig;
use crate::error::AuthError;
use crate::models::{
    AuditEvent, AuditEventType, BreachStatus, RateLimitKey, Role, Session,
};
use crate::services::audit::AuditTrail;
use crate::services::breach::BreachChecker;
use crate::services::identity::{Actor, IdentityError, IdentityStore, Profile};
use crate::services::monitor::SecurityMonitor;
use crate::services::password_policy::PasswordPolicyEngine;
use crate::services::rate_limiter::RateLimiter;
use crate::services::rbac::{PermissionDecision, RbacEvaluator};
use crate::services::session_guard::SessionStore;
use crate::utils::Password;

/// Accepted sign-in: the actor plus a fresh session carrying the role
/// snapshot the guard later drifts against.
#[derive(Debug, Clone)]
pub struct SignInAccepted {
    pub actor: Actor,
    pub session: Session,
}

pub struct AuthOrchestrator {
    limiter: RateLimiter,
    breach: BreachChecker,
    rbac: RbacEvaluator,
    audit: AuditTrail,
    monitor: SecurityMonitor,
    identity: Arc<dyn IdentityStore>,
    sessions: Arc<dyn SessionStore>,
    password_rules: crate::config::PasswordPolicyConfig,
    sensitive_resources: HashSet<String>,
}

impl AuthOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &GuardConfig,
        limiter: RateLimiter,
        breach: BreachChecker,
        rbac: RbacEvaluator,
        audit: AuditTrail,
        monitor: SecurityMonitor,
        identity: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            limiter,
            breach,
            rbac,
            audit,
            monitor,
            identity,
            sessions,
            password_rules: config.password_policy.clone(),
            sensitive_resources: config
                .monitor
                .sensitive_resources
                .iter()
                .cloned()
                .collect(),
        }
    }

    /// Sign-in flow: limiter gate, credential verification, limiter and
    /// audit bookkeeping on every exit.
    pub async fn sign_in(
        &self,
        identifier: &str,
        credential: &Password,
    ) -> Result<SignInAccepted, AuthError> {
        let key = RateLimitKey::email(identifier);

        // Gate first. Fail-closed: an unreachable limiter store rejects.
        let status = match self.limiter.check(&key).await {
            Ok(status) => status,
            Err(e) => {
                return Err(self
                    .reject_storage_unavailable("rate_limit_check", identifier, e)
                    .await);
            }
        };

        if !status.allowed {
            let event = self
                .audit
                .record(
                    AuditEvent::new(AuditEventType::RateLimited, false)
                        .with_metadata(serde_json::json!({
                            "identifier": identifier,
                            "current_count": status.current_count,
                            "max_attempts": status.max_attempts,
                        }))
                        .as_security_event(),
                )
                .await;
            self.monitor.observe(&event).await;
            return Err(AuthError::RateLimited {
                retry_after_secs: status.retry_after_secs,
            });
        }

        match self.identity.verify_credential(identifier, credential).await {
            Ok(actor) => {
                if let Err(e) = self.limiter.record(&key, true).await {
                    // The attempt already succeeded; a failed counter reset
                    // only delays the clean slate.
                    tracing::error!(error = %e, "Failed to reset rate-limit counter");
                }

                let session = Session::new(actor.actor_id, actor.organization_id, actor.role);
                if let Err(e) = self.sessions.insert(session.clone()).await {
                    return Err(self
                        .reject_storage_unavailable("session_insert", identifier, e)
                        .await);
                }

                let event = self
                    .audit
                    .record(
                        AuditEvent::new(AuditEventType::Login, true)
                            .with_actor(actor.actor_id)
                            .with_organization(actor.organization_id),
                    )
                    .await;
                self.monitor.observe(&event).await;

                Ok(SignInAccepted { actor, session })
            }
            Err(IdentityError::InvalidCredentials) => {
                let after = match self.limiter.record(&key, false).await {
                    Ok(status) => status,
                    Err(e) => {
                        return Err(self
                            .reject_storage_unavailable("rate_limit_record", identifier, e)
                            .await);
                    }
                };

                let mut event = AuditEvent::new(AuditEventType::Login, false).with_metadata(
                    serde_json::json!({
                        "identifier": identifier,
                        "failed_attempts": after.current_count,
                    }),
                );
                if !after.allowed {
                    event = event.as_security_event();
                }
                let event = self.audit.record(event).await;
                self.monitor.observe(&event).await;

                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                Err(self
                    .reject_storage_unavailable("credential_verify", identifier, e.into())
                    .await)
            }
        }
    }

    /// Sign-up flow: policy gate, breach gate, identity creation.
    pub async fn sign_up(
        &self,
        identifier: &str,
        credential: &Password,
        profile: Profile,
    ) -> Result<Actor, AuthError> {
        let assessment = PasswordPolicyEngine::validate(credential.as_str(), &self.password_rules);
        if !assessment.valid {
            let event = self
                .audit
                .record(
                    AuditEvent::new(AuditEventType::WeakPasswordRejected, false).with_metadata(
                        serde_json::json!({
                            "identifier": identifier,
                            "score": assessment.score,
                            "strength": assessment.strength,
                            "issues": assessment.issues,
                        }),
                    ),
                )
                .await;
            self.monitor.observe(&event).await;
            return Err(AuthError::WeakPassword(assessment.issues));
        }

        match self.breach.check(credential.as_str()).await {
            BreachStatus::Leaked { count } => {
                let event = self
                    .audit
                    .record(
                        AuditEvent::new(AuditEventType::LeakedPasswordRejected, false)
                            .with_metadata(serde_json::json!({
                                "identifier": identifier,
                                "corpus_count": count,
                            }))
                            .as_security_event(),
                    )
                    .await;
                self.monitor.observe(&event).await;
                return Err(AuthError::LeakedPassword);
            }
            BreachStatus::Unverified => {
                // Fail-open, but never a silent pass: the degraded check
                // gets its own record, distinct from "verified not leaked".
                let event = self
                    .audit
                    .record(
                        AuditEvent::new(AuditEventType::BreachCheckDegraded, true)
                            .with_metadata(serde_json::json!({"identifier": identifier})),
                    )
                    .await;
                self.monitor.observe(&event).await;
            }
            BreachStatus::NotLeaked => {}
        }

        match self.identity.create_identity(identifier, credential, profile).await {
            Ok(actor) => {
                let event = self
                    .audit
                    .record(
                        AuditEvent::new(AuditEventType::Registration, true)
                            .with_actor(actor.actor_id)
                            .with_organization(actor.organization_id),
                    )
                    .await;
                self.monitor.observe(&event).await;
                Ok(actor)
            }
            Err(IdentityError::AlreadyRegistered) => {
                let event = self
                    .audit
                    .record(
                        AuditEvent::new(AuditEventType::Registration, false).with_metadata(
                            serde_json::json!({
                                "identifier": identifier,
                                "reason": "already_registered",
                            }),
                        ),
                    )
                    .await;
                self.monitor.observe(&event).await;
                Err(AuthError::AlreadyRegistered)
            }
            Err(e) => {
                Err(self
                    .reject_storage_unavailable("identity_create", identifier, e.into())
                    .await)
            }
        }
    }

    /// Permission check: resolve the actor's role, delegate to the
    /// evaluator, audit denials on sensitive resources.
    pub async fn check_permission(
        &self,
        actor: Option<(Uuid, Uuid)>,
        required_role: Role,
        resource_type: Option<&str>,
        action: Option<&str>,
    ) -> Result<PermissionDecision, AuthError> {
        let (actor_role, actor_id, organization_id) = match actor {
            Some((actor_id, organization_id)) => {
                let role = self
                    .identity
                    .get_role(actor_id, organization_id)
                    .await
                    .map_err(|e| AuthError::StorageUnavailable(e.into()))?;
                (role, Some(actor_id), organization_id)
            }
            None => (None, None, Uuid::nil()),
        };

        let decision = self
            .rbac
            .evaluate(actor_role, required_role, organization_id, resource_type, action)
            .await
            .map_err(AuthError::Internal)?;

        if !decision.allowed {
            let sensitive = resource_type
                .map(|r| self.sensitive_resources.contains(r))
                .unwrap_or(false);

            let event_type = if sensitive {
                AuditEventType::UnauthorizedAccess
            } else {
                AuditEventType::PermissionCheck
            };

            let mut event = AuditEvent::new(event_type, false).with_metadata(serde_json::json!({
                "required_role": decision.required_role.to_string(),
                "actor_role": actor_role.map(|r| r.to_string()),
                "resource_type": resource_type,
                "action": action,
                "reason": decision.reason.to_string(),
            }));
            if let Some(actor_id) = actor_id {
                event = event.with_actor(actor_id);
            }
            if organization_id != Uuid::nil() {
                event = event.with_organization(organization_id);
            }
            let event = self.audit.record(event).await;
            self.monitor.observe(&event).await;
        }

        Ok(decision)
    }

    async fn reject_storage_unavailable(
        &self,
        stage: &str,
        identifier: &str,
        error: anyhow::Error,
    ) -> AuthError {
        tracing::error!(error = %error, stage, "Storage unavailable, failing closed");
        // Best effort; the audit trail itself is fail-open.
        self.audit.record_async(
            AuditEvent::new(AuditEventType::StorageFailure, false).with_metadata(
                serde_json::json!({
                    "stage": stage,
                    "identifier": identifier,
                }),
            ),
        );
        AuthError::StorageUnavailable(error)
    }
}
