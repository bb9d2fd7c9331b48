pub mod audit;
pub mod breach;
pub mod identity;
pub mod monitor;
pub mod orchestrator;
pub mod password_policy;
pub mod rate_limiter;
pub mod rbac;
pub mod session_guard;

pub use audit::{AuditStore, AuditTrail, InMemoryAuditStore};
pub use breach::{BreachChecker, BreachCorpus, HttpBreachCorpus};
pub use identity::{Actor, IdentityError, IdentityStore, InMemoryIdentityStore, Profile};
pub use monitor::{
    AdminDirectory, AlertSink, InMemoryAdminDirectory, SecurityMonitor, TracingAlertSink,
};
pub use orchestrator::{AuthOrchestrator, SignInAccepted};
pub use password_policy::PasswordPolicyEngine;
pub use rate_limiter::{InMemoryRateLimitStore, RateLimitPolicy, RateLimitStore, RateLimiter};
pub use rbac::{DecisionReason, InMemoryOverrideStore, OverrideStore, PermissionDecision, RbacEvaluator};
pub use session_guard::{InMemorySessionStore, SessionGuard, SessionStore};
