pub mod alert;
pub mod audit;
pub mod password;
pub mod rate_limit;
pub mod role;
pub mod session;

pub use alert::{RecipientScope, SecurityAlert, Severity};
pub use audit::{AuditEvent, AuditEventType, AuditQuery};
pub use password::{BreachStatus, PasswordAssessment, PasswordIssue, Strength};
pub use rate_limit::{IdentifierKind, RateLimitKey, RateLimitRecord, RateLimitStatus};
pub use role::{PermissionOverride, Role, RoleAssignment};
pub use session::Session;
