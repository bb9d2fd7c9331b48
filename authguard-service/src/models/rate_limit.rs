//! Rate-limit records and the status the limiter hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// What a rate-limited identifier is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Email,
    Ip,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Email => write!(f, "email"),
            IdentifierKind::Ip => write!(f, "ip"),
        }
    }
}

/// Key for one tracked identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub identifier: String,
    pub kind: IdentifierKind,
}

impl RateLimitKey {
    pub fn email(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: IdentifierKind::Email,
        }
    }

    pub fn ip(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: IdentifierKind::Ip,
        }
    }
}

/// Mutable state for one (identifier, kind) pair.
///
/// Invariants: `attempt_count` never decreases within a window;
/// `blocked_until`, once set, only moves forward until it elapses and the
/// record resets. All arithmetic uses monotonic instants, never wall time.
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    pub window_start: Instant,
    pub attempt_count: u32,
    pub blocked_until: Option<Instant>,
    /// Consecutive violations, drives lockout escalation when enabled.
    pub strikes: u32,
}

impl RateLimitRecord {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            attempt_count: 0,
            blocked_until: None,
            strikes: 0,
        }
    }
}

/// Read-only snapshot returned by `check` and `record`.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub current_count: u32,
    pub max_attempts: u32,
    pub window_minutes: u64,
    /// Wall-clock projection of the monotonic deadline, for callers and the
    /// Retry-After header. `None` when not blocked.
    pub blocked_until: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub retry_after_secs: Option<u64>,
}

impl RateLimitStatus {
    /// Status used when limiting is disabled (`window_minutes == 0`).
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            current_count: 0,
            max_attempts: 0,
            window_minutes: 0,
            blocked_until: None,
            retry_after_secs: None,
        }
    }
}
