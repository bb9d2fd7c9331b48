//! Windowed attempt limiter keyed by identifier.
//!
//! `check` is a pure read so callers can probe before a real attempt without
//! spending budget; `record` is the one atomic read-modify-write. The store
//! trait owns atomicity: the in-memory adapter holds a per-key entry lock
//! for the whole mutation, so two concurrent `record` calls for the same
//! identifier can never increment from the same stale count.
//!
//! Windows are fixed: a record resets once `window` has elapsed since
//! `window_start`. A successful record clears the slate. With escalation
//! enabled, each repeat violation doubles the lockout up to a configured
//! cap. All arithmetic uses monotonic instants; wall time appears only in
//! the status handed to callers.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::models::{RateLimitKey, RateLimitRecord, RateLimitStatus};

/// Limiter policy, fixed at construction.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
    pub window_minutes: u64,
    pub escalation: bool,
    pub lockout_max: Duration,
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(cfg: &RateLimitConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            window: Duration::from_secs(cfg.window_minutes * 60),
            window_minutes: cfg.window_minutes,
            escalation: cfg.escalation,
            lockout_max: Duration::from_secs(cfg.lockout_max_secs),
        }
    }
}

impl RateLimitPolicy {
    /// `window_minutes == 0` is the explicit opt-out.
    pub fn disabled(&self) -> bool {
        self.window_minutes == 0
    }

    fn lockout_for(&self, strikes: u32) -> Duration {
        if !self.escalation || strikes <= 1 {
            return self.window.min(self.lockout_max);
        }
        // Doubles per repeat violation, saturating well before overflow.
        let factor = 1u32 << (strikes - 1).min(16);
        (self.window * factor).min(self.lockout_max)
    }
}

/// Storage seam for limiter state. Implementations must make `record` an
/// atomic read-modify-write per key.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn status(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitStatus, anyhow::Error>;

    async fn record(
        &self,
        key: &RateLimitKey,
        success: bool,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitStatus, anyhow::Error>;
}

/// DashMap-backed store. The entry guard is the per-key lock.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    records: DashMap<RateLimitKey, RateLimitRecord>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn snapshot(record: &RateLimitRecord, policy: &RateLimitPolicy, now: Instant) -> RateLimitStatus {
    let blocked = record
        .blocked_until
        .map(|until| now < until)
        .unwrap_or(false);

    let window_elapsed = now.duration_since(record.window_start) >= policy.window;

    // An expired window (or an elapsed block) reads as a fresh record even
    // though the reset itself only happens on the next `record` call.
    let (effective_count, effective_blocked) = if blocked {
        (record.attempt_count, true)
    } else if window_elapsed || record.blocked_until.is_some() {
        (0, false)
    } else {
        (record.attempt_count, false)
    };

    let allowed = !effective_blocked && effective_count < policy.max_attempts;

    let retry_after = if effective_blocked {
        record
            .blocked_until
            .map(|until| until.duration_since(now).as_secs().max(1))
    } else if !allowed {
        Some(
            (policy.window - now.duration_since(record.window_start))
                .as_secs()
                .max(1),
        )
    } else {
        None
    };

    RateLimitStatus {
        allowed,
        current_count: effective_count,
        max_attempts: policy.max_attempts,
        window_minutes: policy.window_minutes,
        blocked_until: retry_after
            .filter(|_| !allowed)
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64)),
        retry_after_secs: retry_after,
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn status(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitStatus, anyhow::Error> {
        let now = Instant::now();
        match self.records.get(key) {
            Some(record) => Ok(snapshot(&record, policy, now)),
            None => Ok(snapshot(&RateLimitRecord::new(now), policy, now)),
        }
    }

    async fn record(
        &self,
        key: &RateLimitKey,
        success: bool,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitStatus, anyhow::Error> {
        let now = Instant::now();
        let mut entry = self
            .records
            .entry(key.clone())
            .or_insert_with(|| RateLimitRecord::new(now));
        let record = entry.value_mut();

        if success {
            // Legitimate access clears the slate, strikes included.
            *record = RateLimitRecord::new(now);
            return Ok(snapshot(record, policy, now));
        }

        let block_elapsed = record
            .blocked_until
            .map(|until| now >= until)
            .unwrap_or(false);
        let window_elapsed = now.duration_since(record.window_start) >= policy.window;

        if block_elapsed || (record.blocked_until.is_none() && window_elapsed) {
            // Natural reset; strikes survive so escalation sees repeat
            // offenders across windows.
            let strikes = record.strikes;
            *record = RateLimitRecord::new(now);
            record.strikes = strikes;
        }

        record.attempt_count += 1;

        if record.attempt_count > policy.max_attempts {
            record.strikes += 1;
            let candidate = now + policy.lockout_for(record.strikes);
            // Monotonically non-decreasing until it elapses.
            record.blocked_until = Some(match record.blocked_until {
                Some(existing) if now < existing => existing.max(candidate),
                _ => candidate,
            });
        }

        Ok(snapshot(record, policy, now))
    }
}

/// The limiter the orchestrator consults before and after every attempt.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    /// Pure read; never spends attempt budget.
    pub async fn check(&self, key: &RateLimitKey) -> Result<RateLimitStatus, anyhow::Error> {
        if self.policy.disabled() {
            return Ok(RateLimitStatus::unlimited());
        }
        self.store.status(key, &self.policy).await
    }

    /// Atomic increment (or reset on success).
    pub async fn record(
        &self,
        key: &RateLimitKey,
        success: bool,
    ) -> Result<RateLimitStatus, anyhow::Error> {
        if self.policy.disabled() {
            return Ok(RateLimitStatus::unlimited());
        }
        self.store.record(key, success, &self.policy).await
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    fn policy(max_attempts: u32, window_minutes: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            max_attempts,
            window: Duration::from_secs(window_minutes * 60),
            window_minutes,
            escalation: false,
            lockout_max: Duration::from_secs(3600),
        }
    }

    fn limiter(max_attempts: u32, window_minutes: u64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            policy(max_attempts, window_minutes),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_is_idempotent() {
        let limiter = limiter(3, 15);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..10 {
            let status = limiter.check(&key).await.unwrap();
            assert!(status.allowed);
            assert_eq!(status.current_count, 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_after_max_plus_one_failures() {
        let limiter = limiter(3, 15);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..4 {
            limiter.record(&key, false).await.unwrap();
        }

        let status = limiter.check(&key).await.unwrap();
        assert!(!status.allowed);
        assert!(status.blocked_until.is_some());
        assert!(status.retry_after_secs.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_denies_once_budget_exhausted() {
        let limiter = limiter(3, 15);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..2 {
            limiter.record(&key, false).await.unwrap();
        }
        assert!(limiter.check(&key).await.unwrap().allowed);

        limiter.record(&key, false).await.unwrap();
        assert!(!limiter.check(&key).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_the_slate() {
        let limiter = limiter(3, 15);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..2 {
            limiter.record(&key, false).await.unwrap();
        }
        let status = limiter.record(&key, true).await.unwrap();
        assert!(status.allowed);
        assert_eq!(status.current_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_resets_count() {
        let limiter = limiter(3, 15);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..3 {
            limiter.record(&key, false).await.unwrap();
        }
        assert!(!limiter.check(&key).await.unwrap().allowed);

        advance(Duration::from_secs(16 * 60)).await;

        let status = limiter.check(&key).await.unwrap();
        assert!(status.allowed);
        assert_eq!(status.current_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_holds_until_it_elapses() {
        let limiter = limiter(2, 15);
        let key = RateLimitKey::ip("10.0.0.1");

        for _ in 0..3 {
            limiter.record(&key, false).await.unwrap();
        }
        assert!(!limiter.check(&key).await.unwrap().allowed);

        // Still inside the lockout.
        advance(Duration::from_secs(5 * 60)).await;
        assert!(!limiter.check(&key).await.unwrap().allowed);

        advance(Duration::from_secs(11 * 60)).await;
        assert!(limiter.check(&key).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_window_disables_limiting() {
        let limiter = limiter(3, 0);
        let key = RateLimitKey::email("a@x.com");

        for _ in 0..100 {
            assert!(limiter.record(&key, false).await.unwrap().allowed);
        }
        assert!(limiter.check(&key).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_doubles_lockout() {
        let mut p = policy(1, 1);
        p.escalation = true;
        assert_eq!(p.lockout_for(1), Duration::from_secs(60));
        assert_eq!(p.lockout_for(2), Duration::from_secs(120));
        assert_eq!(p.lockout_for(3), Duration::from_secs(240));
        // Cap applies.
        assert_eq!(p.lockout_for(12), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_records_never_undercount() {
        let limiter = Arc::new(limiter(100, 15));
        let key = RateLimitKey::email("a@x.com");

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                limiter.record(&key, false).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let status = limiter.check(&key).await.unwrap();
        assert_eq!(status.current_count, 50);
    }
}
