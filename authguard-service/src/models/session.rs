//! Session model for the revalidation guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// An authenticated session with its cached authorization level.
///
/// The cached role is a snapshot taken at sign-in; the guard compares it to
/// the authoritative store at trust-boundary crossings and forces
/// re-authentication on drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub actor_id: Uuid,
    pub organization_id: Uuid,
    pub cached_role: Role,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(actor_id: Uuid, organization_id: Uuid, role: Role) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            actor_id,
            organization_id,
            cached_role: role,
            created_at: Utc::now(),
        }
    }
}
