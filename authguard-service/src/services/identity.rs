//! Identity store seam.
//!
//! The identity store is an external collaborator: it owns accounts,
//! credentials, and role assignments. The core only calls the three
//! operations below. The in-memory adapter exists for library deployments
//! and tests; it keeps argon2 hashes, never plaintext.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Resolved account, as the identity store reports it.
#[derive(Debug, Clone)]
pub struct Actor {
    pub actor_id: Uuid,
    pub identifier: String,
    pub organization_id: Uuid,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Profile captured at sign-up; everything beyond credentials.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub organization_id: Option<Uuid>,
    pub display_name: Option<String>,
}

/// Why credential verification did not produce an actor.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unknown identifier or wrong credential")]
    InvalidCredentials,
    #[error("Identifier already registered")]
    AlreadyRegistered,
    #[error("Unknown actor")]
    UnknownActor,
    #[error("Identity store failure: {0}")]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn verify_credential(
        &self,
        identifier: &str,
        credential: &Password,
    ) -> Result<Actor, IdentityError>;

    async fn create_identity(
        &self,
        identifier: &str,
        credential: &Password,
        profile: Profile,
    ) -> Result<Actor, IdentityError>;

    /// Current authoritative role, the value sessions drift against.
    async fn get_role(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Role>, IdentityError>;
}

struct StoredIdentity {
    actor: Actor,
    credential_hash: PasswordHashString,
}

/// In-memory identity store keyed by identifier.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: DashMap<String, Arc<StoredIdentity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directly set an actor's role, simulating the external role
    /// management this core only observes.
    pub fn set_role(&self, identifier: &str, role: Role) {
        if let Some(mut entry) = self.identities.get_mut(identifier) {
            let mut stored = Actor::clone(&entry.actor);
            stored.role = role;
            *entry = Arc::new(StoredIdentity {
                actor: stored,
                credential_hash: entry.credential_hash.clone(),
            });
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn verify_credential(
        &self,
        identifier: &str,
        credential: &Password,
    ) -> Result<Actor, IdentityError> {
        let stored = self
            .identities
            .get(identifier)
            .map(|entry| entry.value().clone())
            .ok_or(IdentityError::InvalidCredentials)?;

        verify_password(credential, &stored.credential_hash)
            .map_err(|_| IdentityError::InvalidCredentials)?;

        Ok(stored.actor.clone())
    }

    async fn create_identity(
        &self,
        identifier: &str,
        credential: &Password,
        profile: Profile,
    ) -> Result<Actor, IdentityError> {
        let hash = hash_password(credential).map_err(IdentityError::Store)?;

        let actor = Actor {
            actor_id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            organization_id: profile.organization_id.unwrap_or_else(Uuid::new_v4),
            role: Role::User,
            display_name: profile.display_name,
        };

        // Entry API keeps the existence check and the insert atomic.
        match self.identities.entry(identifier.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(IdentityError::AlreadyRegistered),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(StoredIdentity {
                    actor: actor.clone(),
                    credential_hash: hash,
                }));
                Ok(actor)
            }
        }
    }

    async fn get_role(
        &self,
        actor_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Role>, IdentityError> {
        Ok(self
            .identities
            .iter()
            .find(|entry| {
                entry.actor.actor_id == actor_id
                    && entry.actor.organization_id == organization_id
            })
            .map(|entry| entry.actor.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_verify() {
        let store = InMemoryIdentityStore::new();
        let credential = Password::new("Correct-Horse-7-Battery".to_string());

        let actor = store
            .create_identity("a@x.com", &credential, Profile::default())
            .await
            .unwrap();
        assert_eq!(actor.role, Role::User);

        let verified = store.verify_credential("a@x.com", &credential).await.unwrap();
        assert_eq!(verified.actor_id, actor.actor_id);
    }

    #[tokio::test]
    async fn test_wrong_credential_rejected() {
        let store = InMemoryIdentityStore::new();
        let credential = Password::new("Correct-Horse-7-Battery".to_string());
        store
            .create_identity("a@x.com", &credential, Profile::default())
            .await
            .unwrap();

        let wrong = Password::new("not-it".to_string());
        assert!(matches!(
            store.verify_credential("a@x.com", &wrong).await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_identifier_rejected() {
        let store = InMemoryIdentityStore::new();
        let credential = Password::new("Correct-Horse-7-Battery".to_string());
        store
            .create_identity("a@x.com", &credential, Profile::default())
            .await
            .unwrap();

        assert!(matches!(
            store
                .create_identity("a@x.com", &credential, Profile::default())
                .await,
            Err(IdentityError::AlreadyRegistered)
        ));
    }

    #[tokio::test]
    async fn test_role_updates_are_observed() {
        let store = InMemoryIdentityStore::new();
        let credential = Password::new("Correct-Horse-7-Battery".to_string());
        let actor = store
            .create_identity("a@x.com", &credential, Profile::default())
            .await
            .unwrap();

        store.set_role("a@x.com", Role::Admin);

        let role = store
            .get_role(actor.actor_id, actor.organization_id)
            .await
            .unwrap();
        assert_eq!(role, Some(Role::Admin));
    }
}
