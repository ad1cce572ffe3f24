// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use super::{CredentialStore, CredentialStoreError};
use crate::db::models::{Identity, NewIdentity, NewSession, Session};

/// Credential store kept in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    identities: DashMap<Uuid, Identity>,
    by_email: DashMap<String, Uuid>,
    sessions: DashMap<Uuid, Session>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn set_disabled(&self, id: Uuid, disabled: bool) {
        if let Some(mut identity) = self.identities.get_mut(&id) {
            identity.disabled = disabled;
        }
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}

fn into_session(session: NewSession) -> Session {
    Session {
        id: session.id,
        identity_id: session.identity_id,
        created_at: Utc::now(),
        expires_at: session.expires_at,
        user_agent: session.user_agent,
        ip_address: session.ip_address,
        session_token: session.session_token,
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert_identity(
        &self,
        identity: NewIdentity,
    ) -> Result<Identity, CredentialStoreError> {
        match self.by_email.entry(identity.email.clone()) {
            Entry::Occupied(_) => Err(CredentialStoreError::EmailTaken),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let stored = Identity {
                    id: identity.id,
                    email: identity.email,
                    password_hash: identity.password_hash,
                    email_verified_at: None,
                    disabled: false,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(stored.id);
                self.identities.insert(stored.id, stored.clone());
                Ok(stored)
            }
        }
    }

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, CredentialStoreError> {
        Ok(self.identities.get(&id).map(|i| i.clone()))
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, CredentialStoreError> {
        let Some(id) = self.by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.get_identity(id).await
    }

    async fn delete_identity(&self, id: Uuid) -> Result<bool, CredentialStoreError> {
        let Some((_, identity)) = self.identities.remove(&id) else {
            return Ok(false);
        };
        self.by_email.remove(&identity.email);
        self.sessions.retain(|_, s| s.identity_id != id);
        Ok(true)
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, CredentialStoreError> {
        Ok(self
            .identities
            .get_mut(&id)
            .map(|mut identity| {
                identity.email_verified_at = Some(at);
                identity.updated_at = at;
            })
            .is_some())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, CredentialStoreError> {
        Ok(self
            .identities
            .get_mut(&id)
            .map(|mut identity| {
                identity.password_hash = hash.to_string();
                identity.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, CredentialStoreError> {
        let session = into_session(session);
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        identity_id: Uuid,
        current_token: &str,
        replacement: NewSession,
    ) -> Result<Option<Session>, CredentialStoreError> {
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        if session.identity_id != identity_id
            || session.session_token != current_token
            || session.expires_at <= Utc::now()
        {
            return Ok(None);
        }
        session.session_token = replacement.session_token;
        session.expires_at = replacement.expires_at;
        session.user_agent = replacement.user_agent;
        session.ip_address = replacement.ip_address;
        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool, CredentialStoreError> {
        Ok(self.sessions.remove(&session_id).is_some())
    }

    async fn delete_sessions_of(&self, identity_id: Uuid) -> Result<usize, CredentialStoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.identity_id != identity_id);
        Ok(before - self.sessions.len())
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, CredentialStoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        Ok(before - self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_identity_frees_email() {
        let store = MemoryCredentialStore::new();
        let identity = store
            .insert_identity(NewIdentity {
                id: Uuid::now_v7(),
                email: "a@example.org".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        assert!(store.delete_identity(identity.id).await.unwrap());
        assert!(
            store
                .find_identity_by_email("a@example.org")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.identity_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let store = MemoryCredentialStore::new();
        let now = Utc::now();
        let session = |expires_at| NewSession {
            id: Uuid::now_v7(),
            identity_id: Uuid::now_v7(),
            expires_at,
            user_agent: None,
            ip_address: None,
            session_token: Uuid::now_v7().to_string(),
        };
        store
            .insert_session(session(now - chrono::Duration::minutes(1)))
            .await
            .unwrap();
        let live = store
            .insert_session(session(now + chrono::Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 1);
        assert_eq!(store.session_count(), 1);
        assert!(store.sessions.contains_key(&live.id));
    }
}
