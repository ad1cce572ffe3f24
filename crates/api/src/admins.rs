// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Out-of-band admin account management, used by the `manage-admins` tool.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::models::{Identity, NewIdentity},
    identity::{CredentialStore, CredentialStoreError, IdentityError, hash_password, normalize_email},
    model::Admin,
    store::{ProfileStore, StoreError},
    validation::{is_strong_password, is_well_formed_email},
};

pub const DEFAULT_ROLE: &str = "admin";

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Credentials(#[from] CredentialStoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Identity {0} already owns a student or team profile")]
    ProfileConflict(Uuid),
    #[error("No admin matches {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

pub struct AdminProvisioner {
    credentials: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl AdminProvisioner {
    pub fn new(credentials: Arc<dyn CredentialStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            credentials,
            profiles,
        }
    }

    pub async fn list(&self) -> Result<Vec<Admin>, AdminError> {
        Ok(self.profiles.list_admins().await?)
    }

    /// Checks an account before anything is written. Returns the normalized
    /// email and the identity it already belongs to, if any.
    async fn check_account(
        &self,
        account: &AdminAccount,
    ) -> Result<(String, Option<Identity>), AdminError> {
        let email = normalize_email(&account.email);
        if !is_well_formed_email(&email) {
            return Err(IdentityError::InvalidEmail.into());
        }
        if !is_strong_password(&account.password) {
            return Err(IdentityError::WeakPassword.into());
        }
        let existing = self.credentials.find_identity_by_email(&email).await?;
        if let Some(identity) = &existing {
            if self.profiles.get_student(identity.id).await?.is_some()
                || self.profiles.get_team(identity.id).await?.is_some()
            {
                return Err(AdminError::ProfileConflict(identity.id));
            }
        }
        Ok((email, existing))
    }

    /// Creates an admin. An existing identity with the same email is reused
    /// and gets the new password.
    pub async fn create(&self, account: AdminAccount) -> Result<Admin, AdminError> {
        let (email, existing) = self.check_account(&account).await?;
        let password_hash = hash_password(&account.password)?;

        let id = match existing {
            Some(existing) => {
                self.credentials
                    .set_password_hash(existing.id, &password_hash)
                    .await?;
                tracing::info!(identity_id = %existing.id, "Reusing existing identity");
                existing.id
            }
            None => {
                self.credentials
                    .insert_identity(NewIdentity {
                        id: Uuid::now_v7(),
                        email: email.clone(),
                        password_hash,
                    })
                    .await?
                    .id
            }
        };
        self.credentials.mark_email_verified(id, Utc::now()).await?;

        let now = Utc::now();
        let created_at = self
            .profiles
            .get_admin(id)
            .await?
            .map_or(now, |admin| admin.created_at);
        let admin = Admin {
            id,
            email,
            name: account.name,
            role: account.role,
            created_at,
            updated_at: now,
        };
        self.profiles.put_admin(&admin).await?;
        tracing::info!(admin_id = %admin.id, "Admin saved");
        Ok(admin)
    }

    /// Removes the admin profile and its identity. `needle` is an id or an
    /// email address.
    pub async fn remove(&self, needle: &str) -> Result<Admin, AdminError> {
        let needle_email = normalize_email(needle);
        let admin = match Uuid::parse_str(needle) {
            Ok(id) => self.profiles.get_admin(id).await?,
            Err(_) => self
                .profiles
                .list_admins()
                .await?
                .into_iter()
                .find(|admin| admin.email == needle_email),
        }
        .ok_or_else(|| AdminError::NotFound(needle.to_string()))?;

        self.profiles.delete_admin(admin.id).await?;
        if !self.credentials.delete_identity(admin.id).await? {
            tracing::info!(admin_id = %admin.id, "Admin had no identity left");
        }
        Ok(admin)
    }

    /// Removes every admin, then creates `account` as the only one.
    pub async fn replace_all(&self, account: AdminAccount) -> Result<(Vec<Admin>, Admin), AdminError> {
        let (new_email, _) = self.check_account(&account).await?;
        let mut removed = Vec::new();
        for admin in self.list().await? {
            self.profiles.delete_admin(admin.id).await?;
            // The replacement keeps its identity so existing links stay valid.
            if admin.email != new_email {
                self.credentials.delete_identity(admin.id).await?;
            }
            removed.push(admin);
        }
        let created = self.create(account).await?;
        Ok((removed, created))
    }
}
