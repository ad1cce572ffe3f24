// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::{CredentialStore, CredentialStoreError};
use crate::db::{
    DbPool,
    models::{Identity, NewIdentity, NewSession, Session},
    schema::{identities, sessions},
};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn get_db_conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, AsyncPgConnection>,
        CredentialStoreError,
    > {
        self.pool
            .get()
            .await
            .map_err(|e| CredentialStoreError::Pool(e.to_string()))
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert_identity(
        &self,
        identity: NewIdentity,
    ) -> Result<Identity, CredentialStoreError> {
        diesel::insert_into(identities::table)
            .values(&identity)
            .returning(Identity::as_returning())
            .get_result(&mut self.get_db_conn().await?)
            .await
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    CredentialStoreError::EmailTaken
                }
                other => other.into(),
            })
    }

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, CredentialStoreError> {
        Ok(identities::table
            .find(id)
            .select(Identity::as_select())
            .first(&mut self.get_db_conn().await?)
            .await
            .optional()?)
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, CredentialStoreError> {
        Ok(identities::table
            .filter(identities::email.eq(email))
            .select(Identity::as_select())
            .first(&mut self.get_db_conn().await?)
            .await
            .optional()?)
    }

    async fn delete_identity(&self, id: Uuid) -> Result<bool, CredentialStoreError> {
        let deleted = diesel::delete(identities::table.find(id))
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(deleted > 0)
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, CredentialStoreError> {
        let updated = diesel::update(identities::table.find(id))
            .set((
                identities::email_verified_at.eq(Some(at)),
                identities::updated_at.eq(at),
            ))
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(updated > 0)
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, CredentialStoreError> {
        let updated = diesel::update(identities::table.find(id))
            .set((
                identities::password_hash.eq(hash),
                identities::updated_at.eq(Utc::now()),
            ))
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(updated > 0)
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, CredentialStoreError> {
        Ok(diesel::insert_into(sessions::table)
            .values(&session)
            .returning(Session::as_returning())
            .get_result(&mut self.get_db_conn().await?)
            .await?)
    }

    async fn rotate_session(
        &self,
        session_id: Uuid,
        identity_id: Uuid,
        current_token: &str,
        replacement: NewSession,
    ) -> Result<Option<Session>, CredentialStoreError> {
        Ok(diesel::update(
            sessions::table
                .filter(sessions::id.eq(session_id))
                .filter(sessions::identity_id.eq(identity_id))
                .filter(sessions::session_token.eq(current_token))
                .filter(sessions::expires_at.gt(Utc::now())),
        )
        .set((
            sessions::session_token.eq(replacement.session_token),
            sessions::expires_at.eq(replacement.expires_at),
            sessions::user_agent.eq(replacement.user_agent),
            sessions::ip_address.eq(replacement.ip_address),
        ))
        .returning(Session::as_returning())
        .get_result(&mut self.get_db_conn().await?)
        .await
        .optional()?)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool, CredentialStoreError> {
        let deleted = diesel::delete(sessions::table.find(session_id))
            .execute(&mut self.get_db_conn().await?)
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_sessions_of(&self, identity_id: Uuid) -> Result<usize, CredentialStoreError> {
        Ok(
            diesel::delete(sessions::table.filter(sessions::identity_id.eq(identity_id)))
                .execute(&mut self.get_db_conn().await?)
                .await?,
        )
    }

    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, CredentialStoreError> {
        Ok(
            diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
                .execute(&mut self.get_db_conn().await?)
                .await?,
        )
    }
}
