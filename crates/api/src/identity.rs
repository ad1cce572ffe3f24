// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity provider: credentials, email verification, password resets and
//! refresh sessions.

use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString},
};
use base64::prelude::*;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use rand_core::OsRng;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::{
        JwtPayload, LinkJwtPayload, PASSWORD_RESET_AUDIENCE, REFRESH_AUDIENCE, RefreshJwtPayload,
        VERIFY_EMAIL_AUDIENCE, generate_jwt, parse_and_validate_jwt_for,
    },
    db::models::{Identity, NewIdentity, NewSession},
    mailer::{MailError, Mailer, OutgoingMail},
    validation::{is_strong_password, is_well_formed_email},
};

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

pub const SESSION_LIFETIME: chrono::Duration = chrono::Duration::days(7);
const LINK_LIFETIME: Duration = Duration::from_secs(60 * 60);
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(10 * 60);
const MAX_MAILS_PER_WINDOW: u32 = 3;
const MAX_LOGINS_PER_WINDOW: u32 = 10;

#[derive(Error, Debug)]
pub enum CredentialStoreError {
    #[error("An identity with this email already exists")]
    EmailTaken,
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Failed to get a database connection: {0}")]
    Pool(String),
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailTaken,
    #[error("password does not meet the policy")]
    WeakPassword,
    #[error("malformed email address")]
    InvalidEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity is disabled")]
    Disabled,
    #[error("rate limited")]
    RateLimited,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("mail delivery failed: {0}")]
    Mail(#[from] MailError),
    #[error("identity backend failure: {0}")]
    Backend(String),
}

impl IdentityError {
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::EmailTaken => "EMAIL_TAKEN",
            IdentityError::WeakPassword => "WEAK_PASSWORD",
            IdentityError::InvalidEmail => "INVALID_EMAIL",
            IdentityError::InvalidCredentials => "INVALID_CREDENTIALS",
            IdentityError::Disabled => "ACCOUNT_DISABLED",
            IdentityError::RateLimited => "RATE_LIMITED",
            IdentityError::InvalidToken => "INVALID_TOKEN",
            IdentityError::Mail(_) => "MAIL_FAILED",
            IdentityError::Backend(_) => "IDENTITY_UNAVAILABLE",
        }
    }

    /// The fixed message shown to the person filling in the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            IdentityError::EmailTaken => "This email is already registered. Please sign in instead.",
            IdentityError::WeakPassword => "Password is too weak. Please use a stronger password.",
            IdentityError::InvalidEmail => {
                "Invalid email address. Please check your email and try again."
            }
            IdentityError::InvalidCredentials => "Incorrect email or password. Please try again.",
            IdentityError::Disabled => "This account has been disabled. Please contact support.",
            IdentityError::RateLimited => {
                "Too many requests. Please wait a few minutes before trying again."
            }
            IdentityError::InvalidToken => {
                "This link is invalid or has expired. Please request a new one."
            }
            IdentityError::Mail(_) => "We could not send the email. Please try again later.",
            IdentityError::Backend(_) => "Something went wrong. Please try again later.",
        }
    }
}

impl From<CredentialStoreError> for IdentityError {
    fn from(e: CredentialStoreError) -> Self {
        match e {
            CredentialStoreError::EmailTaken => IdentityError::EmailTaken,
            other => {
                tracing::error!("Credential store failure: {other}");
                IdentityError::Backend(other.to_string())
            }
        }
    }
}

impl From<argon2::password_hash::Error> for IdentityError {
    fn from(e: argon2::password_hash::Error) -> Self {
        IdentityError::Backend(format!("password hashing failed: {e}"))
    }
}

impl From<crate::auth::JwtGenerationError> for IdentityError {
    fn from(e: crate::auth::JwtGenerationError) -> Self {
        IdentityError::Backend(e.to_string())
    }
}

/// Persistence for identities and their refresh sessions.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert_identity(&self, identity: NewIdentity)
    -> Result<Identity, CredentialStoreError>;
    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, CredentialStoreError>;
    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, CredentialStoreError>;
    async fn delete_identity(&self, id: Uuid) -> Result<bool, CredentialStoreError>;
    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, CredentialStoreError>;
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<bool, CredentialStoreError>;

    async fn insert_session(
        &self,
        session: NewSession,
    ) -> Result<crate::db::models::Session, CredentialStoreError>;
    /// Replaces the token of an unexpired session, but only if it still
    /// carries `current_token`.
    async fn rotate_session(
        &self,
        session_id: Uuid,
        identity_id: Uuid,
        current_token: &str,
        replacement: NewSession,
    ) -> Result<Option<crate::db::models::Session>, CredentialStoreError>;
    async fn delete_session(&self, session_id: Uuid) -> Result<bool, CredentialStoreError>;
    async fn delete_sessions_of(&self, identity_id: Uuid) -> Result<usize, CredentialStoreError>;
    async fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, CredentialStoreError>;
}

/// Where a session request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: IpAddr,
    pub user_agent: String,
}

impl ClientInfo {
    fn ip_net(&self) -> Option<ipnet::IpNet> {
        let prefix = match self.ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        ipnet::IpNet::new(self.ip, prefix).ok()
    }
}

/// A refresh session handed to a signed-in client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: Uuid,
    pub identity_id: Uuid,
    pub email: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Uuid, IdentityError>;
    async fn verify_credentials(&self, email: &str, password: &str)
    -> Result<Uuid, IdentityError>;
    /// Compensating action for a failed registration.
    async fn delete_identity(&self, id: Uuid) -> Result<(), IdentityError>;
    async fn send_verification_email(&self, id: Uuid) -> Result<(), IdentityError>;
    async fn confirm_email(&self, token: &str) -> Result<Uuid, IdentityError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), IdentityError>;
    async fn open_session(
        &self,
        identity_id: Uuid,
        client: &ClientInfo,
    ) -> Result<IssuedSession, IdentityError>;
    async fn refresh_session(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<IssuedSession, IdentityError>;
    async fn destroy_session(&self, session_id: Uuid) -> Result<(), IdentityError>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}


/// Identity provider backed by a [`CredentialStore`], mailing links through
/// a [`Mailer`].
pub struct LocalIdentityProvider {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
    signing_key: SigningKey,
    link_base_url: String,
    app_name: String,
    rate_limits: moka::future::Cache<String, (Instant, u32)>,
}

impl LocalIdentityProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
        signing_key: SigningKey,
        link_base_url: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            signing_key,
            link_base_url: link_base_url.into().trim_end_matches('/').to_string(),
            app_name: app_name.into(),
            rate_limits: moka::future::Cache::builder()
                .time_to_live(RATE_LIMIT_WINDOW)
                .max_capacity(100_000)
                .build(),
        }
    }

    async fn check_rate_limit(&self, key: String, limit: u32) -> Result<(), IdentityError> {
        let now = Instant::now();
        let (window_start, count) = match self.rate_limits.get(&key).await {
            Some((start, count)) if now.duration_since(start) < RATE_LIMIT_WINDOW => {
                (start, count)
            }
            _ => (now, 0),
        };
        if count >= limit {
            tracing::warn!(key = %key, "Rate limit reached");
            return Err(IdentityError::RateLimited);
        }
        self.rate_limits.insert(key, (window_start, count + 1)).await;
        Ok(())
    }

    fn link_token(
        &self,
        identity_id: Uuid,
        audience: &str,
        stamp: String,
    ) -> Result<String, IdentityError> {
        Ok(generate_jwt(
            &JwtPayload::new_with_duration(
                identity_id,
                vec![audience.to_string()],
                LinkJwtPayload { stamp },
                LINK_LIFETIME,
            ),
            &self.signing_key,
        )?)
    }

    // Binds a reset link to the password it was issued for, so it stops
    // working once the password changes. Keyed so the payload reveals
    // nothing about the hash.
    fn password_stamp(&self, password_hash: &str) -> String {
        let mut message = PASSWORD_RESET_AUDIENCE.as_bytes().to_vec();
        message.extend_from_slice(password_hash.as_bytes());
        BASE64_URL_SAFE_NO_PAD.encode(self.signing_key.sign(&message).to_bytes())
    }

    fn refresh_token(&self, session: &crate::db::models::Session) -> Result<String, IdentityError> {
        Ok(generate_jwt(
            &JwtPayload::new_with_exp_ts(
                session.identity_id,
                vec![REFRESH_AUDIENCE.to_string()],
                RefreshJwtPayload {
                    jti: session.session_token.clone(),
                    session_id: session.id,
                },
                session.expires_at.timestamp() as usize,
            ),
            &self.signing_key,
        )?)
    }

    fn new_session(identity_id: Uuid, client: &ClientInfo) -> NewSession {
        NewSession {
            id: Uuid::now_v7(),
            identity_id,
            expires_at: Utc::now() + SESSION_LIFETIME,
            user_agent: Some(client.user_agent.clone()),
            ip_address: client.ip_net(),
            session_token: Uuid::now_v7().to_string(),
        }
    }

    async fn issue(
        &self,
        session: crate::db::models::Session,
    ) -> Result<IssuedSession, IdentityError> {
        let identity = self
            .store
            .get_identity(session.identity_id)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        Ok(IssuedSession {
            refresh_token: self.refresh_token(&session)?,
            session_id: session.id,
            identity_id: session.identity_id,
            email: identity.email,
            expires_at: session.expires_at,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let email = normalize_email(email);
        if !is_well_formed_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        if !is_strong_password(password) {
            return Err(IdentityError::WeakPassword);
        }
        let identity = self
            .store
            .insert_identity(NewIdentity {
                id: Uuid::now_v7(),
                email,
                password_hash: hash_password(password)?,
            })
            .await?;
        tracing::info!(identity_id = %identity.id, "Created identity");
        Ok(identity.id)
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Uuid, IdentityError> {
        let email = normalize_email(email);
        if !is_well_formed_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        self.check_rate_limit(format!("login:{email}"), MAX_LOGINS_PER_WINDOW)
            .await?;
        let identity = self
            .store
            .find_identity_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        let parsed_hash = PasswordHash::new(&identity.password_hash)?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Err(IdentityError::InvalidCredentials);
        }
        if identity.disabled {
            return Err(IdentityError::Disabled);
        }
        Ok(identity.id)
    }

    async fn delete_identity(&self, id: Uuid) -> Result<(), IdentityError> {
        if self.store.delete_identity(id).await? {
            tracing::info!(identity_id = %id, "Deleted identity");
        }
        Ok(())
    }

    async fn send_verification_email(&self, id: Uuid) -> Result<(), IdentityError> {
        let identity = self
            .store
            .get_identity(id)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;
        if identity.email_verified_at.is_some() {
            return Ok(());
        }
        self.check_rate_limit(format!("mail:{}", identity.email), MAX_MAILS_PER_WINDOW)
            .await?;
        let token = self.link_token(id, VERIFY_EMAIL_AUDIENCE, identity.email.clone())?;
        self.mailer
            .send(OutgoingMail {
                to: identity.email,
                subject: format!("Verify your email for {}", self.app_name),
                body: format!(
                    "Welcome to {}!\n\nPlease confirm your email address by opening this link:\n{}/verify-email?token={token}\n\nThe link is valid for one hour.",
                    self.app_name, self.link_base_url
                ),
            })
            .await?;
        Ok(())
    }

    async fn confirm_email(&self, token: &str) -> Result<Uuid, IdentityError> {
        let payload = parse_and_validate_jwt_for::<LinkJwtPayload>(
            token,
            &self.signing_key.verifying_key(),
            VERIFY_EMAIL_AUDIENCE,
        )
        .map_err(|_| IdentityError::InvalidToken)?;
        let identity = self
            .store
            .get_identity(payload.sub)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if identity.email != payload.custom_fields.stamp {
            return Err(IdentityError::InvalidToken);
        }
        if identity.email_verified_at.is_none() {
            self.store.mark_email_verified(identity.id, Utc::now()).await?;
            tracing::info!(identity_id = %identity.id, "Email verified");
        }
        Ok(identity.id)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email);
        if !is_well_formed_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        self.check_rate_limit(format!("mail:{email}"), MAX_MAILS_PER_WINDOW)
            .await?;
        let Some(identity) = self.store.find_identity_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };
        let token = self.link_token(
            identity.id,
            PASSWORD_RESET_AUDIENCE,
            self.password_stamp(&identity.password_hash),
        )?;
        self.mailer
            .send(OutgoingMail {
                to: identity.email,
                subject: format!("Reset your {} password", self.app_name),
                body: format!(
                    "Someone asked to reset the password of your {} account.\n\nOpen this link to choose a new password:\n{}/reset-password?token={token}\n\nIf this was not you, you can ignore this email.",
                    self.app_name, self.link_base_url
                ),
            })
            .await?;
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), IdentityError> {
        let payload = parse_and_validate_jwt_for::<LinkJwtPayload>(
            token,
            &self.signing_key.verifying_key(),
            PASSWORD_RESET_AUDIENCE,
        )
        .map_err(|_| IdentityError::InvalidToken)?;
        if !is_strong_password(new_password) {
            return Err(IdentityError::WeakPassword);
        }
        let identity = self
            .store
            .get_identity(payload.sub)
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        if self.password_stamp(&identity.password_hash) != payload.custom_fields.stamp {
            return Err(IdentityError::InvalidToken);
        }
        self.store
            .set_password_hash(identity.id, &hash_password(new_password)?)
            .await?;
        let ended = self.store.delete_sessions_of(identity.id).await?;
        tracing::info!(identity_id = %identity.id, sessions = ended, "Password reset");
        Ok(())
    }

    async fn open_session(
        &self,
        identity_id: Uuid,
        client: &ClientInfo,
    ) -> Result<IssuedSession, IdentityError> {
        match self.store.delete_expired_sessions(Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Removed expired sessions"),
            Err(e) => tracing::warn!("Could not remove expired sessions: {e}"),
        }
        let session = self
            .store
            .insert_session(Self::new_session(identity_id, client))
            .await?;
        self.issue(session).await
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<IssuedSession, IdentityError> {
        let payload = parse_and_validate_jwt_for::<RefreshJwtPayload>(
            refresh_token,
            &self.signing_key.verifying_key(),
            REFRESH_AUDIENCE,
        )
        .map_err(|_| IdentityError::InvalidToken)?;
        let mut replacement = Self::new_session(payload.sub, client);
        replacement.id = payload.custom_fields.session_id;
        let session = self
            .store
            .rotate_session(
                payload.custom_fields.session_id,
                payload.sub,
                &payload.custom_fields.jti,
                replacement,
            )
            .await?
            .ok_or(IdentityError::InvalidToken)?;
        self.issue(session).await
    }

    async fn destroy_session(&self, session_id: Uuid) -> Result<(), IdentityError> {
        self.store.delete_session(session_id).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::mailer::OutboxMailer;

    pub const TEST_KEY: [u8; 32] = [7; 32];

    pub struct Harness {
        pub provider: Arc<LocalIdentityProvider>,
        pub credentials: Arc<MemoryCredentialStore>,
        pub outbox: Arc<OutboxMailer>,
    }

    pub fn harness() -> Harness {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        let provider = Arc::new(LocalIdentityProvider::new(
            credentials.clone(),
            outbox.clone(),
            SigningKey::from_bytes(&TEST_KEY),
            "https://teammatch.example.org/",
            "FIRST TeamMatch Oregon",
        ));
        Harness {
            provider,
            credentials,
            outbox,
        }
    }

    pub fn token_from(body: &str) -> String {
        body.split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    }

    pub fn client() -> ClientInfo {
        ClientInfo {
            ip: IpAddr::from([127, 0, 0, 1]),
            user_agent: "test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::*, *};

    const PASSWORD: &str = "Sprockets42";

    #[tokio::test]
    async fn test_create_identity_rules() {
        let h = harness();
        assert!(matches!(
            h.provider.create_identity("not-an-email", PASSWORD).await,
            Err(IdentityError::InvalidEmail)
        ));
        assert!(matches!(
            h.provider.create_identity("a@example.org", "weak").await,
            Err(IdentityError::WeakPassword)
        ));
        h.provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        assert!(matches!(
            h.provider.create_identity(" A@Example.org ", PASSWORD).await,
            Err(IdentityError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        assert_eq!(
            h.provider
                .verify_credentials("a@example.org", PASSWORD)
                .await
                .unwrap(),
            id
        );
        assert!(matches!(
            h.provider
                .verify_credentials("a@example.org", "Wrong1234")
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            h.provider
                .verify_credentials("b@example.org", PASSWORD)
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        h.credentials.set_disabled(id, true);
        assert!(matches!(
            h.provider
                .verify_credentials("a@example.org", PASSWORD)
                .await,
            Err(IdentityError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_email_verification_flow() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        h.provider.send_verification_email(id).await.unwrap();
        let sent = h.outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@example.org");
        let token = token_from(&sent[0].body);
        assert_eq!(h.provider.confirm_email(&token).await.unwrap(), id);
        let identity = h.credentials.get_identity(id).await.unwrap().unwrap();
        assert!(identity.email_verified_at.is_some());
        assert!(matches!(
            h.provider.confirm_email("garbage").await,
            Err(IdentityError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_verification_mail_is_rate_limited() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        for _ in 0..MAX_MAILS_PER_WINDOW {
            h.provider.send_verification_email(id).await.unwrap();
        }
        assert!(matches!(
            h.provider.send_verification_email(id).await,
            Err(IdentityError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_reset_of_unknown_email_is_silent() {
        let h = harness();
        h.provider
            .send_password_reset("nobody@example.org")
            .await
            .unwrap();
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_password_reset_ends_sessions_and_is_single_use() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        let session = h.provider.open_session(id, &client()).await.unwrap();
        h.provider
            .send_password_reset("a@example.org")
            .await
            .unwrap();
        let token = token_from(&h.outbox.sent()[0].body);

        h.provider
            .reset_password(&token, "NewGears2025")
            .await
            .unwrap();
        assert!(matches!(
            h.provider
                .refresh_session(&session.refresh_token, &client())
                .await,
            Err(IdentityError::InvalidToken)
        ));
        assert!(matches!(
            h.provider.reset_password(&token, "Another2025").await,
            Err(IdentityError::InvalidToken)
        ));
        assert_eq!(
            h.provider
                .verify_credentials("a@example.org", "NewGears2025")
                .await
                .unwrap(),
            id
        );
    }

    #[tokio::test]
    async fn test_reset_link_hides_password_hash() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        h.provider
            .send_password_reset("a@example.org")
            .await
            .unwrap();
        let token = token_from(&h.outbox.sent()[0].body);
        let payload = crate::auth::parse_and_validate_jwt_for::<LinkJwtPayload>(
            &token,
            &SigningKey::from_bytes(&TEST_KEY).verifying_key(),
            PASSWORD_RESET_AUDIENCE,
        )
        .unwrap();

        let hash = h.credentials.get_identity(id).await.unwrap().unwrap().password_hash;
        let tail = &hash[hash.len() - 16..];
        assert!(!payload.custom_fields.stamp.contains(tail));
        assert_eq!(payload.custom_fields.stamp, h.provider.password_stamp(&hash));

        let other_key = LocalIdentityProvider::new(
            h.credentials.clone(),
            h.outbox.clone(),
            SigningKey::from_bytes(&[9; 32]),
            "https://teammatch.example.org",
            "FIRST TeamMatch Oregon",
        );
        assert_ne!(other_key.password_stamp(&hash), payload.custom_fields.stamp);
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let h = harness();
        let id = h
            .provider
            .create_identity("a@example.org", PASSWORD)
            .await
            .unwrap();
        let first = h.provider.open_session(id, &client()).await.unwrap();
        let second = h
            .provider
            .refresh_session(&first.refresh_token, &client())
            .await
            .unwrap();
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.email, "a@example.org");
        assert!(matches!(
            h.provider
                .refresh_session(&first.refresh_token, &client())
                .await,
            Err(IdentityError::InvalidToken)
        ));
        h.provider.destroy_session(second.session_id).await.unwrap();
        assert!(matches!(
            h.provider
                .refresh_session(&second.refresh_token, &client())
                .await,
            Err(IdentityError::InvalidToken)
        ));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            IdentityError::EmailTaken.user_message(),
            "This email is already registered. Please sign in instead."
        );
        assert_eq!(IdentityError::RateLimited.code(), "RATE_LIMITED");
    }
}
