// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::IpAddr, sync::Arc};

use juniper::{EmptySubscription, IntoFieldError};
pub use mutation::Mutation;
pub use query::Query;

use crate::{
    config::Branding,
    identity::{ClientInfo, IdentityProvider},
    matching::MatchingEngine,
    model::AccountKind,
    registration::RegistrationService,
    uploads::ObjectStore,
};

mod handlers;
mod mutation;
mod query;

/// Everything a request handler needs, shared by all connections.
pub struct Services {
    pub engine: MatchingEngine,
    pub registration: RegistrationService,
    pub identity: Arc<dyn IdentityProvider>,
    pub objects: Arc<dyn ObjectStore>,
    pub branding: Branding,
}

#[derive(Clone)]
pub struct BaseContext {
    pub services: Arc<Services>,
    pub keypair: ed25519_dalek::SigningKey,
}

pub struct Context {
    base: BaseContext,
    ip: IpAddr,
    user_agent: String,
    user: Option<AuthenticatedUser>,
}

impl juniper::Context for Context {}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity_id: uuid::Uuid,
    pub kind: AccountKind,
    pub email: String,
}

impl Context {
    pub fn new(
        base: BaseContext,
        ip: IpAddr,
        user_agent: String,
        user_details: Option<AuthenticatedUser>,
    ) -> Self {
        Self {
            base,
            ip,
            user_agent,
            user: user_details,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn kind(&self) -> Option<AccountKind> {
        self.user.as_ref().map(|u| u.kind)
    }

    pub fn require_admin(&self) -> juniper::FieldResult<()> {
        match self.kind() {
            Some(AccountKind::Admin) => Ok(()),
            _ => Err(juniper::FieldError::new(
                "Insufficient permissions",
                juniper::Value::null(),
            )),
        }
    }

    pub fn require_authentication(&self) -> juniper::FieldResult<AuthenticatedUser> {
        if let Some(user) = &self.user {
            Ok(user.clone())
        } else {
            Err(juniper::FieldError::new(
                "Authentication required",
                juniper::Value::null(),
            ))
        }
    }

    /// Admins, or the identity that owns `id`.
    pub fn require_admin_or_owner(&self, id: uuid::Uuid) -> juniper::FieldResult<()> {
        match &self.user {
            Some(user) if user.kind == AccountKind::Admin || user.identity_id == id => Ok(()),
            _ => Err(juniper::FieldError::new(
                "Insufficient permissions",
                juniper::Value::null(),
            )),
        }
    }

    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            ip: self.ip,
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn get_signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.base.keypair
    }

    pub fn services(&self) -> &Services {
        &self.base.services
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.base.services.engine
    }
}

pub type Schema = juniper::RootNode<Query, Mutation, EmptySubscription<Context>>;

pub fn schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

/// Converts domain results into field errors that keep the error code and
/// the per-field violations.
pub(crate) trait OrFieldError<T> {
    fn or_field_error(self) -> juniper::FieldResult<T>;
}

impl<T, E: Into<crate::error::Error>> OrFieldError<T> for Result<T, E> {
    fn or_field_error(self) -> juniper::FieldResult<T> {
        self.map_err(|e| Into::<crate::error::Error>::into(e).into_field_error())
    }
}

pub(crate) fn parse_id(id: &str) -> juniper::FieldResult<uuid::Uuid> {
    uuid::Uuid::parse_str(id).map_err(|_| {
        juniper::FieldError::new(format!("Invalid id: {id}"), juniper::Value::null())
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        identity::{
            MemoryCredentialStore,
            testing::{TEST_KEY, harness},
        },
        store::MemoryProfileStore,
        uploads::MemoryObjectStore,
    };

    pub struct TestApp {
        pub base: BaseContext,
        pub store: Arc<MemoryProfileStore>,
        pub credentials: Arc<MemoryCredentialStore>,
        pub outbox: Arc<crate::mailer::OutboxMailer>,
    }

    pub fn app() -> TestApp {
        let identity = harness();
        let store = Arc::new(MemoryProfileStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let branding = AppConfig::from_lookup(|name| {
            (name == "DATABASE_URL").then(|| "postgres://localhost/test".to_string())
        })
        .map(|c| c.branding)
        .expect("default config");
        let services = Services {
            engine: MatchingEngine::new(store.clone()),
            registration: RegistrationService::new(
                identity.provider.clone(),
                store.clone(),
                objects.clone(),
                Duration::from_secs(30),
            ),
            identity: identity.provider.clone(),
            objects,
            branding,
        };
        TestApp {
            base: BaseContext {
                services: Arc::new(services),
                keypair: ed25519_dalek::SigningKey::from_bytes(&TEST_KEY),
            },
            store,
            credentials: identity.credentials,
            outbox: identity.outbox,
        }
    }

    impl TestApp {
        pub fn context(&self, user: Option<AuthenticatedUser>) -> Context {
            Context::new(
                self.base.clone(),
                IpAddr::from([127, 0, 0, 1]),
                "test".to_string(),
                user,
            )
        }

        pub fn as_kind(&self, kind: AccountKind, id: uuid::Uuid) -> Context {
            self.context(Some(AuthenticatedUser {
                identity_id: id,
                kind,
                email: "someone@example.org".to_string(),
            }))
        }
    }
}
