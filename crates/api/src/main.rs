// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{convert::Infallible, error::Error, net::IpAddr, sync::Arc};

use diesel::Connection;
use hyper::{Method, Response, StatusCode, service::service_fn};
use hyper_util::rt::{TokioExecutor, TokioIo};
use juniper_hyper::{graphiql, graphql, playground};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use teammatch_api::{
    auth::{ACCESS_AUDIENCE, AuthJwtPayload, load_or_generate_signing_key, parse_and_validate_jwt_for},
    config::AppConfig,
    db,
    graphql::{AuthenticatedUser, BaseContext, Context, Schema, Services, schema},
    identity::{LocalIdentityProvider, PgCredentialStore},
    mailer::{LogMailer, Mailer, SmtpMailer},
    matching::MatchingEngine,
    registration::RegistrationService,
    store::PgProfileStore,
    uploads::FsObjectStore,
};

const DEFAULT_LINK_BASE_URL: &str = "http://localhost:3000";

fn is_private(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_loopback(),
        IpAddr::V6(ipv6) => ipv6.is_unique_local() || ipv6.is_loopback(),
    }
}

/// The first public address in `X-Forwarded-For`, trusted only when the
/// connection itself comes from a private network.
fn client_ip(remote_ip: IpAddr, forwarded_for: Option<&str>) -> IpAddr {
    if !is_private(&remote_ip) {
        return remote_ip;
    }
    forwarded_for
        .into_iter()
        .flat_map(|xff| xff.split(','))
        .filter_map(|ip_str| ip_str.trim().parse::<IpAddr>().ok())
        .find(|ip| !is_private(ip))
        .unwrap_or(remote_ip)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    let signing_key = load_or_generate_signing_key(&config.signing_key_file)?;

    {
        let mut pg_connection = diesel::pg::PgConnection::establish(&config.database_url)
            .expect("Failed to connect to database for migrations");
        db::run_migrations(&mut pg_connection).expect("Failed to run database migrations");
    }
    let pool = db::connect_pool(&config.database_url)
        .await
        .expect("Failed to create DB connection pool");

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!(
                "SMTP is not configured; verification and reset emails will only be logged!"
            );
            Arc::new(LogMailer)
        }
    };
    let identity = Arc::new(LocalIdentityProvider::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        mailer,
        signing_key.clone(),
        config
            .branding
            .deployment_url
            .clone()
            .unwrap_or_else(|| DEFAULT_LINK_BASE_URL.to_string()),
        config.branding.app_name.clone(),
    ));
    let profiles = Arc::new(PgProfileStore::new(pool));
    let objects = Arc::new(FsObjectStore::new(
        config.upload_dir.clone(),
        config.upload_public_url.clone(),
    ));

    let ctx = BaseContext {
        services: Arc::new(Services {
            engine: MatchingEngine::new(profiles.clone()),
            registration: RegistrationService::new(
                identity.clone(),
                profiles,
                objects.clone(),
                config.upload_timeout,
            ),
            identity,
            objects,
            branding: config.branding.clone(),
        }),
        keypair: signing_key,
    };
    let root_node: Arc<Schema> = Arc::new(schema());

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!("Listening on http://{}", config.listen_addr);
    loop {
        let (stream, remote_addr) = listener.accept().await?;

        let io = TokioIo::new(stream);

        let root_node = root_node.clone();
        let ctx = ctx.clone();

        tokio::spawn(async move {
            if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection(
                    io,
                    service_fn(move |req| {
                        let root_node = root_node.clone();
                        let remote_ip = client_ip(
                            remote_addr.ip(),
                            req.headers()
                                .get("x-forwarded-for")
                                .and_then(|xff| xff.to_str().ok()),
                        );

                        let user_details = req
                            .headers()
                            .get("authorization")
                            .and_then(|auth_header| auth_header.to_str().ok())
                            .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
                            .and_then(|token| {
                                parse_and_validate_jwt_for::<AuthJwtPayload>(
                                    token,
                                    &ctx.keypair.verifying_key(),
                                    ACCESS_AUDIENCE,
                                )
                                .ok()
                            })
                            .map(|jwt| AuthenticatedUser {
                                identity_id: jwt.sub,
                                kind: jwt.custom_fields.kind,
                                email: jwt.custom_fields.email,
                            });

                        let ctx = Context::new(
                            ctx.clone(),
                            remote_ip,
                            req.headers()
                                .get("user-agent")
                                .and_then(|ua| ua.to_str().ok())
                                .unwrap_or("unknown")
                                .to_string(),
                            user_details,
                        );

                        async {
                            Ok::<_, Infallible>(match (req.method(), req.uri().path()) {
                                (&Method::GET, "/graphql") | (&Method::POST, "/graphql") => {
                                    graphql(root_node, Arc::new(ctx), req).await
                                }
                                (&Method::OPTIONS, "/graphql") => {
                                    let mut resp = Response::new(String::new());
                                    *resp.status_mut() = StatusCode::NO_CONTENT;
                                    resp
                                }
                                (&Method::GET, "/graphiql") => graphiql("/graphql", None).await,
                                (&Method::GET, "/playground") => playground("/graphql", None).await,
                                _ => {
                                    let mut resp = Response::new(String::new());
                                    *resp.status_mut() = StatusCode::NOT_FOUND;
                                    resp
                                }
                            })
                        }
                    }),
                )
                .await
            {
                tracing::error!("Error serving connection: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_only_trusted_from_private_peers() {
        let proxy: IpAddr = "10.0.0.2".parse().unwrap();
        let public: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(
            client_ip(proxy, Some("192.168.1.4, 203.0.113.9")),
            public
        );
        assert_eq!(client_ip(public, Some("198.51.100.1")), public);
        assert_eq!(client_ip(proxy, None), proxy);
    }
}
