// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use juniper::GraphQLObject;
use thiserror::Error;

const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),
    #[error("Environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Regional branding shown by the front end.
#[derive(GraphQLObject, Debug, Clone, PartialEq)]
pub struct Branding {
    pub state_name: String,
    pub state_abbreviation: String,
    pub region_name: String,
    pub organization_name: String,
    pub organization_location: String,
    pub organization_website: String,
    pub organization_email: String,
    pub contact_email: String,
    pub support_email: Option<String>,
    pub app_name: String,
    pub app_description: String,
    pub deployment_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub signing_key_file: PathBuf,
    pub upload_dir: PathBuf,
    pub upload_public_url: String,
    pub upload_timeout: Duration,
    pub smtp: Option<SmtpConfig>,
    pub branding: Branding,
}

impl AppConfig {
    /// Reads the configuration from the process environment, after loading
    /// `.env` if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let listen_addr = match var("LISTEN_ADDR") {
            Some(addr) => addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 0], 3000)),
        };
        let upload_timeout = match var("UPLOAD_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse().map_err(
                |e: std::num::ParseIntError| ConfigError::Invalid {
                    name: "UPLOAD_TIMEOUT_SECS",
                    reason: e.to_string(),
                },
            )?),
            None => Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        };

        let smtp = match (
            var("EMAIL_SMTP_SERVER"),
            var("EMAIL_SMTP_USERNAME"),
            var("EMAIL_SMTP_PASSWORD"),
            var("EMAIL_FROM_ADDRESS"),
        ) {
            (Some(server), Some(username), Some(password), Some(from_address)) => {
                Some(SmtpConfig {
                    server,
                    username,
                    password,
                    from_address,
                })
            }
            _ => None,
        };

        let state_name = var("STATE_NAME").unwrap_or_else(|| "Oregon".to_string());
        let organization_email =
            var("ORG_EMAIL").unwrap_or_else(|| "revampedrobotics@gmail.com".to_string());
        let branding = Branding {
            state_abbreviation: var("STATE_ABBREVIATION").unwrap_or_else(|| "OR".to_string()),
            region_name: var("REGION_NAME").unwrap_or_else(|| state_name.clone()),
            organization_name: var("ORG_NAME").unwrap_or_else(|| "FTC12808 RevAmped".to_string()),
            organization_location: var("ORG_LOCATION")
                .unwrap_or_else(|| "Portland, Oregon".to_string()),
            organization_website: var("ORG_WEBSITE")
                .unwrap_or_else(|| "https://revampedrobotics.org".to_string()),
            contact_email: var("CONTACT_EMAIL").unwrap_or_else(|| organization_email.clone()),
            support_email: var("SUPPORT_EMAIL"),
            app_name: var("APP_NAME").unwrap_or_else(|| format!("FIRST TeamMatch {state_name}")),
            app_description: var("APP_DESCRIPTION").unwrap_or_else(|| {
                format!(
                    "Connecting passionate students with competitive FIRST robotics teams in {state_name}."
                )
            }),
            deployment_url: var("DEPLOYMENT_URL"),
            organization_email,
            state_name,
        };

        Ok(Self {
            database_url,
            listen_addr,
            signing_key_file: var("SIGNING_KEY_FILE")
                .unwrap_or_else(|| "key.json".to_string())
                .into(),
            upload_dir: var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()).into(),
            upload_public_url: var("UPLOAD_PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:8080/uploads".to_string()),
            upload_timeout,
            smtp,
            branding,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_database_url_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/tm")]))
                .unwrap();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.upload_timeout, Duration::from_secs(30));
        assert!(config.smtp.is_none());
        assert_eq!(config.branding.app_name, "FIRST TeamMatch Oregon");
        assert_eq!(config.branding.region_name, "Oregon");
        assert_eq!(config.branding.contact_email, config.branding.organization_email);
    }

    #[test]
    fn test_branding_falls_back_to_state() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tm"),
            ("STATE_NAME", "Washington"),
            ("ORG_EMAIL", "team@example.org"),
        ]))
        .unwrap();
        assert_eq!(config.branding.app_name, "FIRST TeamMatch Washington");
        assert_eq!(config.branding.region_name, "Washington");
        assert_eq!(config.branding.contact_email, "team@example.org");
        assert!(config.branding.app_description.ends_with("in Washington."));
    }

    #[test]
    fn test_smtp_needs_all_variables() {
        let partial = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tm"),
            ("EMAIL_SMTP_SERVER", "smtp.example.org"),
        ]))
        .unwrap();
        assert!(partial.smtp.is_none());

        let full = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tm"),
            ("EMAIL_SMTP_SERVER", "smtp.example.org"),
            ("EMAIL_SMTP_USERNAME", "mailer"),
            ("EMAIL_SMTP_PASSWORD", "hunter2"),
            ("EMAIL_FROM_ADDRESS", "TeamMatch <noreply@example.org>"),
        ]))
        .unwrap();
        assert_eq!(full.smtp.unwrap().server, "smtp.example.org");
    }

    #[test]
    fn test_invalid_timeout() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tm"),
            ("UPLOAD_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "UPLOAD_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
