// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compact EdDSA-signed JWTs for sessions and emailed links.

use std::{path::Path, time::Duration};

use base64::prelude::*;
use ed25519_dalek::{
    Signature, SignatureError, SigningKey, Verifier, VerifyingKey, ed25519::signature::Signer,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::model::AccountKind;

pub const ACCESS_AUDIENCE: &str = "teammatch";
pub const REFRESH_AUDIENCE: &str = "teammatch-refresh";
pub const VERIFY_EMAIL_AUDIENCE: &str = "teammatch-verify-email";
pub const PASSWORD_RESET_AUDIENCE: &str = "teammatch-password-reset";

#[derive(Serialize, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

#[derive(Serialize, Deserialize)]
#[serde(bound = "Inner: Serialize + DeserializeOwned")]
pub struct JwtPayload<Inner: DeserializeOwned> {
    #[serde(flatten)]
    pub custom_fields: Inner,
    pub sub: uuid::Uuid,
    #[serde(default)]
    pub aud: Vec<String>,
    exp: usize,
    iat: usize,
    nbf: usize,
}

impl<Inner: DeserializeOwned> JwtPayload<Inner> {
    pub fn new_with_duration(
        sub: uuid::Uuid,
        aud: Vec<String>,
        custom_fields: Inner,
        valid_duration: Duration,
    ) -> Self {
        let current_time = chrono::Utc::now().timestamp() as usize;
        Self {
            sub,
            aud,
            custom_fields,
            iat: current_time,
            nbf: current_time,
            exp: current_time + valid_duration.as_secs() as usize,
        }
    }

    pub fn new_with_exp_ts(
        sub: uuid::Uuid,
        aud: Vec<String>,
        custom_fields: Inner,
        expires_at: usize,
    ) -> Self {
        let current_time = chrono::Utc::now().timestamp() as usize;
        Self {
            sub,
            aud,
            custom_fields,
            iat: current_time,
            nbf: current_time,
            exp: expires_at,
        }
    }

    pub fn is_valid_now(&self) -> bool {
        let current_time = chrono::Utc::now().timestamp() as usize;
        current_time >= self.nbf && current_time <= self.exp
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.aud.iter().any(|a| a == audience)
    }
}

#[derive(Serialize, Deserialize)]
pub struct AuthJwtPayload {
    pub kind: AccountKind,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
pub struct RefreshJwtPayload {
    pub jti: String,
    pub session_id: uuid::Uuid,
}

/// Payload of a single-purpose link token (email verification, password
/// reset). `stamp` ties the token to the credential state it was issued for.
#[derive(Serialize, Deserialize)]
pub struct LinkJwtPayload {
    pub stamp: String,
}

#[derive(Error, Debug)]
pub enum JwtValidationError {
    #[error("Invalid JWT format")]
    InvalidFormat,
    #[error("Base64 decoding error: {0}")]
    Base64DecodingError(#[from] base64::DecodeError),
    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Invalid JWT signature: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("JWT parsing error: {0}")]
    ParsingError(#[from] serde_json::Error),
    #[error("JWT is not valid at the current time")]
    InvalidTime,
    #[error("JWT is not intended for {0}")]
    WrongAudience(&'static str),
}

#[derive(Error, Debug)]
pub enum JwtGenerationError {
    #[error("JWT signing error: {0}")]
    SigningError(#[from] SignatureError),
    #[error("JWT serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Validate a JWT and its signature
fn validate_jwt(token: &str, verifying_key: &VerifyingKey) -> Result<(), JwtValidationError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(JwtValidationError::InvalidFormat);
    }
    let header_segment = segments[0];
    let payload_segment = segments[1];
    let signature_segment = segments[2];

    let decoded_header = BASE64_URL_SAFE.decode(header_segment)?;
    let header = serde_json::from_slice::<JwtHeader>(&decoded_header)?;
    if header.alg != "EdDSA" {
        return Err(JwtValidationError::UnsupportedAlgorithm(header.alg));
    }

    let signature_bytes = BASE64_URL_SAFE.decode(signature_segment)?;
    let signature = Signature::from_slice(&signature_bytes)?;
    let signed_data = format!("{}.{}", header_segment, payload_segment);
    verifying_key.verify(signed_data.as_bytes(), &signature)?;
    Ok(())
}

pub fn parse_and_validate_jwt<T: DeserializeOwned + Serialize>(
    token: &str,
    verifying_key: &VerifyingKey,
) -> Result<JwtPayload<T>, JwtValidationError> {
    validate_jwt(token, verifying_key)?;

    let segments: Vec<&str> = token.split('.').collect();
    let payload_segment = segments[1];

    let decoded_payload = BASE64_URL_SAFE.decode(payload_segment)?;
    let payload: JwtPayload<T> = serde_json::from_slice(&decoded_payload)?;

    if !payload.is_valid_now() {
        return Err(JwtValidationError::InvalidTime);
    }

    Ok(payload)
}

/// Like [`parse_and_validate_jwt`], but also requires `audience`.
pub fn parse_and_validate_jwt_for<T: DeserializeOwned + Serialize>(
    token: &str,
    verifying_key: &VerifyingKey,
    audience: &'static str,
) -> Result<JwtPayload<T>, JwtValidationError> {
    let payload = parse_and_validate_jwt::<T>(token, verifying_key)?;
    if !payload.has_audience(audience) {
        return Err(JwtValidationError::WrongAudience(audience));
    }
    Ok(payload)
}

pub fn generate_jwt<T: Serialize>(
    payload: &T,
    signing_key: &SigningKey,
) -> Result<String, JwtGenerationError> {
    let header = JwtHeader {
        alg: "EdDSA".to_string(),
        typ: "JWT".to_string(),
    };
    let header_json = serde_json::to_vec(&header)?;
    let payload_json = serde_json::to_vec(payload)?;

    let header_segment = BASE64_URL_SAFE.encode(header_json);
    let payload_segment = BASE64_URL_SAFE.encode(payload_json);
    let signing_input = format!("{}.{}", header_segment, payload_segment);

    let signature: Signature = signing_key.try_sign(signing_input.as_bytes())?;
    let signature_segment = BASE64_URL_SAFE.encode(signature.to_bytes());

    Ok(format!(
        "{}.{}.{}",
        header_segment, payload_segment, signature_segment
    ))
}

#[derive(Error, Debug)]
pub enum SigningKeyError {
    #[error("Could not access key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Key file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Loads the signing key from `path`, generating and saving a fresh one on
/// first start.
pub fn load_or_generate_signing_key(path: &Path) -> Result<SigningKey, SigningKeyError> {
    if !path.exists() {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        std::fs::write(path, serde_json::to_string_pretty(&signing_key)?)?;
        tracing::info!("Generated new signing key and saved to {}", path.display());
    }
    let keypair_json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&keypair_json)?)
}
