use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// Why a presented token was rejected. The resolver collapses every
/// variant into the same credential failure before it reaches the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature invalid")]
    InvalidSignature,
    #[error("token carries no subject")]
    MissingSubject,
    #[error("token malformed")]
    Malformed,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    exp: i64,
}

/// Signs and checks access tokens with a shared HMAC secret.
pub struct TokenCodec {
    header: Header,
    validation: Validation,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let algorithm: Algorithm = config
            .algorithm
            .parse()
            .map_err(|e| anyhow::anyhow!("Unknown signing algorithm {}: {e}", config.algorithm))?;

        let mut validation = Validation::new(algorithm);
        // The default 60s leeway would accept freshly expired tokens.
        validation.leeway = 0;

        Ok(Self {
            header: Header::new(algorithm),
            validation,
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            ttl: chrono::Duration::minutes(config.token_ttl_minutes),
        })
    }

    /// Issue a token for `subject` with the configured lifetime.
    pub fn issue_default(&self, subject: &str) -> Result<String> {
        self.issue(subject, self.ttl)
    }

    /// Issue a token for `subject` with an explicit lifetime.
    pub fn issue(&self, subject: &str, ttl: chrono::Duration) -> Result<String> {
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key).context("Failed to sign access token")
    }

    /// Decode and validate a token, returning the subject it names.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| match e
                .kind()
            {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        data.claims.sub.ok_or(TokenError::MissingSubject)
    }
}
