//! Session id to username resolution through the reel-rating auth service.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;

use crate::config::AuthConfig;

const JWT_GENERATE_PATH: &str = "/reel-rating-auth-service/jwt/generate";

/// Turns a session id into the username it belongs to.
///
/// `Ok(None)` means the session is unknown or expired.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, session_id: &str) -> Result<Option<String>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ReelRatingClaims {
    upn: String,
}

/// Extracts the `upn` claim, verifying the signature when a key is configured.
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
    verify_signature: bool,
}

impl TokenDecoder {
    pub fn new(verification_key: Option<&Secret<String>>) -> Result<Self, AppError> {
        let verify_signature = verification_key.is_some();
        let (key, mut validation) = match verification_key {
            Some(secret) => {
                let material = secret.expose_secret();
                if material.trim_start().starts_with("-----BEGIN") {
                    let key = DecodingKey::from_rsa_pem(material.as_bytes()).map_err(|e| {
                        AppError::ConfigError(anyhow::anyhow!("Invalid RS256 public key: {}", e))
                    })?;
                    (key, Validation::new(Algorithm::RS256))
                } else {
                    (
                        DecodingKey::from_secret(material.as_bytes()),
                        Validation::new(Algorithm::HS256),
                    )
                }
            }
            None => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.insecure_disable_signature_validation();
                validation.required_spec_claims.clear();
                (DecodingKey::from_secret(&[]), validation)
            }
        };
        validation.validate_aud = false;

        Ok(Self {
            key,
            validation,
            verify_signature,
        })
    }

    pub fn verifies_signature(&self) -> bool {
        self.verify_signature
    }

    /// A token that fails to verify is the caller's problem (401). Without a
    /// key the token is only parsed, so a malformed one means the auth
    /// service answered with garbage (502).
    pub fn username(&self, token: &str) -> Result<String, AppError> {
        let data = decode::<ReelRatingClaims>(token, &self.key, &self.validation).map_err(|e| {
            if self.verify_signature {
                AppError::from(e)
            } else {
                tracing::error!("Auth service returned an unreadable token: {}", e);
                AppError::BadGateway("malformed token from auth service".to_string())
            }
        })?;
        let upn = data.claims.upn.trim();
        if upn.is_empty() {
            return Err(AppError::Unauthorized(anyhow::anyhow!("Token has an empty upn claim")));
        }
        Ok(upn.to_string())
    }
}

/// Session ids are interpolated into a URL path.
fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 256
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

pub struct AuthClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    decoder: TokenDecoder,
}

impl AuthClient {
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        let decoder = TokenDecoder::new(config.jwt_verification_key.as_ref())?;
        if !decoder.verifies_signature() {
            tracing::warn!("AUTH_JWT_VERIFICATION_KEY not set; trusting tokens from the auth service");
        }
        Ok(Self {
            client: Client::new(),
            base_url: config.auth_service_url.clone(),
            timeout: config.request_timeout(),
            decoder,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SessionResolver for AuthClient {
    async fn resolve(&self, session_id: &str) -> Result<Option<String>, AppError> {
        if !is_valid_session_id(session_id) {
            return Ok(None);
        }

        let url = format!("{}{}/{}", self.base_url, JWT_GENERATE_PATH, session_id);
        let response = self
            .client
            .traced_get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach auth service at {}: {}", self.base_url, e);
                AppError::BadGateway("auth service unreachable".to_string())
            })?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(status = %status, "Auth service rejected session");
            return Ok(None);
        }
        if !status.is_success() {
            tracing::error!(status = %status, "Auth service returned an error");
            return Err(AppError::BadGateway(format!("auth service returned {}", status)));
        }

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read auth service response: {}", e);
            AppError::BadGateway("unreadable auth service response".to_string())
        })?;
        let token = body.trim().trim_matches('"');
        if token.is_empty() {
            return Ok(None);
        }

        self.decoder.username(token).map(Some)
    }
}

/// Fixed session table for tests and local runs without an auth service.
#[derive(Default)]
pub struct MockSessionResolver {
    sessions: HashMap<String, String>,
}

impl MockSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: &str, user_name: &str) -> Self {
        self.sessions
            .insert(session_id.to_string(), user_name.to_string());
        self
    }
}

#[async_trait]
impl SessionResolver for MockSessionResolver {
    async fn resolve(&self, session_id: &str) -> Result<Option<String>, AppError> {
        Ok(self.sessions.get(session_id).cloned())
    }
}
