//! OAuth access tokens for the platform APIs.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use url::Url;

use crate::config::GoogleConfig;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const IDENTITY_SCOPE: &str = "https://www.googleapis.com/auth/identitytoolkit";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_MINUTES: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to read service account key: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("invalid service account key: {0}")]
    KeyFormat(#[from] serde_json::Error),
    #[error("failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid token endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, scope: &str) -> Result<AccessToken, TokenError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges a signed service-account assertion for an access token.
pub struct ServiceAccountTokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
}

impl ServiceAccountTokenProvider {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self { http, key }
    }

    pub fn from_key_file(http: reqwest::Client, path: &Path) -> Result<Self, TokenError> {
        let raw = std::fs::read_to_string(path)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        Ok(Self::new(http, key))
    }

    fn signed_assertion(&self, scope: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_TTL_MINUTES)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self, scope: &str) -> Result<AccessToken, TokenError> {
        let assertion = self.signed_assertion(scope)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        read_token_response(response).await
    }
}

/// Fetches tokens for the workload's attached service account.
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    base: Url,
}

impl MetadataTokenProvider {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn access_token(&self, scope: &str) -> Result<AccessToken, TokenError> {
        let url = self
            .base
            .join("computeMetadata/v1/instance/service-accounts/default/token")?;
        let response = self
            .http
            .get(url)
            .query(&[("scopes", scope)])
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        read_token_response(response).await
    }
}

async fn read_token_response(response: reqwest::Response) -> Result<AccessToken, TokenError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TokenError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    let token: TokenResponse = response.json().await?;
    Ok(AccessToken(token.access_token))
}

/// Service-account key when configured, otherwise the metadata server.
pub fn token_provider_from_config(
    http: reqwest::Client,
    config: &GoogleConfig,
) -> Result<Arc<dyn TokenProvider>, TokenError> {
    match config.credentials_path.as_deref() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using service account key for platform tokens");
            Ok(Arc::new(ServiceAccountTokenProvider::from_key_file(
                http, path,
            )?))
        }
        None => {
            tracing::info!("Using metadata server for platform tokens");
            Ok(Arc::new(MetadataTokenProvider::new(
                http,
                config.metadata_base.clone(),
            )))
        }
    }
}
