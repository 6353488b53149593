//! Identity provider capability: user lookup and role claim updates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use url::Url;

use crate::models::user::{Identity, Role};
use crate::utils::google_auth::{TokenError, TokenProvider, IDENTITY_SCOPE};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("There is no user record corresponding to {0}.")]
    NotFound(String),
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("invalid identity provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Identity, IdentityError>;

    /// Replaces the identity's custom claims with exactly `{"role": role}`.
    async fn set_role(&self, uid: &str, role: &Role) -> Result<(), IdentityError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    email: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    custom_attributes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    custom_attributes: String,
}

/// Identity Toolkit REST client.
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    base: Url,
    project_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl IdentityToolkitClient {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        project_id: String,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base,
            project_id,
            tokens,
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, url::ParseError> {
        self.base
            .join(&format!("v1/projects/{}/accounts:{}", self.project_id, method))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn get_user_by_email(&self, email: &str) -> Result<Identity, IdentityError> {
        let token = self.tokens.access_token(IDENTITY_SCOPE).await?;
        let response = self
            .http
            .post(self.endpoint("lookup")?)
            .bearer_auth(token.secret())
            .json(&LookupRequest { email: [email] })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let lookup: LookupResponse = response.json().await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email.unwrap_or_else(|| email.to_string()),
            role: user.custom_attributes.as_deref().and_then(role_from_claims),
        })
    }

    async fn set_role(&self, uid: &str, role: &Role) -> Result<(), IdentityError> {
        let token = self.tokens.access_token(IDENTITY_SCOPE).await?;
        let response = self
            .http
            .post(self.endpoint("update")?)
            .bearer_auth(token.secret())
            .json(&UpdateRequest {
                local_id: uid,
                custom_attributes: role_claims(role),
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Serialized custom-claims object carrying only the role.
pub fn role_claims(role: &Role) -> String {
    json!({ "role": role.as_str() }).to_string()
}

fn role_from_claims(raw: &str) -> Option<Role> {
    let claims: serde_json::Value = serde_json::from_str(raw).ok()?;
    claims.get("role")?.as_str().map(Role::from_claim)
}
