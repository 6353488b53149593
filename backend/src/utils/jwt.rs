use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::{Principal, Role};

/// Claims carried by a caller's bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallerClaims {
    pub sub: String, // uid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl CallerClaims {
    pub fn new(uid: String, email: Option<String>, role: Option<Role>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: uid,
            email,
            role: role.map(|role| role.as_str().to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn into_principal(self) -> Principal {
        Principal {
            uid: self.sub,
            email: self.email,
            role: self.role.as_deref().map(Role::from_claim),
        }
    }
}

pub fn create_caller_token(claims: &CallerClaims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

pub fn verify_caller_token(
    token: &str,
    secret: &str,
) -> Result<CallerClaims, jsonwebtoken::errors::Error> {
    let validation = Validation::default();
    let token_data = decode::<CallerClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    Ok(token_data.claims)
}
