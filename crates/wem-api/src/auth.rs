//! Workspace access tokens
//!
//! The platform authenticates admin tooling with short-lived JWTs signed by
//! the workspace secret: HS512, issuer set to the workspace key, two-hour
//! expiry. Nothing is persisted; a fresh token is minted per run.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use crate::error::ApiError;

/// Token subject presented to the platform's audit log.
pub const TOKEN_NAME: &str = "Workspace Import/Export Tool";

/// Token lifetime. Short enough that a leaked token ages out within a run.
pub const TOKEN_TTL_SECS: i64 = 7200;

/// Key/secret pair identifying one workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceCredentials {
    pub key: String,
    pub secret: String,
}

impl WorkspaceCredentials {
    /// Create credentials
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    name: &'static str,
    #[serde(rename = "isAdmin")]
    is_admin: bool,
    iss: &'a str,
    exp: i64,
}

/// Sign a short-lived admin access token for the given workspace.
///
/// # Errors
/// Returns [`ApiError::Token`] if signing fails.
pub fn generate_access_token(credentials: &WorkspaceCredentials) -> Result<String, ApiError> {
    let claims = TokenClaims {
        name: TOKEN_NAME,
        is_admin: true,
        iss: &credentials.key,
        exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(credentials.secret.as_bytes()),
    )?;
    Ok(token)
}
