//! Identity resolution from provider-issued bearer tokens.

mod jwt;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tarefas_core::policy::Identity;
use thiserror::Error;

#[cfg(test)]
pub use jwt::issue_identity_jwt;
pub use jwt::verify_identity_jwt;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid Authorization header")]
    InvalidHeader,

    #[error("Authorization must be Bearer token")]
    NotBearer,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Token carries no email")]
    MissingEmail,
}

/// Turn a verified token into an identity. A token without a name falls back
/// to the email as display name.
pub fn identity_from_token(secret: &str, token: &str) -> Result<Identity, AuthError> {
    let claims = verify_identity_jwt(secret, token).map_err(AuthError::InvalidToken)?;
    let email = claims.email.trim().to_string();
    if email.is_empty() {
        return Err(AuthError::MissingEmail);
    }
    let name = claims
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.clone());
    Ok(Identity::new(email, name))
}

/// Resolve the caller of a request. No Authorization header means an
/// anonymous caller; a present but unusable one is an error.
pub fn resolve_identity(headers: &HeaderMap, secret: &str) -> Result<Option<Identity>, AuthError> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let auth_value = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;
    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::NotBearer)?;
    identity_from_token(secret, token.trim()).map(Some)
}
