use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::middleware::AuthError;
use super::{TokenError, extract_bearer, parse_token, verify_password};
use crate::server::AppState;
use crate::types::{Capability, User};

/// Decodes `Basic base64(username:password)`.
pub fn extract_basic_credentials(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (username, password) = credentials.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

/// Looks up `username` and checks `password` against its credential record.
/// Returns `None` when either does not match. Key derivation runs on the
/// blocking pool.
pub async fn authenticate_password(
    state: &Arc<AppState>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AuthError> {
    let Some(user) = state
        .store
        .get_user_by_username(username.trim())
        .map_err(|_| AuthError::InternalError)?
    else {
        return Ok(None);
    };

    let record = user.password.clone();
    let password = password.to_string();
    let secret = state.settings.core.secret_key.clone();

    let verified = tokio::task::spawn_blocking(move || verify_password(&record, &password, &secret))
        .await
        .map_err(|_| AuthError::InternalError)?;

    Ok(verified.then_some(user))
}

/// Resolves the user behind a `Bearer` header.
pub fn authenticate_bearer(state: &Arc<AppState>, header: Option<&str>) -> Result<User, AuthError> {
    let token = extract_bearer(header)?;
    let claims = parse_token(token, &state.settings.core.secret_key)?;

    state
        .store
        .get_user(&claims.user_id)
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::Token(TokenError::PrincipalInvalid))
}

pub fn require_active(user: &User) -> Result<(), AuthError> {
    if !user.is_active {
        return Err(AuthError::Inactive);
    }
    Ok(())
}

pub fn require_capability(user: &User, capability: Capability) -> Result<(), AuthError> {
    if !user.has(capability) {
        return Err(AuthError::MissingCapability(capability));
    }
    Ok(())
}
