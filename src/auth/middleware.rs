use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::TokenError;
use super::helpers::{
    authenticate_bearer, authenticate_password, extract_basic_credentials, require_active,
};
use crate::server::AppState;
use crate::types::{Capability, User};

/// Any active user presenting a bearer token.
pub struct RequireUser(pub User);

/// An active administrator presenting a bearer token.
pub struct RequireAdmin(pub User);

/// An active user authenticated by either a bearer token or HTTP Basic
/// credentials, as sent by pip and twine.
pub struct Principal(pub User);

#[derive(Debug)]
pub enum AuthError {
    Token(TokenError),
    InvalidCredentials,
    Inactive,
    NotAdmin,
    MissingCapability(Capability),
    InternalError,
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::Token(e)
    }
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Token(TokenError::PrincipalInvalid) => StatusCode::BAD_REQUEST,
            AuthError::Token(_) | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Inactive | AuthError::NotAdmin | AuthError::MissingCapability(_) => {
                StatusCode::FORBIDDEN
            }
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            AuthError::Token(TokenError::PrincipalInvalid) => "Invalid token principal".to_string(),
            AuthError::Token(TokenError::Expired) => "Token expired".to_string(),
            AuthError::Token(TokenError::Malformed) => "Invalid token".to_string(),
            AuthError::Token(TokenError::InvalidHeader) => "Authentication required".to_string(),
            AuthError::InvalidCredentials => "Invalid credentials".to_string(),
            AuthError::Inactive => "User is inactive".to_string(),
            AuthError::NotAdmin => "Admin access required".to_string(),
            AuthError::MissingCapability(capability) => {
                format!("Missing permission: {capability}")
            }
            AuthError::InternalError => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "data": null, "error": self.message() });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"wheelhouse\""),
            );
        }

        response
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate_bearer(state, authorization(parts))?;
        require_active(&user)?;

        Ok(RequireUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate_bearer(state, authorization(parts))?;
        require_active(&user)?;

        if !user.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(user))
    }
}

impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization(parts);

        let user = match header.and_then(extract_basic_credentials) {
            Some((username, password)) => authenticate_password(state, &username, &password)
                .await?
                .ok_or(AuthError::InvalidCredentials)?,
            None => authenticate_bearer(state, header)?,
        };
        require_active(&user)?;

        Ok(Principal(user))
    }
}
