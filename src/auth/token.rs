use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_ISSUER: &str = "wheelhouse";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token references an unknown user")]
    PrincipalInvalid,
    #[error("missing or unsupported authorization header")]
    InvalidHeader,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub iss: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

/// Issues a signed token for `user_id` valid for `ttl` from now.
pub fn issue_token(user_id: &str, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    issue_token_at(user_id, secret, ttl, Utc::now())
}

pub fn issue_token_at(
    user_id: &str,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = TokenClaims {
        user_id: user_id.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        exp: (now + ttl).timestamp(),
        nbf: None,
    };
    sign(&claims, secret)
}

fn sign(claims: &TokenClaims, secret: &str) -> Result<String, TokenError> {
    let header = Header {
        alg: ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };
    let header = serde_json::to_vec(&header).map_err(|_| TokenError::Malformed)?;
    let claims = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    );
    let signature = mac(secret, &signing_input)?.finalize().into_bytes();

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verifies signature, issuer and validity window.
pub fn parse_token(token: &str, secret: &str) -> Result<TokenClaims, TokenError> {
    parse_token_at(token, secret, Utc::now())
}

pub fn parse_token_at(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(claims), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    mac(secret, &format!("{header}.{claims}"))?
        .verify_slice(&signature)
        .map_err(|_| TokenError::Malformed)?;

    let header: Header = decode_segment(header)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::Malformed);
    }

    let claims: TokenClaims = decode_segment(claims)?;
    if claims.iss != TOKEN_ISSUER {
        return Err(TokenError::Malformed);
    }

    let now = now.timestamp();
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    if claims.nbf.is_some_and(|nbf| now < nbf) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

/// Returns the token from a `Bearer` authorization header.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::InvalidHeader)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(TokenError::InvalidHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::InvalidHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::InvalidHeader);
    }
    Ok(token)
}

fn mac(secret: &str, input: &str) -> Result<HmacSha256, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::Malformed)?;
    mac.update(input.as_bytes());
    Ok(mac)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
