mod helpers;
mod middleware;
mod password;
mod token;

pub use helpers::{authenticate_password, require_capability};
pub use middleware::{AuthError, Principal, RequireAdmin, RequireUser};
pub use password::{DEFAULT_ITERATIONS, PasswordHasher, hash_password, verify_password};
pub use token::{
    DEFAULT_TOKEN_TTL_SECONDS, TOKEN_ISSUER, TokenClaims, TokenError, extract_bearer, issue_token,
    issue_token_at, parse_token, parse_token_at,
};
