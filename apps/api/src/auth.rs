//! Auth gate — verifies the session token and yields the caller's user id.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET` carrying `{ uid, exp }`.
//! They arrive either as `Authorization: Bearer <token>` or in the `session`
//! cookie set by the web client.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;

const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub exp: usize,
}

/// The verified caller. Handlers trust this id without further checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = extract_token(parts).ok_or(AppError::Unauthorized)?;
        let user_id = verify_token(&token, &state.config.jwt_secret)?;
        Ok(AuthUser { user_id })
    }
}

/// Decodes and validates a token, returning the `uid` claim.
pub fn verify_token(token: &str, secret: &str) -> Result<String, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Rejected session token: {e}");
        AppError::Unauthorized
    })?;

    let uid = data.claims.uid.trim().to_string();
    if uid.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(uid)
}

fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(bearer) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string()).filter(|t| !t.is_empty());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
pub(crate) fn issue_test_token(uid: &str, secret: &str, ttl_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            uid: uid.to_string(),
            exp,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
