use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Duration;

use crate::models::login_token::AuthContext;
use crate::state::AppState;

/// Minimum acceptable size for the session secret in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;
/// Minimum number of unique bytes expected for the secret to avoid trivially guessable values.
const MIN_UNIQUE_JWT_BYTES: usize = 8;

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT_SECRET must be at least {required} bytes, but {actual} bytes were provided")]
    SecretTooShort { actual: usize, required: usize },
    #[error(
        "JWT_SECRET must contain sufficient entropy (at least {required} unique bytes); only {actual} unique bytes found"
    )]
    SecretLowEntropy { actual: usize, required: usize },
    #[error("system clock is before the unix epoch")]
    Clock,
    #[error("session token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self, SessionError> {
        let bytes = secret.as_ref();
        validate_secret(bytes)?;

        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        })
    }
}

fn validate_secret(secret: &[u8]) -> Result<(), SessionError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(SessionError::SecretTooShort {
            actual: secret.len(),
            required: MIN_JWT_SECRET_LENGTH,
        });
    }

    let unique = secret.iter().copied().collect::<HashSet<_>>().len();
    if unique < MIN_UNIQUE_JWT_BYTES {
        return Err(SessionError::SecretLowEntropy {
            actual: unique,
            required: MIN_UNIQUE_JWT_BYTES,
        });
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct SessionClaims {
    pub sub: String, // account id
    pub ctx: AuthContext,
    pub iat: u64,
    pub exp: u64,
}

impl SessionClaims {
    pub fn account_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

fn unix_now() -> Result<u64, SessionError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| SessionError::Clock)
}

pub fn create_session_token(
    account_id: i64,
    context: AuthContext,
    keys: &JwtKeys,
    ttl: Duration,
) -> Result<String, SessionError> {
    let now = unix_now()?;
    let claims = SessionClaims {
        sub: account_id.to_string(),
        ctx: context,
        iat: now,
        exp: now + ttl.whole_seconds().max(1) as u64,
    };
    Ok(encode(&Header::default(), &claims, &keys.encoding)?)
}

pub fn decode_session_token(token: &str, keys: &JwtKeys) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    Ok(decode::<SessionClaims>(token, &keys.decoding, &validation)?.claims)
}

/// Claims of the session cookie set after a successful redemption.
#[derive(Debug, PartialEq)]
pub struct AuthSession(pub SessionClaims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(SESSION_COOKIE).ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = decode_session_token(token.value(), &state.jwt_keys)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        Ok(AuthSession(claims))
    }
}
