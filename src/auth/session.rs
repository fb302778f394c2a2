//! Signed session tokens handed out by a successful login.

use actix_web::cookie::{time as cookie_time, Cookie, SameSite};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "auth-token";

pub fn session_lifetime() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("the signing key cannot be used")]
    InvalidKey,
    #[error("failed to sign the session token")]
    Signing(#[source] jwt::Error),
    #[error("the session token is invalid")]
    Invalid(#[source] jwt::Error),
    #[error("the session token expired")]
    Expired,
}

fn signing_key(secret: &Secret<String>) -> Result<Hmac<Sha256>, SessionError> {
    Hmac::new_from_slice(secret.expose_secret().as_bytes()).map_err(|_| SessionError::InvalidKey)
}

pub fn mint_session_token(
    subject: &str,
    secret: &Secret<String>,
    lifetime: Duration,
) -> Result<String, SessionError> {
    let key = signing_key(secret)?;
    let now = Utc::now();
    let claims = SessionClaims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    claims.sign_with_key(&key).map_err(SessionError::Signing)
}

pub fn verify_session_token(
    token: &str,
    secret: &Secret<String>,
) -> Result<SessionClaims, SessionError> {
    let key = signing_key(secret)?;
    let claims: SessionClaims = token.verify_with_key(&key).map_err(SessionError::Invalid)?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(SessionError::Expired);
    }

    Ok(claims)
}

/// The `auth-token` cookie carrying a freshly minted token.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(cookie_time::Duration::seconds(session_lifetime().num_seconds()))
        .finish()
}
