//! Credential hashing, bearer token issuing and request authentication

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use outdoor_common::{Error, Result, Role, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::ApiError;
use crate::AppState;

/// Hash a password with argon2 and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// What a token is allowed to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Session,
    Reset,
}

impl TokenPurpose {
    fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
            TokenPurpose::Reset => "reset",
        }
    }
}

/// JWT claims carried by every token
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    /// "session" or "reset"
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed, time-limited bearer tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a 7-day session token for a user
    pub fn issue_session(&self, user_id: &str) -> Result<String> {
        self.issue(user_id, TokenPurpose::Session, Duration::days(7))
    }

    /// Issue a 1-hour password reset token
    pub fn issue_reset(&self, user_id: &str) -> Result<String> {
        self.issue(user_id, TokenPurpose::Reset, Duration::hours(1))
    }

    fn issue(&self, user_id: &str, purpose: TokenPurpose, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            purpose: purpose.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("token signing failed: {}", e).into())
    }

    /// Verify a token and return the embedded user id.
    ///
    /// A token is only accepted for the purpose it was issued for; a reset
    /// token never authenticates a session route.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::TokenInvalid,
            },
        )?;

        if data.claims.purpose != purpose.as_str() {
            return Err(Error::TokenInvalid);
        }

        Ok(data.claims.sub)
    }
}

/// Authenticated caller, resolved from the `Authorization: Bearer` header
pub struct AuthUser(pub User);

/// Authenticated caller that must hold the admin role
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("missing bearer token".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("missing bearer token".to_string()))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user_id = state.tokens.verify(token, TokenPurpose::Session)?;

        let user = state
            .storage
            .lock()
            .await
            .get_user(&user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized("user no longer exists".to_string()))?;

        Ok(AuthUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            return Err(Error::Forbidden("access denied".to_string()).into());
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_password_garbage_hash() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn test_session_token_roundtrip() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue_session("user-1").unwrap();

        let user_id = issuer.verify(&token, TokenPurpose::Session).unwrap();
        assert_eq!(user_id, "user-1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new("test-secret");
        // Expired beyond the default validation leeway.
        let token = issuer
            .issue("user-1", TokenPurpose::Session, Duration::minutes(-5))
            .unwrap();

        let err = issuer.verify(&token, TokenPurpose::Session).unwrap_err();
        assert!(matches!(err, Error::TokenExpired));
    }

    #[test]
    fn test_reset_token_not_accepted_as_session() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue_reset("user-1").unwrap();

        let err = issuer.verify(&token, TokenPurpose::Session).unwrap_err();
        assert!(matches!(err, Error::TokenInvalid));

        // But it is accepted for its own purpose.
        assert_eq!(issuer.verify(&token, TokenPurpose::Reset).unwrap(), "user-1");
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = TokenIssuer::new("test-secret");
        let other = TokenIssuer::new("other-secret");
        let token = other.issue_session("user-1").unwrap();

        let err = issuer.verify(&token, TokenPurpose::Session).unwrap_err();
        assert!(matches!(err, Error::TokenInvalid));
    }
}
