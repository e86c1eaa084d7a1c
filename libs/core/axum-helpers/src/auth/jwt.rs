use super::config::JwtConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT token time-to-live constants
pub const ACCESS_TOKEN_TTL: i64 = 900; // 15 minutes
pub const REFRESH_TOKEN_TTL: i64 = 604_800; // 7 days

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// User email
    pub email: String,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Token ID, unique per mint so rotation always produces a fresh token
    pub jti: Uuid,
}

/// Stateless HS256 token signer/verifier.
///
/// Every service validates inbound access tokens with the shared secret;
/// only the auth service mints tokens. Refresh-token validity is additionally
/// tied to the fingerprint stored on the user record, which is checked by the
/// auth service rather than here.
#[derive(Clone)]
pub struct JwtAuth {
    secret: String,
    refresh_secret: String,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            refresh_secret: config.refresh_secret.clone(),
        }
    }

    /// Create an access token (15 min)
    pub fn create_access_token(&self, user_id: &str, email: &str) -> eyre::Result<String> {
        Self::create_token(&self.secret, user_id, email, ACCESS_TOKEN_TTL)
    }

    /// Create a refresh token (7 days)
    pub fn create_refresh_token(&self, user_id: &str, email: &str) -> eyre::Result<String> {
        Self::create_token(&self.refresh_secret, user_id, email, REFRESH_TOKEN_TTL)
    }

    fn create_token(
        secret: &str,
        user_id: &str,
        email: &str,
        ttl_seconds: i64,
    ) -> eyre::Result<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::now_v7(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify an access token signature and decode claims
    pub fn verify_access_token(&self, token: &str) -> eyre::Result<JwtClaims> {
        Self::verify(&self.secret, token)
    }

    /// Verify a refresh token signature and decode claims
    pub fn verify_refresh_token(&self, token: &str) -> eyre::Result<JwtClaims> {
        Self::verify(&self.refresh_secret, token)
    }

    fn verify(secret: &str, token: &str) -> eyre::Result<JwtClaims> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("access-secret", "refresh-secret"))
    }

    #[test]
    fn test_access_token_round_trip() {
        let auth = auth();
        let token = auth
            .create_access_token("u-1", "user@example.com")
            .unwrap();
        let claims = auth.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email, "user@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_not_valid_as_access_token() {
        let auth = auth();
        let refresh = auth
            .create_refresh_token("u-1", "user@example.com")
            .unwrap();
        assert!(auth.verify_access_token(&refresh).is_err());
    }

    #[test]
    fn test_same_second_tokens_are_distinct() {
        let auth = auth();
        let first = auth
            .create_refresh_token("u-1", "user@example.com")
            .unwrap();
        let second = auth
            .create_refresh_token("u-1", "user@example.com")
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(auth().verify_access_token("not-a-jwt").is_err());
    }
}
