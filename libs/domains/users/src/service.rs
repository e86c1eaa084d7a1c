use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum_helpers::JwtAuth;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{
    AuthTokens, ForgotPassword, LoginUser, NewUser, RefreshRequest, RegisterUser, ResetPassword,
    User, UserProfile,
};
use crate::repository::UserRepository;
use crate::streams::{AuthEvent, AuthEventPublisher};

/// Reset tokens are valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Auth service: registration, login, refresh-token rotation, logout, and
/// the password-reset lifecycle.
///
/// Refresh tokens are stored as sha-256 fingerprints so rotation can be a
/// single conditional UPDATE on the database row. One fingerprint per user:
/// logging in again invalidates the previous session's refresh token.
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    events: Arc<dyn AuthEventPublisher>,
    jwt: JwtAuth,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        events: Arc<dyn AuthEventPublisher>,
        jwt: JwtAuth,
    ) -> Self {
        Self {
            repository,
            events,
            jwt,
        }
    }

    pub async fn register(&self, input: RegisterUser) -> UserResult<AuthTokens> {
        if self.repository.get_by_email(&input.email).await?.is_some() {
            return Err(UserError::DuplicateEmail(input.email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .repository
            .create(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Registered user");
        self.start_session(&user).await
    }

    /// Credential login. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, input: LoginUser) -> UserResult<AuthTokens> {
        let user = self
            .repository
            .get_by_email(&input.email)
            .await?
            .ok_or(UserError::AccessDenied)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login failed: password mismatch");
            return Err(UserError::AccessDenied);
        }

        tracing::info!(user_id = %user.id, "Login succeeded");
        self.start_session(&user).await
    }

    /// Rotate a refresh token.
    ///
    /// The stored fingerprint must match the presented token, and the swap
    /// to the new fingerprint is conditional on it still matching at write
    /// time. Two concurrent refreshes with the same token produce exactly
    /// one winner; the loser is denied.
    pub async fn refresh(&self, input: RefreshRequest) -> UserResult<AuthTokens> {
        let claims = self
            .jwt
            .verify_refresh_token(&input.refresh_token)
            .map_err(|_| UserError::AccessDenied)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| UserError::AccessDenied)?;

        let user = self
            .repository
            .get_by_id(user_id)
            .await?
            .ok_or(UserError::AccessDenied)?;

        let presented = fingerprint(&input.refresh_token);
        let stored = user.refresh_token_hash.as_deref();
        if stored != Some(presented.as_str()) {
            tracing::info!(user_id = %user.id, "Refresh denied: fingerprint mismatch");
            return Err(UserError::AccessDenied);
        }

        let tokens = self.issue_tokens(&user)?;
        let rotated = self
            .repository
            .rotate_refresh_fingerprint(user.id, &presented, &fingerprint(&tokens.refresh_token))
            .await?;
        if !rotated {
            tracing::info!(user_id = %user.id, "Refresh denied: lost rotation race");
            return Err(UserError::AccessDenied);
        }

        Ok(tokens)
    }

    /// Invalidate the current refresh token.
    pub async fn logout(&self, user_id: Uuid) -> UserResult<()> {
        self.repository
            .set_refresh_fingerprint(user_id, None)
            .await?;
        tracing::info!(user_id = %user_id, "Logged out");
        Ok(())
    }

    /// Start the password-reset flow.
    ///
    /// Always returns Ok so the response doesn't reveal whether the email
    /// is registered. When the user exists, a one-hour token is persisted
    /// and a `password_reset_requested` event is published best-effort.
    pub async fn forgot_password(&self, input: ForgotPassword) -> UserResult<()> {
        let Some(user) = self.repository.get_by_email(&input.email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expiry = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.repository
            .set_reset_token(user.id, &token, expiry)
            .await?;

        let event = AuthEvent::PasswordResetRequested {
            email: user.email.clone(),
            reset_token: token,
            username: user.username.clone(),
        };
        if let Err(e) = self.events.publish(&event).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to publish reset event");
        }

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Complete a password reset.
    ///
    /// The token is consumed in one conditional update, so a token can only
    /// ever be redeemed once even under concurrent submissions.
    pub async fn reset_password(&self, input: ResetPassword) -> UserResult<()> {
        let user = self
            .repository
            .get_by_reset_token(&input.token)
            .await?
            .ok_or_else(|| UserError::NotFound("Invalid reset token".to_string()))?;

        let expired = user
            .reset_token_expiry
            .map(|expiry| expiry < Utc::now())
            .unwrap_or(true);
        if expired {
            return Err(UserError::Expired("Reset token expired".to_string()));
        }

        let password_hash = hash_password(&input.new_password)?;
        let updated = self
            .repository
            .reset_password_if_token_matches(user.id, &input.token, &password_hash)
            .await?;
        if !updated {
            // Consumed by a concurrent reset between the read and the write
            return Err(UserError::NotFound("Invalid reset token".to_string()));
        }

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    pub async fn list_users(&self) -> UserResult<Vec<UserProfile>> {
        let users = self.repository.list().await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<UserProfile> {
        self.repository
            .get_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| UserError::NotFound(format!("User {} not found", id)))
    }

    /// Issue a token pair and persist the new refresh fingerprint.
    async fn start_session(&self, user: &User) -> UserResult<AuthTokens> {
        let tokens = self.issue_tokens(user)?;
        self.repository
            .set_refresh_fingerprint(user.id, Some(fingerprint(&tokens.refresh_token)))
            .await?;
        Ok(tokens)
    }

    fn issue_tokens(&self, user: &User) -> UserResult<AuthTokens> {
        let user_id = user.id.to_string();
        let access_token = self
            .jwt
            .create_access_token(&user_id, &user.email)
            .map_err(|e| UserError::Internal(format!("Token signing failed: {}", e)))?;
        let refresh_token = self
            .jwt
            .create_refresh_token(&user_id, &user.email)
            .map_err(|e| UserError::Internal(format!("Token signing failed: {}", e)))?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }
}

/// Hex sha-256 of a token. Stored instead of the token itself so the
/// database never holds a usable credential, and so equality is a plain
/// column comparison usable in a conditional UPDATE.
pub fn fingerprint(token: &str) -> String {
    const_hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_reset_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    const_hex::encode(bytes)
}

fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| UserError::Internal(format!("Stored hash invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use crate::streams::MockAuthEventPublisher;
    use axum_helpers::JwtConfig;
    use stream_worker::StreamError;

    fn jwt() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("access-secret", "refresh-secret"))
    }

    fn user_with_password(password: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            refresh_token_hash: None,
            reset_token: None,
            reset_token_expiry: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(
        repository: MockUserRepository,
        events: MockAuthEventPublisher,
    ) -> UserService {
        UserService::new(Arc::new(repository), Arc::new(events), jwt())
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_access_denied() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email().returning(|_| Ok(None));

        let result = service(repo, MockAuthEventPublisher::new())
            .login(LoginUser {
                email: "nobody@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_access_denied() {
        let user = user_with_password("correct-horse");
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let result = service(repo, MockAuthEventPublisher::new())
            .login(LoginUser {
                email: "alice@example.com".to_string(),
                password: "battery-staple".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_login_stores_refresh_fingerprint() {
        let user = user_with_password("correct-horse");
        let user_id = user.id;
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_set_refresh_fingerprint()
            .withf(move |id, fp| *id == user_id && fp.is_some())
            .times(1)
            .returning(|_, _| Ok(()));

        let tokens = service(repo, MockAuthEventPublisher::new())
            .login(LoginUser {
                email: "alice@example.com".to_string(),
                password: "correct-horse".to_string(),
            })
            .await
            .unwrap();

        // Both tokens decode with the right secrets
        let auth = jwt();
        assert!(auth.verify_access_token(&tokens.access_token).is_ok());
        assert!(auth.verify_refresh_token(&tokens.refresh_token).is_ok());
    }

    #[tokio::test]
    async fn test_refresh_with_unstored_token_is_denied() {
        let mut user = user_with_password("pw");
        user.refresh_token_hash = Some(fingerprint("some-other-token"));
        let token = jwt()
            .create_refresh_token(&user.id.to_string(), &user.email)
            .unwrap();

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let result = service(repo, MockAuthEventPublisher::new())
            .refresh(RefreshRequest {
                refresh_token: token,
            })
            .await;

        assert!(matches!(result, Err(UserError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_both_tokens() {
        let mut user = user_with_password("pw");
        let token = jwt()
            .create_refresh_token(&user.id.to_string(), &user.email)
            .unwrap();
        user.refresh_token_hash = Some(fingerprint(&token));
        let presented = fingerprint(&token);

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_rotate_refresh_fingerprint()
            .withf(move |_, current, next| current == presented && next != presented)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let tokens = service(repo, MockAuthEventPublisher::new())
            .refresh(RefreshRequest {
                refresh_token: token.clone(),
            })
            .await
            .unwrap();

        assert_ne!(tokens.refresh_token, token);
    }

    #[tokio::test]
    async fn test_refresh_loser_of_rotation_race_is_denied() {
        let mut user = user_with_password("pw");
        let token = jwt()
            .create_refresh_token(&user.id.to_string(), &user.email)
            .unwrap();
        user.refresh_token_hash = Some(fingerprint(&token));

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        // Fingerprint no longer matches at write time
        repo.expect_rotate_refresh_fingerprint()
            .returning(|_, _, _| Ok(false));

        let result = service(repo, MockAuthEventPublisher::new())
            .refresh(RefreshRequest {
                refresh_token: token,
            })
            .await;

        assert!(matches!(result, Err(UserError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_silent_ok() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email().returning(|_| Ok(None));
        let mut events = MockAuthEventPublisher::new();
        events.expect_publish().times(0);

        let result = service(repo, events)
            .forgot_password(ForgotPassword {
                email: "nobody@example.com".to_string(),
            })
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_persists_token_then_publishes() {
        let user = user_with_password("pw");
        let user_id = user.id;
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_set_reset_token()
            .withf(move |id, token, expiry| {
                *id == user_id && !token.is_empty() && *expiry > Utc::now()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut events = MockAuthEventPublisher::new();
        events
            .expect_publish()
            .withf(|event| {
                matches!(
                    event,
                    AuthEvent::PasswordResetRequested { email, username, reset_token }
                        if email == "alice@example.com"
                            && username == "alice"
                            && !reset_token.is_empty()
                )
            })
            .times(1)
            .returning(|_| Ok(()));

        service(repo, events)
            .forgot_password(ForgotPassword {
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forgot_password_survives_publish_failure() {
        let user = user_with_password("pw");
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        repo.expect_set_reset_token().returning(|_, _, _| Ok(()));

        let mut events = MockAuthEventPublisher::new();
        events
            .expect_publish()
            .returning(|_| Err(StreamError::handler("bus down")));

        let result = service(repo, events)
            .forgot_password(ForgotPassword {
                email: "alice@example.com".to_string(),
            })
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_reset_password_unknown_token_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_reset_token().returning(|_| Ok(None));

        let result = service(repo, MockAuthEventPublisher::new())
            .reset_password(ResetPassword {
                token: "bogus".to_string(),
                new_password: "new-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reset_password_expired_token() {
        let mut user = user_with_password("pw");
        user.reset_token = Some("tok".to_string());
        user.reset_token_expiry = Some(Utc::now() - Duration::minutes(5));

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_reset_token()
            .returning(move |_| Ok(Some(user.clone())));

        let result = service(repo, MockAuthEventPublisher::new())
            .reset_password(ResetPassword {
                token: "tok".to_string(),
                new_password: "new-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::Expired(_))));
    }

    #[tokio::test]
    async fn test_reset_password_single_winner() {
        let mut user = user_with_password("pw");
        user.reset_token = Some("tok".to_string());
        user.reset_token_expiry = Some(Utc::now() + Duration::minutes(30));

        let mut repo = MockUserRepository::new();
        repo.expect_get_by_reset_token()
            .returning(move |_| Ok(Some(user.clone())));
        // Another submission consumed the token first
        repo.expect_reset_password_if_token_matches()
            .returning(|_, _, _| Ok(false));

        let result = service(repo, MockAuthEventPublisher::new())
            .reset_password(ResetPassword {
                token: "tok".to_string(),
                new_password: "new-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let user = user_with_password("pw");
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let result = service(repo, MockAuthEventPublisher::new())
            .register(RegisterUser {
                username: "alice2".to_string(),
                email: "alice@example.com".to_string(),
                password: "long-enough-pw".to_string(),
            })
            .await;

        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }
}
