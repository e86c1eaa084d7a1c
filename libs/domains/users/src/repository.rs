use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::UserResult;
use crate::models::{NewUser, User};

/// Repository trait for user persistence.
///
/// The conditional updates (`rotate_refresh_fingerprint`,
/// `reset_password_if_token_matches`) must be single atomic statements so
/// that concurrent callers race on the database row, not on application
/// state; they return `false` when the precondition no longer held.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: NewUser) -> UserResult<User>;

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    async fn get_by_reset_token(&self, token: &str) -> UserResult<Option<User>>;

    /// List all users, newest first.
    async fn list(&self) -> UserResult<Vec<User>>;

    /// Overwrite the stored refresh-token fingerprint (None clears it).
    async fn set_refresh_fingerprint(
        &self,
        user_id: Uuid,
        fingerprint: Option<String>,
    ) -> UserResult<()>;

    /// Compare-and-swap the refresh fingerprint: only succeeds if the stored
    /// value still equals `current`. Returns whether a row was updated.
    async fn rotate_refresh_fingerprint(
        &self,
        user_id: Uuid,
        current: &str,
        next: &str,
    ) -> UserResult<bool>;

    /// Store a reset token and its expiry on the user row.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> UserResult<()>;

    /// Set the password hash and clear token+expiry in one update keyed on
    /// the token value. Returns whether a row was updated (false = another
    /// caller already consumed the token).
    async fn reset_password_if_token_matches(
        &self,
        user_id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> UserResult<bool>;
}
