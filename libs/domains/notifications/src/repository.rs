use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use uuid::Uuid;

use crate::models::Notification;

/// Persistence seam for notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Notification>, DbErr>;

    async fn insert(&self, user_id: Uuid, payload: serde_json::Value)
        -> Result<Notification, DbErr>;

    /// All unread notifications for a user, newest first.
    async fn find_unread(&self, user_id: Uuid) -> Result<Vec<Notification>, DbErr>;

    /// The most recently read notifications for a user, newest first.
    async fn find_recent_read(&self, user_id: Uuid, limit: u64)
        -> Result<Vec<Notification>, DbErr>;

    /// Sets `read_at` only if the row is still unread. Returns whether this
    /// call was the one that marked it.
    async fn set_read_if_unread(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DbErr>;
}
