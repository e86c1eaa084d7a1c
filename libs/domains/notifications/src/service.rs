use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::NotificationError;
use crate::models::Notification;
use crate::push::PushRegistry;
use crate::repository::NotificationRepository;

/// How many already-read notifications the feed shows after the unread block.
const RECENT_READ_LIMIT: u64 = 3;

#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    push: PushRegistry,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>, push: PushRegistry) -> Self {
        Self { repository, push }
    }

    pub fn push_registry(&self) -> PushRegistry {
        self.push.clone()
    }

    /// Persists a notification, then attempts live delivery. Delivery is
    /// best-effort: a user without an open connection still gets the row.
    pub async fn create_and_push(
        &self,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<Notification, NotificationError> {
        let notification = self.repository.insert(user_id, payload).await?;
        if self.push.send(&notification).await {
            debug!(%user_id, notification_id = %notification.id, "pushed notification");
        } else {
            debug!(%user_id, notification_id = %notification.id, "no live connection, stored only");
        }
        Ok(notification)
    }

    /// The notification feed: every unread notification (newest first),
    /// followed by the few most recently read ones. The two blocks are
    /// never interleaved.
    pub async fn find_all(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        let mut feed = self.repository.find_unread(user_id).await?;
        let read = self
            .repository
            .find_recent_read(user_id, RECENT_READ_LIMIT)
            .await?;
        feed.extend(read);
        Ok(feed)
    }

    /// Marks a notification read. Idempotent: a second call returns the
    /// notification with the timestamp set by whoever marked it first.
    pub async fn mark_read(&self, id: Uuid) -> Result<Notification, NotificationError> {
        let existing = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(NotificationError::NotFound(id))?;
        if existing.is_read() {
            return Ok(existing);
        }

        let now = Utc::now();
        let won = self.repository.set_read_if_unread(id, now).await?;
        if !won {
            warn!(notification_id = %id, "lost mark-read race, returning stored timestamp");
        }

        // Re-fetch so concurrent markers all observe the winning timestamp.
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(NotificationError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockNotificationRepository;
    use chrono::{DateTime, Duration, Utc};
    use mockall::predicate::eq;

    fn notification(user_id: Uuid, created_at: DateTime<Utc>, read_at: Option<DateTime<Utc>>) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id,
            payload: serde_json::json!({"kind": "task_updated"}),
            created_at,
            read_at,
        }
    }

    fn service(repository: MockNotificationRepository) -> NotificationService {
        NotificationService::new(Arc::new(repository), PushRegistry::new())
    }

    #[tokio::test]
    async fn feed_is_unread_block_then_recent_read_block() {
        let user_id = Uuid::now_v7();
        let now = Utc::now();
        // An old unread notification must still precede a freshly read one.
        let old_unread = notification(user_id, now - Duration::hours(5), None);
        let new_unread = notification(user_id, now, None);
        let fresh_read = notification(user_id, now - Duration::minutes(1), Some(now));

        let mut repository = MockNotificationRepository::new();
        let unread = vec![new_unread.clone(), old_unread.clone()];
        repository
            .expect_find_unread()
            .with(eq(user_id))
            .return_once(move |_| Ok(unread));
        let read = vec![fresh_read.clone()];
        repository
            .expect_find_recent_read()
            .with(eq(user_id), eq(RECENT_READ_LIMIT))
            .return_once(move |_, _| Ok(read));

        let feed = service(repository).find_all(user_id).await.unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].id, new_unread.id);
        assert_eq!(feed[1].id, old_unread.id);
        assert_eq!(feed[2].id, fresh_read.id);
    }

    #[tokio::test]
    async fn mark_read_sets_timestamp_once() {
        let user_id = Uuid::now_v7();
        let unread = notification(user_id, Utc::now(), None);
        let id = unread.id;
        let marked = Notification {
            read_at: Some(Utc::now()),
            ..unread.clone()
        };

        let mut repository = MockNotificationRepository::new();
        let mut fetches = vec![Ok(Some(marked.clone())), Ok(Some(unread))];
        repository
            .expect_get_by_id()
            .with(eq(id))
            .times(2)
            .returning(move |_| fetches.pop().unwrap());
        repository
            .expect_set_read_if_unread()
            .times(1)
            .returning(|_, _| Ok(true));

        let result = service(repository).mark_read(id).await.unwrap();
        assert_eq!(result.read_at, marked.read_at);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_for_already_read() {
        let user_id = Uuid::now_v7();
        let read_at = Utc::now() - Duration::minutes(10);
        let already = notification(user_id, Utc::now() - Duration::hours(1), Some(read_at));
        let id = already.id;

        let mut repository = MockNotificationRepository::new();
        repository
            .expect_get_by_id()
            .with(eq(id))
            .times(1)
            .return_once(move |_| Ok(Some(already)));
        repository.expect_set_read_if_unread().times(0);

        let result = service(repository).mark_read(id).await.unwrap();
        assert_eq!(result.read_at, Some(read_at));
    }

    #[tokio::test]
    async fn mark_read_unknown_id_is_not_found() {
        let id = Uuid::now_v7();
        let mut repository = MockNotificationRepository::new();
        repository
            .expect_get_by_id()
            .with(eq(id))
            .return_once(|_| Ok(None));

        let err = service(repository).mark_read(id).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(found) if found == id));
    }

    #[tokio::test]
    async fn create_without_connection_still_persists() {
        let user_id = Uuid::now_v7();
        let stored = notification(user_id, Utc::now(), None);
        let mut repository = MockNotificationRepository::new();
        let returned = stored.clone();
        repository
            .expect_insert()
            .times(1)
            .return_once(move |_, _| Ok(returned));

        let result = service(repository)
            .create_and_push(user_id, serde_json::json!({"kind": "task_created"}))
            .await
            .unwrap();
        assert_eq!(result.id, stored.id);
    }

    #[tokio::test]
    async fn create_delivers_to_live_connection() {
        let user_id = Uuid::now_v7();
        let stored = notification(user_id, Utc::now(), None);
        let mut repository = MockNotificationRepository::new();
        let returned = stored.clone();
        repository
            .expect_insert()
            .return_once(move |_, _| Ok(returned));

        let push = PushRegistry::new();
        let (_conn, mut rx) = push.register(user_id).await;
        let service = NotificationService::new(Arc::new(repository), push);

        service
            .create_and_push(user_id, serde_json::json!({"kind": "task_created"}))
            .await
            .unwrap();
        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.id, stored.id);
    }
}
