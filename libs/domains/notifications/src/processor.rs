use async_trait::async_trait;
use domain_tasks::events::TaskEvent;
use stream_worker::{StreamError, StreamHandler};
use tracing::{info, warn};
use uuid::Uuid;

use crate::service::NotificationService;

/// Turns task events into per-user notifications.
pub struct TaskEventProcessor {
    service: NotificationService,
}

impl TaskEventProcessor {
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }

    /// Owner first, then assignees, each user at most once.
    fn interested_users(event: &TaskEvent) -> Vec<Uuid> {
        let mut users = vec![event.task.owner_user_id];
        for assignee in &event.task.assignee_ids {
            if !users.contains(assignee) {
                users.push(*assignee);
            }
        }
        users
    }

    fn payload(event: &TaskEvent) -> serde_json::Value {
        serde_json::json!({
            "kind": event.kind,
            "task_id": event.task.id,
            "title": event.task.title,
            "status": event.task.status,
            "priority": event.task.priority,
        })
    }
}

#[async_trait]
impl StreamHandler<TaskEvent> for TaskEventProcessor {
    async fn handle(&self, event: &TaskEvent) -> Result<(), StreamError> {
        let users = Self::interested_users(event);
        let payload = Self::payload(event);
        let mut failures = 0usize;

        // One failed user must not starve the rest of their notifications.
        for user_id in &users {
            match self
                .service
                .create_and_push(*user_id, payload.clone())
                .await
            {
                Ok(notification) => {
                    info!(
                        %user_id,
                        notification_id = %notification.id,
                        kind = %event.kind,
                        task_id = %event.task.id,
                        "notification created"
                    );
                }
                Err(e) => {
                    failures += 1;
                    warn!(%user_id, task_id = %event.task.id, error = %e, "failed to create notification");
                }
            }
        }

        if failures == users.len() && !users.is_empty() {
            return Err(StreamError::handler(format!(
                "all {} notification inserts failed for task {}",
                failures, event.task.id
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "task-event-processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::PushRegistry;
    use crate::repository::MockNotificationRepository;
    use chrono::Utc;
    use domain_tasks::models::{Task, TaskPriority, TaskStatus};
    use std::sync::Arc;

    fn task(owner: Uuid, assignees: Vec<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::now_v7(),
            title: "Ship release".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            due_date: None,
            owner_user_id: owner,
            assignee_ids: assignees,
            created_at: now,
            updated_at: now,
        }
    }

    fn stored(user_id: Uuid, payload: serde_json::Value) -> crate::models::Notification {
        crate::models::Notification {
            id: Uuid::now_v7(),
            user_id,
            payload,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[tokio::test]
    async fn one_notification_per_distinct_user() {
        let owner = Uuid::now_v7();
        let assignee = Uuid::now_v7();
        // The owner is also assigned and must only be notified once.
        let event = TaskEvent::created(task(owner, vec![owner, assignee]));

        let mut repository = MockNotificationRepository::new();
        repository
            .expect_insert()
            .times(2)
            .returning(|user_id, payload| Ok(stored(user_id, payload)));

        let processor = TaskEventProcessor::new(NotificationService::new(
            Arc::new(repository),
            PushRegistry::new(),
        ));
        processor.handle(&event).await.unwrap();
    }

    #[tokio::test]
    async fn owner_comes_before_assignees() {
        let owner = Uuid::now_v7();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let event = TaskEvent::updated(task(owner, vec![a, b, a]));
        assert_eq!(
            TaskEventProcessor::interested_users(&event),
            vec![owner, a, b]
        );
    }

    #[tokio::test]
    async fn payload_summarizes_the_task() {
        let owner = Uuid::now_v7();
        let event = TaskEvent::created(task(owner, vec![]));
        let payload = TaskEventProcessor::payload(&event);
        assert_eq!(payload["kind"], "task_created");
        assert_eq!(payload["title"], "Ship release");
        assert_eq!(payload["status"], "todo");
        assert_eq!(payload["priority"], "high");
    }

    #[tokio::test]
    async fn partial_failure_still_succeeds() {
        let owner = Uuid::now_v7();
        let assignee = Uuid::now_v7();
        let event = TaskEvent::created(task(owner, vec![assignee]));

        let mut repository = MockNotificationRepository::new();
        let mut should_fail = vec![false, true];
        repository.expect_insert().times(2).returning(move |user_id, payload| {
            if should_fail.pop().unwrap() {
                Err(sea_orm::DbErr::Custom("connection reset".to_string()))
            } else {
                Ok(stored(user_id, payload))
            }
        });

        let processor = TaskEventProcessor::new(NotificationService::new(
            Arc::new(repository),
            PushRegistry::new(),
        ));
        processor.handle(&event).await.unwrap();
    }
}
