use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{TaskError, TaskResult};
use crate::events::{TaskEvent, TaskEventPublisher};
use crate::models::{
    CreateComment, CreateTask, NewHistory, Page, PageQuery, Task, TaskComment, TaskFilter,
    TaskHistory, UpdateTask,
};
use crate::repository::TaskRepository;

/// Service layer for task business logic.
///
/// Events are published strictly after the durable write and are
/// best-effort: a publish failure is logged and the request still
/// succeeds, so a bus outage never blocks task writes.
#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    events: Arc<dyn TaskEventPublisher>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>, events: Arc<dyn TaskEventPublisher>) -> Self {
        Self { repository, events }
    }

    #[instrument(skip(self, input), fields(task_title = %input.title))]
    pub async fn create_task(&self, owner_user_id: Uuid, input: CreateTask) -> TaskResult<Task> {
        input
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;

        let task = self.repository.create(owner_user_id, input).await?;
        self.publish(TaskEvent::created(task.clone())).await;
        Ok(task)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn get_task(&self, id: Uuid) -> TaskResult<Task> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> TaskResult<Vec<Task>> {
        self.repository.list(filter).await
    }

    #[instrument(skip(self, input), fields(task_id = %id))]
    pub async fn update_task(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: UpdateTask,
    ) -> TaskResult<Task> {
        input
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;

        let before = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))?;

        let mut task = before.clone();
        task.apply_update(input);
        let saved = self.repository.save(task).await?;

        let entries = history_entries(user_id, &before, &saved);
        if !entries.is_empty() {
            self.repository.add_history(entries).await?;
        }

        self.publish(TaskEvent::updated(saved.clone())).await;
        Ok(saved)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub async fn delete_task(&self, id: Uuid) -> TaskResult<()> {
        if !self.repository.delete(id).await? {
            return Err(TaskError::NotFound(id));
        }
        Ok(())
    }

    pub async fn task_history(
        &self,
        task_id: Uuid,
        page: PageQuery,
    ) -> TaskResult<Page<TaskHistory>> {
        self.ensure_exists(task_id).await?;
        self.repository
            .history_page(task_id, page.limit, page.offset)
            .await
    }

    pub async fn add_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        input: CreateComment,
    ) -> TaskResult<TaskComment> {
        input
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;
        self.ensure_exists(task_id).await?;
        self.repository.add_comment(task_id, user_id, input).await
    }

    pub async fn task_comments(
        &self,
        task_id: Uuid,
        page: PageQuery,
    ) -> TaskResult<Page<TaskComment>> {
        self.ensure_exists(task_id).await?;
        self.repository
            .comments_page(task_id, page.limit, page.offset)
            .await
    }

    async fn ensure_exists(&self, task_id: Uuid) -> TaskResult<()> {
        self.repository
            .get_by_id(task_id)
            .await?
            .map(|_| ())
            .ok_or(TaskError::NotFound(task_id))
    }

    async fn publish(&self, event: TaskEvent) {
        if let Err(e) = self.events.publish(&event).await {
            tracing::error!(
                task_id = %event.task.id,
                kind = %event.kind,
                error = %e,
                "Failed to publish task event"
            );
        }
    }
}

/// Diff the tracked fields (status, priority, assignees) into history rows.
fn history_entries(user_id: Uuid, before: &Task, after: &Task) -> Vec<NewHistory> {
    let mut entries = Vec::new();

    if before.status != after.status {
        entries.push(NewHistory {
            task_id: after.id,
            user_id,
            field: "status".to_string(),
            old_value: before.status.to_string(),
            new_value: after.status.to_string(),
        });
    }
    if before.priority != after.priority {
        entries.push(NewHistory {
            task_id: after.id,
            user_id,
            field: "priority".to_string(),
            old_value: before.priority.to_string(),
            new_value: after.priority.to_string(),
        });
    }
    if before.assignee_ids != after.assignee_ids {
        entries.push(NewHistory {
            task_id: after.id,
            user_id,
            field: "assignees".to_string(),
            old_value: join_ids(&before.assignee_ids),
            new_value: join_ids(&after.assignee_ids),
        });
    }

    entries
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MockTaskEventPublisher, TaskEventKind};
    use crate::models::{TaskPriority, TaskStatus};
    use crate::repository::MockTaskRepository;
    use chrono::Utc;
    use mockall::Sequence;
    use stream_worker::StreamError;

    fn task_fixture() -> Task {
        Task {
            id: Uuid::now_v7(),
            title: "Write release notes".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            owner_user_id: Uuid::now_v7(),
            assignee_ids: vec![Uuid::now_v7()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(repo: MockTaskRepository, events: MockTaskEventPublisher) -> TaskService {
        TaskService::new(Arc::new(repo), Arc::new(events))
    }

    #[tokio::test]
    async fn test_create_publishes_one_created_event_after_save() {
        let task = task_fixture();
        let task_id = task.id;
        let mut seq = Sequence::new();

        let mut repo = MockTaskRepository::new();
        let saved = task.clone();
        repo.expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(saved.clone()));

        let mut events = MockTaskEventPublisher::new();
        events
            .expect_publish()
            .withf(move |event| {
                event.kind == TaskEventKind::TaskCreated && event.task.id == task_id
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let created = service(repo, events)
            .create_task(
                task.owner_user_id,
                CreateTask {
                    title: "Write release notes".to_string(),
                    description: String::new(),
                    status: TaskStatus::Todo,
                    priority: TaskPriority::Medium,
                    due_date: None,
                    assignee_ids: vec![],
                },
            )
            .await
            .unwrap();

        assert_eq!(created.id, task_id);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_publish_fails() {
        let task = task_fixture();
        let mut repo = MockTaskRepository::new();
        let saved = task.clone();
        repo.expect_create().returning(move |_, _| Ok(saved.clone()));

        let mut events = MockTaskEventPublisher::new();
        events
            .expect_publish()
            .returning(|_| Err(StreamError::handler("bus down")));

        let result = service(repo, events)
            .create_task(
                task.owner_user_id,
                CreateTask {
                    title: "t".to_string(),
                    description: String::new(),
                    status: TaskStatus::Todo,
                    priority: TaskPriority::Medium,
                    due_date: None,
                    assignee_ids: vec![],
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found_and_silent() {
        let mut repo = MockTaskRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));

        let mut events = MockTaskEventPublisher::new();
        events.expect_publish().times(0);

        let result = service(repo, events)
            .update_task(Uuid::now_v7(), Uuid::now_v7(), UpdateTask::default())
            .await;

        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_publishes_full_snapshot() {
        let task = task_fixture();
        let task_id = task.id;

        let mut repo = MockTaskRepository::new();
        let existing = task.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_save().returning(|task| Ok(task));

        let mut events = MockTaskEventPublisher::new();
        events
            .expect_publish()
            .withf(move |event| {
                event.kind == TaskEventKind::TaskUpdated
                    && event.task.id == task_id
                    && event.task.title == "Renamed"
            })
            .times(1)
            .returning(|_| Ok(()));

        let updated = service(repo, events)
            .update_task(
                task_id,
                task.owner_user_id,
                UpdateTask {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
    }

    #[tokio::test]
    async fn test_status_change_appends_history_row() {
        let task = task_fixture();
        let task_id = task.id;
        let editor = Uuid::now_v7();

        let mut repo = MockTaskRepository::new();
        let existing = task.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_save().returning(|task| Ok(task));
        repo.expect_add_history()
            .withf(move |entries| {
                entries.len() == 1
                    && entries[0].task_id == task_id
                    && entries[0].user_id == editor
                    && entries[0].field == "status"
                    && entries[0].old_value == "todo"
                    && entries[0].new_value == "in_progress"
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut events = MockTaskEventPublisher::new();
        events.expect_publish().returning(|_| Ok(()));

        service(repo, events)
            .update_task(
                task_id,
                editor,
                UpdateTask {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_title_only_change_records_no_history() {
        let task = task_fixture();

        let mut repo = MockTaskRepository::new();
        let existing = task.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_save().returning(|task| Ok(task));
        repo.expect_add_history().times(0);

        let mut events = MockTaskEventPublisher::new();
        events.expect_publish().returning(|_| Ok(()));

        service(repo, events)
            .update_task(
                task.id,
                task.owner_user_id,
                UpdateTask {
                    title: Some("New title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_task_is_not_found() {
        let mut repo = MockTaskRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let result = service(repo, MockTaskEventPublisher::new())
            .delete_task(Uuid::now_v7())
            .await;

        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_comment_on_missing_task_is_not_found() {
        let mut repo = MockTaskRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));

        let result = service(repo, MockTaskEventPublisher::new())
            .add_comment(
                Uuid::now_v7(),
                Uuid::now_v7(),
                CreateComment {
                    content: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }
}
