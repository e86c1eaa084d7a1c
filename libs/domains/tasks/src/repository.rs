use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TaskResult;
use crate::models::{
    CreateComment, CreateTask, NewHistory, Page, Task, TaskComment, TaskFilter, TaskHistory,
};

/// Repository trait for task persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, owner_user_id: Uuid, input: CreateTask) -> TaskResult<Task>;

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>>;

    async fn list(&self, filter: TaskFilter) -> TaskResult<Vec<Task>>;

    /// Persist a full task row (used after `Task::apply_update`).
    async fn save(&self, task: Task) -> TaskResult<Task>;

    async fn delete(&self, id: Uuid) -> TaskResult<bool>;

    /// Append history rows recording field changes.
    async fn add_history(&self, entries: Vec<NewHistory>) -> TaskResult<()>;

    async fn history_page(
        &self,
        task_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> TaskResult<Page<TaskHistory>>;

    async fn add_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        input: CreateComment,
    ) -> TaskResult<TaskComment>;

    async fn comments_page(
        &self,
        task_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> TaskResult<Page<TaskComment>>;
}
