use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgBinOper;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use uuid::Uuid;

use crate::{
    entity,
    error::TaskResult,
    models::{
        CreateComment, CreateTask, NewHistory, Page, Task, TaskComment, TaskFilter, TaskHistory,
    },
    repository::TaskRepository,
};

pub struct PgTaskRepository {
    db: DatabaseConnection,
}

impl PgTaskRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, owner_user_id: Uuid, input: CreateTask) -> TaskResult<Task> {
        let now = Utc::now();
        let active_model = entity::task::ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(input.title),
            description: Set(input.description),
            status: Set(input.status),
            priority: Set(input.priority),
            due_date: Set(input.due_date.map(Into::into)),
            owner_user_id: Set(owner_user_id),
            assignee_ids: Set(input.assignee_ids),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = entity::task::Entity::insert(active_model)
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(task_id = %model.id, "Created task");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        let model = entity::task::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: TaskFilter) -> TaskResult<Vec<Task>> {
        let models = list_query(&filter).all(&self.db).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn save(&self, task: Task) -> TaskResult<Task> {
        let active_model: entity::task::ActiveModel = task.into();
        let model = entity::task::Entity::update(active_model)
            .exec(&self.db)
            .await?;

        tracing::info!(task_id = %model.id, "Updated task");
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let result = entity::task::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected > 0 {
            tracing::info!(task_id = %id, "Deleted task");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn add_history(&self, entries: Vec<NewHistory>) -> TaskResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let active_models: Vec<entity::history::ActiveModel> =
            entries.into_iter().map(Into::into).collect();
        entity::history::Entity::insert_many(active_models)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn history_page(
        &self,
        task_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> TaskResult<Page<TaskHistory>> {
        let total = entity::history::Entity::find()
            .filter(entity::history::Column::TaskId.eq(task_id))
            .count(&self.db)
            .await?;

        let models = entity::history::Entity::find()
            .filter(entity::history::Column::TaskId.eq(task_id))
            .order_by_desc(entity::history::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        Ok(Page {
            data: models.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    async fn add_comment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        input: CreateComment,
    ) -> TaskResult<TaskComment> {
        let active_model = entity::comment::ActiveModel {
            id: Set(Uuid::now_v7()),
            task_id: Set(task_id),
            user_id: Set(user_id),
            content: Set(input.content),
            created_at: Set(Utc::now().into()),
        };

        let model = entity::comment::Entity::insert(active_model)
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(task_id = %task_id, comment_id = %model.id, "Added comment");
        Ok(model.into())
    }

    async fn comments_page(
        &self,
        task_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> TaskResult<Page<TaskComment>> {
        let total = entity::comment::Entity::find()
            .filter(entity::comment::Column::TaskId.eq(task_id))
            .count(&self.db)
            .await?;

        let models = entity::comment::Entity::find()
            .filter(entity::comment::Column::TaskId.eq(task_id))
            .order_by_desc(entity::comment::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        Ok(Page {
            data: models.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }
}

/// All filters apply in SQL so `LIMIT`/`OFFSET` see the final result set.
/// Assignee membership uses postgres array containment on `assignee_ids`.
fn list_query(filter: &TaskFilter) -> Select<entity::task::Entity> {
    let mut query = entity::task::Entity::find();

    if let Some(status) = filter.status {
        query = query.filter(entity::task::Column::Status.eq(status));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(entity::task::Column::Priority.eq(priority));
    }
    if let Some(assignee_id) = filter.assignee_id {
        query = query.filter(
            Expr::col(entity::task::Column::AssigneeIds)
                .binary(PgBinOper::Contains, Expr::value(vec![assignee_id])),
        );
    }

    query
        .order_by_desc(entity::task::Column::CreatedAt)
        .limit(filter.limit)
        .offset(filter.offset)
}
