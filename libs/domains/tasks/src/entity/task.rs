use crate::models::{TaskPriority, TaskStatus};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub owner_user_id: Uuid,
    pub assignee_ids: Vec<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Task {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date.map(Into::into),
            owner_user_id: model.owner_user_id,
            assignee_ids: model.assignee_ids,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Task> for ActiveModel {
    fn from(task: crate::models::Task) -> Self {
        ActiveModel {
            id: Set(task.id),
            title: Set(task.title),
            description: Set(task.description),
            status: Set(task.status),
            priority: Set(task.priority),
            due_date: Set(task.due_date.map(Into::into)),
            owner_user_id: Set(task.owner_user_id),
            assignee_ids: Set(task.assignee_ids),
            created_at: Set(task.created_at.into()),
            updated_at: Set(task.updated_at.into()),
        }
    }
}
