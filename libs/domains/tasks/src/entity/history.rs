use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::TaskHistory {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            user_id: model.user_id,
            field: model.field,
            old_value: model.old_value,
            new_value: model.new_value,
            created_at: model.created_at.into(),
        }
    }
}

impl From<crate::models::NewHistory> for ActiveModel {
    fn from(input: crate::models::NewHistory) -> Self {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            task_id: Set(input.task_id),
            user_id: Set(input.user_id),
            field: Set(input.field),
            old_value: Set(input.old_value),
            new_value: Set(input.new_value),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}
