use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// Sea-ORM entity for the notifications table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,
    pub created_at: DateTimeWithTimeZone,
    pub read_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Notification {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            payload: model.payload,
            created_at: model.created_at.into(),
            read_at: model.read_at.map(Into::into),
        }
    }
}

impl Model {
    pub fn new_active(user_id: Uuid, payload: Json) -> ActiveModel {
        ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            payload: Set(payload),
            created_at: Set(chrono::Utc::now().into()),
            read_at: Set(None),
        }
    }
}
