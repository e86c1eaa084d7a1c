use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{self, Column, Entity as NotificationEntity};
use crate::models::Notification;
use crate::repository::NotificationRepository;

#[derive(Clone)]
pub struct PgNotificationRepository {
    db: DatabaseConnection,
}

impl PgNotificationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Notification>, DbErr> {
        let found = NotificationEntity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(Into::into))
    }

    async fn insert(
        &self,
        user_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<Notification, DbErr> {
        let active = entity::Model::new_active(user_id, payload);
        let model = NotificationEntity::insert(active)
            .exec_with_returning(&self.db)
            .await?;
        Ok(model.into())
    }

    async fn find_unread(&self, user_id: Uuid) -> Result<Vec<Notification>, DbErr> {
        let rows = NotificationEntity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ReadAt.is_null())
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_recent_read(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Notification>, DbErr> {
        let rows = NotificationEntity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::ReadAt.is_not_null())
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_read_if_unread(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DbErr> {
        // Conditional update so concurrent readers race to a single winner.
        let stamp: sea_orm::prelude::DateTimeWithTimeZone = at.into();
        let result = NotificationEntity::update_many()
            .col_expr(Column::ReadAt, Expr::value(Some(stamp)))
            .filter(Column::Id.eq(id))
            .filter(Column::ReadAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
