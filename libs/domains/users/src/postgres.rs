use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{UserError, UserResult},
    models::{NewUser, User},
    repository::UserRepository,
};

pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: NewUser) -> UserResult<User> {
        let email = input.email.clone();
        let active_model: entity::ActiveModel = input.into();

        let model = entity::Entity::insert(active_model)
            .exec_with_returning(&self.db)
            .await
            .map_err(|e| {
                // Unique index on email
                if e.to_string().contains("duplicate key") {
                    UserError::DuplicateEmail(email)
                } else {
                    UserError::Database(e.to_string())
                }
            })?;

        tracing::info!(user_id = %model.id, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_reset_token(&self, token: &str) -> UserResult<Option<User>> {
        let model = entity::Entity::find()
            .filter(entity::Column::ResetToken.eq(token))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self) -> UserResult<Vec<User>> {
        let models = entity::Entity::find()
            .order_by_desc(entity::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn set_refresh_fingerprint(
        &self,
        user_id: Uuid,
        fingerprint: Option<String>,
    ) -> UserResult<()> {
        entity::Entity::update_many()
            .col_expr(entity::Column::RefreshTokenHash, Expr::value(fingerprint))
            .col_expr(entity::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(entity::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_fingerprint(
        &self,
        user_id: Uuid,
        current: &str,
        next: &str,
    ) -> UserResult<bool> {
        // Single UPDATE keyed on the current fingerprint; a concurrent
        // rotation with the same token leaves exactly one winner.
        let result = entity::Entity::update_many()
            .col_expr(
                entity::Column::RefreshTokenHash,
                Expr::value(Some(next.to_string())),
            )
            .col_expr(entity::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(entity::Column::Id.eq(user_id))
            .filter(entity::Column::RefreshTokenHash.eq(current))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> UserResult<()> {
        entity::Entity::update_many()
            .col_expr(
                entity::Column::ResetToken,
                Expr::value(Some(token.to_string())),
            )
            .col_expr(entity::Column::ResetTokenExpiry, Expr::value(Some(expiry)))
            .col_expr(entity::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(entity::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn reset_password_if_token_matches(
        &self,
        user_id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> UserResult<bool> {
        let result = entity::Entity::update_many()
            .col_expr(
                entity::Column::PasswordHash,
                Expr::value(password_hash.to_string()),
            )
            .col_expr(entity::Column::ResetToken, Expr::value(Option::<String>::None))
            .col_expr(
                entity::Column::ResetTokenExpiry,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(entity::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(entity::Column::Id.eq(user_id))
            .filter(entity::Column::ResetToken.eq(token))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
