use axum::response::{IntoResponse, Response};
use axum_helpers::errors::AppError;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => {
                AppError::NotFound(format!("Notification not found: {id}"))
            }
            NotificationError::Database(e) => AppError::Database(e),
            NotificationError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
