use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    /// Unknown email, bad password, or refresh-token mismatch. One variant
    /// for all of them so responses don't reveal which part failed.
    #[error("Access denied")]
    AccessDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::AccessDenied => AppError::Forbidden("Access denied".to_string()),
            UserError::NotFound(msg) => AppError::NotFound(msg),
            UserError::DuplicateEmail(email) => {
                AppError::Conflict(format!("Email {} already registered", email))
            }
            UserError::Expired(msg) => AppError::Expired(msg),
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::Database(msg) => {
                AppError::InternalServerError(format!("Database error: {}", msg))
            }
            UserError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        UserError::Database(err.to_string())
    }
}
