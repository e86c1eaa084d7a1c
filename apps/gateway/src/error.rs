use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_helpers::{AppError, ErrorCode, ErrorResponse};
use thiserror::Error;

/// Failures on the gateway -> downstream hop.
///
/// A downstream service answering with an error status is not a failure of
/// the hop: its response is replayed to the client unchanged.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: Bytes },

    #[error("Upstream transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Timeout => {
                AppError::GatewayTimeout("Upstream request timed out".to_string()).into_response()
            }
            GatewayError::Upstream { status, body } => Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
            // No downstream status to replay, so this falls back to 500.
            GatewayError::Transport(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: ErrorCode::ServiceUnavailable.code(),
                    error: ErrorCode::ServiceUnavailable.as_str().to_string(),
                    message,
                    details: None,
                }),
            )
                .into_response(),
        }
    }
}
