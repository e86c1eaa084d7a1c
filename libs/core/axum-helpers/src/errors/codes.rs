//! Type-safe error codes for API responses.
//!
//! Single source of truth for the error identifiers clients see and the
//! integer codes monitoring keys on.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standardized error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request validation failed
    ValidationError,

    /// Invalid UUID format in path or query parameter
    InvalidUuid,

    /// Requested resource was not found
    NotFound,

    /// Authentication credentials are missing or invalid
    Unauthorized,

    /// Authenticated user lacks sufficient permissions
    Forbidden,

    /// Request conflicts with current resource state
    Conflict,

    /// A presented token is past its expiry
    TokenExpired,

    /// JSON extraction from request body failed
    JsonExtraction,

    // Server errors (2000-2999)
    /// An unexpected internal server error occurred
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// A downstream service call timed out
    UpstreamTimeout,

    /// Database connection or query error
    DatabaseError,

    /// JSON (de)serialization failed server-side
    SerdeJsonError,

    /// I/O error
    IoError,
}

impl ErrorCode {
    /// String identifier for client consumption
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidUuid => "INVALID_UUID",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::JsonExtraction => "JSON_EXTRACTION",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::SerdeJsonError => "SERDE_JSON_ERROR",
            ErrorCode::IoError => "IO_ERROR",
        }
    }

    /// Integer code for logging and monitoring
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidUuid => 1002,
            ErrorCode::NotFound => 1003,
            ErrorCode::Unauthorized => 1004,
            ErrorCode::Forbidden => 1005,
            ErrorCode::Conflict => 1006,
            ErrorCode::TokenExpired => 1007,
            ErrorCode::JsonExtraction => 1008,
            ErrorCode::InternalError => 2000,
            ErrorCode::ServiceUnavailable => 2001,
            ErrorCode::UpstreamTimeout => 2002,
            ErrorCode::DatabaseError => 2100,
            ErrorCode::SerdeJsonError => 2101,
            ErrorCode::IoError => 2102,
        }
    }

    /// Default human-readable message
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Request validation failed",
            ErrorCode::InvalidUuid => "Invalid UUID format",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access denied",
            ErrorCode::Conflict => "Resource already exists",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::JsonExtraction => "Invalid JSON in request body",
            ErrorCode::InternalError => "An internal error occurred",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::UpstreamTimeout => "Upstream service timed out",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::SerdeJsonError => "Serialization failed",
            ErrorCode::IoError => "I/O operation failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::TokenExpired.as_str(), "TOKEN_EXPIRED");
    }

    #[test]
    fn test_error_code_numbers() {
        assert_eq!(ErrorCode::ValidationError.code(), 1001);
        assert_eq!(ErrorCode::InternalError.code(), 2000);
    }
}
