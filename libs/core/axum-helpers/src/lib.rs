//! Shared axum building blocks: standardized error responses, JWT bearer
//! authentication, and validated JSON extraction.

pub mod auth;
pub mod errors;
pub mod extractors;

pub use auth::{
    bearer_auth_middleware, BearerToken, JwtAuth, JwtClaims, JwtConfig, ACCESS_TOKEN_TTL,
    REFRESH_TOKEN_TTL,
};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::ValidatedJson;
