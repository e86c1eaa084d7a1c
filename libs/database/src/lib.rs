//! Database connectors for PostgreSQL (SeaORM) and Redis.
//!
//! Connection helpers come in plain and `*_with_retry` variants; the retry
//! variants use exponential backoff with jitter to ride out transient network
//! failures during startup.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{self, PostgresConfig};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = postgres::connect_from_config_with_retry(config, None).await?;
//! ```

pub mod common;
pub mod postgres;
pub mod redis;

pub use common::RetryConfig;
