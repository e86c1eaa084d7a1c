use axum_helpers::JwtConfig;
use core_config::{
    app_info, env_or_default, server::ServerConfig, AppInfo, ConfigError, Environment, FromEnv,
};
use std::time::Duration;

/// Base URLs and timeout for the downstream services.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub tasks_url: String,
    pub auth_url: String,
    pub notifications_url: String,
    /// Per-request deadline for downstream calls.
    pub timeout: Duration,
}

impl FromEnv for UpstreamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_or_default("GATEWAY_UPSTREAM_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| ConfigError::ParseError {
                key: "GATEWAY_UPSTREAM_TIMEOUT_SECS".to_string(),
                details: format!("{e}"),
            })?;

        Ok(Self {
            tasks_url: env_or_default("TASKS_SERVICE_URL", "http://localhost:8081"),
            auth_url: env_or_default("AUTH_SERVICE_URL", "http://localhost:8082"),
            notifications_url: env_or_default("NOTIFICATIONS_SERVICE_URL", "http://localhost:8083"),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Gateway configuration, composed from shared config components.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub upstream: UpstreamConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            upstream: UpstreamConfig::from_env()?,
            environment: Environment::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_defaults() {
        temp_env::with_vars(
            [
                ("TASKS_SERVICE_URL", None::<&str>),
                ("GATEWAY_UPSTREAM_TIMEOUT_SECS", None),
            ],
            || {
                let config = UpstreamConfig::from_env().unwrap();
                assert_eq!(config.tasks_url, "http://localhost:8081");
                assert_eq!(config.timeout, Duration::from_secs(10));
            },
        );
    }

    #[test]
    fn test_upstream_timeout_override() {
        temp_env::with_var("GATEWAY_UPSTREAM_TIMEOUT_SECS", Some("3"), || {
            let config = UpstreamConfig::from_env().unwrap();
            assert_eq!(config.timeout, Duration::from_secs(3));
        });
    }
}
