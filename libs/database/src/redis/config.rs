use core_config::{env_required, ConfigError, FromEnv};

/// Redis connection configuration
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Load RedisConfig from the `REDIS_URL` environment variable (required)
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("REDIS_URL")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_requires_redis_url() {
        temp_env::with_var_unset("REDIS_URL", || {
            assert!(RedisConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_from_env_reads_url() {
        temp_env::with_var("REDIS_URL", Some("redis://cache:6379"), || {
            let config = RedisConfig::from_env().unwrap();
            assert_eq!(config.url, "redis://cache:6379");
        });
    }
}
