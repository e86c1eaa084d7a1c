use core_config::{env_required, ConfigError, FromEnv};

/// JWT signing configuration.
///
/// Access and refresh tokens are signed with separate secrets so a leaked
/// access secret cannot mint refresh tokens.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub refresh_secret: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            refresh_secret: refresh_secret.into(),
        }
    }
}

/// Load from `JWT_SECRET` and `JWT_REFRESH_SECRET` (both required)
impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env_required("JWT_SECRET")?,
            refresh_secret: env_required("JWT_REFRESH_SECRET")?,
        })
    }
}
