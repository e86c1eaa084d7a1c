use thiserror::Error;

/// Errors from stream operations and event handlers.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// Wrap a handler-level failure.
    pub fn handler(message: impl Into<String>) -> Self {
        StreamError::Handler(message.into())
    }

    /// Connection-level Redis failures warrant a backoff before the next
    /// read; everything else is per-message.
    pub fn is_connection_error(&self) -> bool {
        match self {
            StreamError::Redis(e) => {
                e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_display() {
        let err = StreamError::handler("database write failed");
        assert_eq!(err.to_string(), "Handler error: database write failed");
    }

    #[test]
    fn test_serialization_error_is_not_connection_error() {
        let err: StreamError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(!err.is_connection_error());
    }
}
