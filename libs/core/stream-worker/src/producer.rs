//! Event producer.
//!
//! Services publish domain events through an [`EventProducer`] after the
//! triggering write has been committed. Publishing is best-effort from the
//! caller's point of view: callers log a failed publish and carry on, so the
//! originating request never fails because the bus is down.

use crate::error::StreamError;
use crate::streams::StreamDef;
use redis::aio::ConnectionManager;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Appends JSON-serialized events to a Redis stream.
pub struct EventProducer {
    redis: Arc<ConnectionManager>,
    stream_name: String,
    max_length: i64,
}

impl EventProducer {
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: stream_name.into(),
            max_length: 100_000,
        }
    }

    /// Create a producer from a [`StreamDef`], keeping the stream name and
    /// trim length consistent with the consuming worker.
    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: S::STREAM_NAME.to_string(),
            max_length: S::MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Publish one event. Returns the Redis stream entry ID.
    ///
    /// Uses `XADD MAXLEN ~` so the stream is trimmed approximately rather
    /// than on every append.
    pub async fn publish<E: Serialize>(&self, event: &E) -> Result<String, StreamError> {
        let mut conn = (*self.redis).clone();

        let payload = serde_json::to_string(event)?;

        let stream_id: String = redis::cmd("XADD")
            .arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg("event")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream_name,
            stream_id = %stream_id,
            "Published event"
        );

        Ok(stream_id)
    }
}

impl Clone for EventProducer {
    fn clone(&self) -> Self {
        Self {
            redis: self.redis.clone(),
            stream_name: self.stream_name.clone(),
            max_length: self.max_length,
        }
    }
}
