use crate::streams::StreamDef;
use uuid::Uuid;

/// Configuration for a stream worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream name.
    pub stream_name: String,

    /// Consumer group name.
    pub consumer_group: String,

    /// Unique consumer ID within the group (auto-generated by default).
    pub consumer_id: String,

    /// Batch size for reading messages.
    pub batch_size: usize,

    /// Blocking read timeout in milliseconds (None = non-blocking poll).
    pub block_timeout_ms: Option<u64>,

    /// Poll interval in milliseconds when running non-blocking.
    pub poll_interval_ms: u64,

    /// Idle time in milliseconds after which another consumer's pending
    /// entries are claimed.
    pub claim_idle_ms: u64,
}

impl WorkerConfig {
    /// Create a config from a [`StreamDef`].
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self::new(S::STREAM_NAME, S::CONSUMER_GROUP)
    }

    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            batch_size: 10,
            block_timeout_ms: Some(5000),
            poll_interval_ms: 1000,
            claim_idle_ms: 30_000,
        }
    }

    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_blocking(mut self, timeout_ms: Option<u64>) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    pub fn with_claim_idle_ms(mut self, idle_ms: u64) -> Self {
        self.claim_idle_ms = idle_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStream;
    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:events";
        const CONSUMER_GROUP: &'static str = "test_workers";
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<TestStream>();
        assert_eq!(config.stream_name, "test:events");
        assert_eq!(config.consumer_group, "test_workers");
        assert!(config.consumer_id.starts_with("worker-"));
    }

    #[test]
    fn test_builder() {
        let config = WorkerConfig::new("my:events", "my_workers")
            .with_consumer_id("worker-1")
            .with_batch_size(20)
            .with_blocking(None);
        assert_eq!(config.consumer_id, "worker-1");
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.block_timeout_ms, None);
    }
}
