//! Stream definitions.

/// Compile-time description of a Redis stream and the consumer group that
/// reads it.
///
/// Each domain defines one type per stream so producers and workers agree
/// on names:
///
/// ```ignore
/// pub struct TaskEventStream;
///
/// impl StreamDef for TaskEventStream {
///     const STREAM_NAME: &'static str = "tasks:events";
///     const CONSUMER_GROUP: &'static str = "notification_workers";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream key (e.g. "tasks:events").
    const STREAM_NAME: &'static str;

    /// The consumer group name for this stream.
    const CONSUMER_GROUP: &'static str;

    /// Maximum stream length before approximate trimming (XADD MAXLEN ~).
    const MAX_LENGTH: i64 = 100_000;

    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
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
    fn test_stream_def_defaults() {
        assert_eq!(TestStream::stream_name(), "test:events");
        assert_eq!(TestStream::consumer_group(), "test_workers");
        assert_eq!(TestStream::MAX_LENGTH, 100_000);
    }
}
