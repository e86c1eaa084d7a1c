/// A decoded stream entry: the Redis entry ID plus the event payload.
#[derive(Debug, Clone)]
pub struct StreamEvent<E> {
    /// Redis stream entry ID (e.g. "1716300000000-0").
    pub stream_id: String,
    /// The deserialized event payload.
    pub payload: E,
}

impl<E> StreamEvent<E> {
    pub fn new(stream_id: impl Into<String>, payload: E) -> Self {
        Self {
            stream_id: stream_id.into(),
            payload,
        }
    }
}
