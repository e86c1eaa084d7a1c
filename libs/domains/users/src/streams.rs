//! Auth domain events published to the bus.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stream_worker::{EventProducer, StreamDef, StreamError};

/// Stream carrying auth lifecycle events, consumed by the email worker.
pub struct AuthEventStream;

impl StreamDef for AuthEventStream {
    const STREAM_NAME: &'static str = "auth:events";
    const CONSUMER_GROUP: &'static str = "email_workers";
}

/// Events emitted by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A user asked for a password reset; carries everything the email
    /// worker needs to render and address the mail.
    PasswordResetRequested {
        email: String,
        reset_token: String,
        username: String,
    },
}

/// Publishing seam so the service can be tested without Redis.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthEventPublisher: Send + Sync {
    async fn publish(&self, event: &AuthEvent) -> Result<(), StreamError>;
}

/// Production publisher backed by the Redis stream producer.
pub struct StreamAuthEventPublisher {
    producer: EventProducer,
}

impl StreamAuthEventPublisher {
    pub fn new(producer: EventProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl AuthEventPublisher for StreamAuthEventPublisher {
    async fn publish(&self, event: &AuthEvent) -> Result<(), StreamError> {
        self.producer.publish(event).await?;
        Ok(())
    }
}
