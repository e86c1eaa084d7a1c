//! Task domain events published to the bus.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_worker::{EventProducer, StreamDef, StreamError};
use strum::{Display, EnumString};

use crate::models::Task;

/// Stream carrying task lifecycle events, consumed by the notifications
/// worker.
pub struct TaskEventStream;

impl StreamDef for TaskEventStream {
    const STREAM_NAME: &'static str = "tasks:events";
    const CONSUMER_GROUP: &'static str = "notification_workers";
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskEventKind {
    TaskCreated,
    TaskUpdated,
}

/// An event on `tasks:events`.
///
/// Carries the full task snapshot after the write, never a diff, so
/// consumers need no prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub kind: TaskEventKind,
    pub task: Task,
    pub emitted_at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn created(task: Task) -> Self {
        Self {
            kind: TaskEventKind::TaskCreated,
            task,
            emitted_at: Utc::now(),
        }
    }

    pub fn updated(task: Task) -> Self {
        Self {
            kind: TaskEventKind::TaskUpdated,
            task,
            emitted_at: Utc::now(),
        }
    }
}

/// Publishing seam so the service can be tested without Redis.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskEventPublisher: Send + Sync {
    async fn publish(&self, event: &TaskEvent) -> Result<(), StreamError>;
}

/// Production publisher backed by the Redis stream producer.
pub struct StreamTaskEventPublisher {
    producer: EventProducer,
}

impl StreamTaskEventPublisher {
    pub fn new(producer: EventProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl TaskEventPublisher for StreamTaskEventPublisher {
    async fn publish(&self, event: &TaskEvent) -> Result<(), StreamError> {
        self.producer.publish(event).await?;
        Ok(())
    }
}
