//! Generic stream worker loop.

use crate::config::WorkerConfig;
use crate::consumer::{Batch, StreamConsumer};
use crate::error::StreamError;
use crate::event::StreamEvent;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Processes events read from a stream.
///
/// Implementations must be idempotent: delivery is at-least-once and the
/// same event may be handled more than once after a crash or claim.
#[async_trait]
pub trait StreamHandler<E>: Send + Sync {
    async fn handle(&self, event: &E) -> Result<(), StreamError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Drives a [`StreamHandler`] against a Redis stream consumer group.
///
/// Every delivered entry is acknowledged exactly once, whether the handler
/// succeeded or not: a handler failure is logged with the full event and the
/// entry is dropped. Consumers that need the data again must rely on their
/// own persistence, not on redelivery.
pub struct StreamWorker<E, H>
where
    E: DeserializeOwned + std::fmt::Debug + Send + Sync,
    H: StreamHandler<E>,
{
    consumer: StreamConsumer,
    handler: Arc<H>,
    config: WorkerConfig,
    _phantom: PhantomData<E>,
}

impl<E, H> StreamWorker<E, H>
where
    E: DeserializeOwned + std::fmt::Debug + Send + Sync + 'static,
    H: StreamHandler<E> + 'static,
{
    pub fn new(redis: ConnectionManager, handler: H, config: WorkerConfig) -> Self {
        Self::with_arc_handler(redis, Arc::new(handler), config)
    }

    pub fn with_arc_handler(
        redis: ConnectionManager,
        handler: Arc<H>,
        config: WorkerConfig,
    ) -> Self {
        let consumer = StreamConsumer::new(redis, config.clone());
        Self {
            consumer,
            handler,
            config,
            _phantom: PhantomData,
        }
    }

    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    /// Run the worker loop until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer_id = %self.config.consumer_id,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            handler = %self.handler.name(),
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let claim_interval = Duration::from_millis(self.config.claim_idle_ms * 2);
        let mut last_claim = std::time::Instant::now();
        let is_blocking = self.config.block_timeout_ms.is_some();

        let mut consecutive_errors: u32 = 0;
        const MAX_BACKOFF_SECS: u64 = 30;

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            match self.process_once().await {
                Ok(_) => {
                    if consecutive_errors > 0 {
                        info!(
                            consecutive_errors = %consecutive_errors,
                            "Stream connection recovered"
                        );
                        consecutive_errors = 0;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if e.is_connection_error() {
                        let backoff_secs =
                            std::cmp::min(2u64.pow(consecutive_errors.min(5)), MAX_BACKOFF_SECS);
                        warn!(
                            error = %e,
                            consecutive_errors = %consecutive_errors,
                            backoff_secs = %backoff_secs,
                            "Redis connection error, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    } else {
                        error!(error = %e, "Error reading stream batch");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    continue;
                }
            }

            if last_claim.elapsed() >= claim_interval {
                match self.consumer.claim_abandoned::<E>().await {
                    Ok(batch) => self.process_batch(batch).await,
                    Err(e) => debug!(error = %e, "Error claiming abandoned entries"),
                }
                last_claim = std::time::Instant::now();
            }

            // With BLOCK set, Redis itself waits for messages
            if !is_blocking {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Received shutdown signal, stopping worker");
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }

        info!("Stream worker stopped");
        Ok(())
    }

    async fn process_once(&self) -> Result<(), StreamError> {
        let pending = self.consumer.read_pending::<E>().await?;
        self.process_batch(pending).await;

        let new = self.consumer.read_new::<E>().await?;
        self.process_batch(new).await;

        Ok(())
    }

    async fn process_batch(&self, batch: Batch<E>) {
        // Undecodable entries are dropped; ack so they leave the pending list
        for stream_id in &batch.malformed {
            self.ack(stream_id).await;
        }

        for event in &batch.events {
            self.process_event(event).await;
        }
    }

    async fn process_event(&self, event: &StreamEvent<E>) {
        debug!(
            stream_id = %event.stream_id,
            handler = %self.handler.name(),
            "Processing event"
        );

        if let Err(e) = self.handler.handle(&event.payload).await {
            // Log-and-drop: the event is acknowledged below regardless
            error!(
                stream_id = %event.stream_id,
                handler = %self.handler.name(),
                event = ?event.payload,
                error = %e,
                "Event handler failed, dropping event"
            );
        }

        self.ack(&event.stream_id).await;
    }

    async fn ack(&self, stream_id: &str) {
        if let Err(e) = self.consumer.ack(stream_id).await {
            error!(stream_id = %stream_id, error = %e, "Failed to ACK entry");
        }
    }
}
