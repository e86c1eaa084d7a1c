//! Stream consumer.
//!
//! Wraps the consumer-group side of Redis Streams: group creation, reading
//! pending and new entries, claiming entries abandoned by dead consumers,
//! and acknowledgement.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamEvent;
use redis::aio::ConnectionManager;
use redis::RedisResult;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

type StreamEntries = Vec<(String, Vec<(String, String)>)>;
type StreamReadReply = Vec<(String, StreamEntries)>;

/// One read from the stream: successfully decoded events plus the entry IDs
/// of messages that could not be decoded. Malformed entries are surfaced so
/// the worker can acknowledge them; otherwise they would sit in the pending
/// list forever.
pub struct Batch<E> {
    pub events: Vec<StreamEvent<E>>,
    pub malformed: Vec<String>,
}

impl<E> Batch<E> {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.malformed.is_empty()
    }
}

pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    pub fn redis(&self) -> &ConnectionManager {
        &self.redis
    }

    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    /// Create the consumer group if it doesn't exist yet.
    ///
    /// Uses `MKSTREAM` so the worker can start before any event has been
    /// published. An existing group (BUSYGROUP) is not an error.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read entries that were delivered to this consumer but never
    /// acknowledged (crash recovery).
    pub async fn read_pending<E: DeserializeOwned>(&self) -> Result<Batch<E>, StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg("0")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(streams) => Ok(self.decode_reply(streams)),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(Batch {
                events: vec![],
                malformed: vec![],
            }),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read new entries, blocking up to `block_timeout_ms` if configured.
    pub async fn read_new<E: DeserializeOwned>(&self) -> Result<Batch<E>, StreamError> {
        let mut conn = self.redis.clone();

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id);

        if let Some(timeout) = self.config.block_timeout_ms {
            cmd.arg("BLOCK").arg(timeout);
        }

        cmd.arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">");

        let result: RedisResult<Option<StreamReadReply>> = cmd.query_async(&mut conn).await;

        match result {
            Ok(Some(streams)) => Ok(self.decode_reply(streams)),
            // Blocking timeout with no messages
            Ok(None) => Ok(Batch {
                events: vec![],
                malformed: vec![],
            }),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(Batch {
                events: vec![],
                malformed: vec![],
            }),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Claim entries abandoned by other consumers in the group.
    pub async fn claim_abandoned<E: DeserializeOwned>(&self) -> Result<Batch<E>, StreamError> {
        let mut conn = self.redis.clone();

        let pending: RedisResult<Vec<(String, String, i64, i64)>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(self.config.batch_size)
            .query_async(&mut conn)
            .await;

        let pending = match pending {
            Ok(p) => p,
            Err(e) if e.to_string().contains("NOGROUP") => {
                return Ok(Batch {
                    events: vec![],
                    malformed: vec![],
                })
            }
            Err(e) => return Err(StreamError::Redis(e)),
        };

        let claim_ids: Vec<&String> = pending
            .iter()
            .filter(|(_, consumer, idle, _)| {
                *idle > self.config.claim_idle_ms as i64 && consumer != &self.config.consumer_id
            })
            .map(|(id, _, _, _)| id)
            .collect();

        if claim_ids.is_empty() {
            return Ok(Batch {
                events: vec![],
                malformed: vec![],
            });
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg(self.config.claim_idle_ms);
        for id in &claim_ids {
            cmd.arg(*id);
        }

        let entries: StreamEntries = cmd.query_async(&mut conn).await?;
        let batch = self.decode_entries(entries);
        if !batch.is_empty() {
            warn!(
                count = batch.events.len() + batch.malformed.len(),
                "Claimed abandoned stream entries"
            );
        }
        Ok(batch)
    }

    /// Acknowledge a processed entry.
    pub async fn ack(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged entry");
        Ok(())
    }

    fn decode_reply<E: DeserializeOwned>(&self, streams: StreamReadReply) -> Batch<E> {
        let mut batch = Batch {
            events: vec![],
            malformed: vec![],
        };
        for (_stream, entries) in streams {
            let decoded = self.decode_entries(entries);
            batch.events.extend(decoded.events);
            batch.malformed.extend(decoded.malformed);
        }
        batch
    }

    fn decode_entries<E: DeserializeOwned>(&self, entries: StreamEntries) -> Batch<E> {
        let mut events = Vec::new();
        let mut malformed = Vec::new();

        for (stream_id, fields) in entries {
            let payload = fields
                .iter()
                .find(|(k, _)| k == "event")
                .map(|(_, v)| v.as_str());

            match payload {
                Some(json) => match serde_json::from_str::<E>(json) {
                    Ok(event) => events.push(StreamEvent::new(stream_id, event)),
                    Err(e) => {
                        warn!(
                            stream_id = %stream_id,
                            error = %e,
                            "Dropping undecodable event"
                        );
                        malformed.push(stream_id);
                    }
                },
                None => {
                    warn!(
                        stream_id = %stream_id,
                        "Dropping entry without 'event' field"
                    );
                    malformed.push(stream_id);
                }
            }
        }

        Batch { events, malformed }
    }
}
