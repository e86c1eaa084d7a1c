//! Redis Streams event bus plumbing.
//!
//! A small framework shared by every service that publishes or consumes
//! domain events:
//!
//! - `EventProducer` appends JSON events with `XADD MAXLEN ~`
//! - `StreamConsumer` manages consumer groups and reads with `XREADGROUP`
//! - `StreamWorker<E, H>` drives a handler in a loop with graceful shutdown
//!
//! Delivery is at-least-once: events are acknowledged after the handler
//! returns, and pending entries are reclaimed on restart, so handlers must
//! be idempotent. A handler failure is logged and the entry is acknowledged
//! anyway; there is no retry queue.
//!
//! ## Example
//!
//! ```ignore
//! struct TaskEventStream;
//! impl StreamDef for TaskEventStream {
//!     const STREAM_NAME: &'static str = "tasks:events";
//!     const CONSUMER_GROUP: &'static str = "notification_workers";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<TaskEventStream>();
//! let worker = StreamWorker::new(redis, handler, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod error;
mod event;
mod producer;
mod streams;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{Batch, StreamConsumer};
pub use error::StreamError;
pub use event::StreamEvent;
pub use producer::EventProducer;
pub use streams::StreamDef;
pub use worker::{StreamHandler, StreamWorker};
