//! Notification domain: consumes task events, persists per-user
//! notifications, serves the query API, and pushes live updates over
//! WebSocket.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod processor;
pub mod push;
pub mod repository;
pub mod service;

pub use error::{NotificationError, NotificationResult};
pub use models::Notification;
pub use processor::TaskEventProcessor;
pub use push::PushRegistry;
pub use repository::NotificationRepository;
pub use service::NotificationService;
