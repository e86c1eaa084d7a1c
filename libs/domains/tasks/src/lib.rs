//! Task domain: CRUD, change history, comments, and event emission.

pub mod entity;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{TaskError, TaskResult};
pub use events::{TaskEvent, TaskEventKind, TaskEventPublisher, TaskEventStream};
pub use models::{Page, Task, TaskPriority, TaskStatus};
pub use repository::TaskRepository;
pub use service::TaskService;
