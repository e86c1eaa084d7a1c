//! Sea-ORM entities for the tasks, task_history, and task_comments tables.

pub mod comment;
pub mod history;
pub mod task;
