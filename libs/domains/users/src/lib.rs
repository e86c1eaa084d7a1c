//! User and auth domain: account registration, credential login, refresh-token
//! rotation, the password-reset lifecycle, and user profile queries.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod streams;

pub use error::{UserError, UserResult};
pub use models::{AuthTokens, User, UserProfile};
pub use repository::UserRepository;
pub use service::UserService;
pub use streams::{AuthEvent, AuthEventPublisher, AuthEventStream};
