//! The client: option resolution, lifecycle and request dispatch.

mod client_builder;
mod dispatcher;
mod events;
pub mod execution_profile;
mod handlers;
mod lifecycle;
pub mod options;
mod prepared_cache;
mod schema_agreement;

pub use client_builder::{ClientBuilder, ClientConfig};
pub use dispatcher::Client;
pub use events::{ClientEvent, ClientEventListener, LogLevel};
pub use handlers::{PrepareHandler, RequestHandler};
pub use lifecycle::LifecycleState;
