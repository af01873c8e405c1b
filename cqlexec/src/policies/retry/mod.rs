//! Request retries configurations.
//!
//! Retries themselves are performed by the request handler; the client only
//! resolves which policy applies to a request.

mod fallthrough;
mod retry_policy;

pub use fallthrough::{FallthroughRetryPolicy, FallthroughRetrySession};
pub use retry_policy::{RequestInfo, RetryDecision, RetryPolicy, RetrySession};
