//! Policies are entities that allow configuring the client's behaviour.
//! Users can plug in their own by implementing the corresponding trait.
//!
//! This includes:
//! - [`LoadBalancingPolicy`](load_balancing::LoadBalancingPolicy), deciding which hosts
//!   a request is sent to and how far each host is,
//! - [`RetryPolicy`](retry::RetryPolicy), deciding whether a failed request is retried,
//! - [`TimestampGenerator`](timestamp_generator::TimestampGenerator), generating
//!   client-side write timestamps.

pub mod load_balancing;
pub mod retry;
pub mod timestamp_generator;
