//! Routing keys, the serialized partition key used for token-aware routing.

mod routing_key;

pub use routing_key::{RoutingKeyBuilder, RoutingSpec};
