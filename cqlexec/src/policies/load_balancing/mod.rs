//! Load balancing configurations\
//! The client can use any load balancing policy which implements the
//! `LoadBalancingPolicy` trait. Each execution profile may carry its own
//! policy; every distinct policy is initialised once the client connects.

use std::fmt::Debug;
use std::sync::Arc;

use cqlexec_cql::Consistency;

use crate::cluster::{Host, HostDistance, HostMap};

mod round_robin;
pub use round_robin::RoundRobinPolicy;

/// Represents info about a request that can be used by load balancing policies.
#[derive(Default, Clone, Debug)]
pub struct RoutingInfo<'a> {
    pub consistency: Consistency,
    pub keyspace: Option<&'a str>,
    /// Serialized partition key, the basis of token-aware routing.
    pub routing_key: Option<&'a [u8]>,
}

/// Policy that decides which hosts to contact for each request.
pub trait LoadBalancingPolicy: Send + Sync + Debug {
    /// Invoked once, after the client connects, with the initial host inventory.
    fn init(&self, _hosts: &HostMap) {}

    /// Distance of the host from the client. Used to size host pools.
    fn distance(&self, _host: &Host) -> HostDistance {
        HostDistance::Local
    }

    /// Returns hosts to contact for the request, most preferred first.
    fn plan(&self, request: &RoutingInfo<'_>, hosts: &HostMap) -> Vec<Arc<Host>>;

    /// Returns the name of load balancing policy.
    fn name(&self) -> String;
}
