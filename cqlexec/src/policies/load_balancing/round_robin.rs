use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::{rng, Rng};
use tracing::trace;

use super::{LoadBalancingPolicy, RoutingInfo};
use crate::cluster::{Host, HostDistance, HostMap};

/// Spreads requests evenly over all non-ignored hosts.
///
/// The starting position is picked at random on `init`, so that many
/// clients started together do not hit the same host first.
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
    index: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancingPolicy for RoundRobinPolicy {
    fn init(&self, hosts: &HostMap) {
        if !hosts.is_empty() {
            let start = rng().random_range(0..hosts.len());
            self.index.store(start, Ordering::Relaxed);
            trace!("RoundRobinPolicy initialised with {} hosts", hosts.len());
        }
    }

    fn plan(&self, _request: &RoutingInfo<'_>, hosts: &HostMap) -> Vec<Arc<Host>> {
        let mut eligible: Vec<Arc<Host>> = hosts
            .values()
            .filter(|h| h.distance() != HostDistance::Ignored)
            .cloned()
            .collect();
        if !eligible.is_empty() {
            let offset = self.index.fetch_add(1, Ordering::Relaxed) % eligible.len();
            eligible.rotate_left(offset);
        }
        eligible
    }

    fn name(&self) -> String {
        "RoundRobinPolicy".to_string()
    }
}
