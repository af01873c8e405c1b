use std::fmt::{self, Debug, Display};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

/// How far a host is from the client, as seen by a load balancing policy.
///
/// Pools for [`HostDistance::Ignored`] hosts are not expected to hold any
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostDistance {
    #[default]
    Local,
    Remote,
    Ignored,
}

impl HostDistance {
    fn as_u8(self) -> u8 {
        match self {
            HostDistance::Local => 0,
            HostDistance::Remote => 1,
            HostDistance::Ignored => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => HostDistance::Local,
            1 => HostDistance::Remote,
            _ => HostDistance::Ignored,
        }
    }
}

/// Connections kept open to a single host.
///
/// Implemented by the connection layer; the client only needs to be able to
/// close it when shutting down.
#[async_trait]
pub trait ConnectionPool: Send + Sync + Debug {
    /// Closes all connections of the pool. Must be idempotent.
    async fn shutdown(&self);
}

/// Host represents a cluster node along with its connection pool.
pub struct Host {
    pub host_id: Uuid,
    pub address: SocketAddr,
    pub datacenter: Option<String>,
    pub rack: Option<String>,

    distance: AtomicU8,
    pool: Option<Arc<dyn ConnectionPool>>,
}

impl Host {
    pub fn new(
        host_id: Uuid,
        address: SocketAddr,
        datacenter: Option<String>,
        rack: Option<String>,
    ) -> Self {
        Host {
            host_id,
            address,
            datacenter,
            rack,
            distance: AtomicU8::new(HostDistance::default().as_u8()),
            pool: None,
        }
    }

    /// Attaches the connection pool which will be closed on client shutdown.
    pub fn with_pool(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn pool(&self) -> Option<&Arc<dyn ConnectionPool>> {
        self.pool.as_ref()
    }

    pub fn distance(&self) -> HostDistance {
        HostDistance::from_u8(self.distance.load(Ordering::Relaxed))
    }

    pub fn set_distance(&self, distance: HostDistance) {
        self.distance.store(distance.as_u8(), Ordering::Relaxed);
    }

    pub(crate) async fn shutdown_pool(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }
}

impl Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("host_id", &self.host_id)
            .field("address", &self.address)
            .field("datacenter", &self.datacenter)
            .field("rack", &self.rack)
            .field("distance", &self.distance())
            .finish_non_exhaustive()
    }
}

impl Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.host_id)
    }
}
