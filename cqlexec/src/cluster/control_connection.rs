use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cqlexec_cql::ProtocolVersion;

use super::{Host, HostMap};
use crate::errors::{ConnectError, RequestError};

/// Connection used by the client to discover the cluster.
///
/// The control connection owns the host inventory and the negotiated
/// protocol version. It is bootstrapped once per client by the lifecycle
/// coordinator.
#[async_trait]
pub trait ControlConnection: Send + Sync {
    /// Connects to one of the given contact points and fetches cluster topology.
    async fn init(&self, contact_points: &[SocketAddr]) -> Result<(), ConnectError>;

    /// Known hosts. Empty before `init` succeeds.
    fn hosts(&self) -> HostMap;

    /// Host the control connection is connected to.
    fn host(&self) -> Option<Arc<Host>>;

    /// Protocol version negotiated during `init`.
    fn protocol_version(&self) -> ProtocolVersion;

    /// Refreshes topology and schema information.
    ///
    /// Called periodically when the client is configured with a
    /// metadata refresh interval.
    async fn refresh(&self) -> Result<(), RequestError> {
        Ok(())
    }

    /// Closes the control connection. Must be idempotent.
    async fn shutdown(&self);
}
