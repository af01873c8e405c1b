//! Cluster collaborators of the client: hosts, the control connection,
//! schema metadata and contact point resolution.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

mod control_connection;
mod host;
mod metadata;
mod resolver;

pub use control_connection::ControlConnection;
pub use host::{ConnectionPool, Host, HostDistance};
pub use metadata::{Metadata, UdtDefinition};
pub(crate) use resolver::resolve_contact_points;
pub use resolver::{DnsResolver, HostnameResolver, KnownNode, DEFAULT_PORT};

/// Snapshot of the known hosts, ordered by address.
pub type HostMap = Arc<BTreeMap<SocketAddr, Arc<Host>>>;
