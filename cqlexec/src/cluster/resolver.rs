use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use itertools::Itertools;
use thiserror::Error;
use tokio::net::lookup_host;
use tracing::{debug, warn};

/// Port used for contact points given without one.
pub const DEFAULT_PORT: u16 = 9042;

/// A contact point given in the client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KnownNode {
    /// `host` or `host:port`, resolved with the configured [`HostnameResolver`].
    Hostname(String),
    Address(SocketAddr),
}

impl From<&str> for KnownNode {
    fn from(s: &str) -> Self {
        match s.parse::<SocketAddr>() {
            Ok(addr) => KnownNode::Address(addr),
            Err(_) => KnownNode::Hostname(s.to_owned()),
        }
    }
}

impl From<String> for KnownNode {
    fn from(s: String) -> Self {
        KnownNode::from(s.as_str())
    }
}

impl From<SocketAddr> for KnownNode {
    fn from(addr: SocketAddr) -> Self {
        KnownNode::Address(addr)
    }
}

/// Translates contact point names into socket addresses.
#[async_trait]
pub trait HostnameResolver: Send + Sync + Debug {
    async fn resolve(&self, hostname: &str) -> io::Result<Vec<SocketAddr>>;
}

/// Resolves hostnames with the system resolver.
///
/// Names without a port are resolved with [`DEFAULT_PORT`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

#[async_trait]
impl HostnameResolver for DnsResolver {
    async fn resolve(&self, hostname: &str) -> io::Result<Vec<SocketAddr>> {
        // `lookup_host` on a string expects "hostname:port", so a bare name
        // fails immediately and is retried with the default port.
        match lookup_host(hostname).await {
            Ok(addrs) => Ok(addrs.collect()),
            Err(e) => lookup_host((hostname, DEFAULT_PORT))
                .await
                .map(|addrs| addrs.collect())
                .or(Err(e)),
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum DnsLookupError {
    #[error("Failed to perform DNS lookup within {0}ms")]
    Timeout(u128),
    #[error("Empty address list returned by DNS for {0}")]
    EmptyAddressListForHost(String),
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// Outcome of contact point resolution.
#[derive(Debug, Default, Clone)]
pub(crate) struct ResolvedContactPoints {
    /// Every address to try, without duplicates, in configuration order.
    pub(crate) addresses: Vec<SocketAddr>,
    /// Addresses each configured name resolved to, empty if it did not resolve.
    pub(crate) by_name: BTreeMap<String, Vec<SocketAddr>>,
    /// Hostnames which could not be resolved.
    pub(crate) unresolved: Vec<String>,
}

async fn resolve_hostname(
    resolver: &dyn HostnameResolver,
    hostname: &str,
    hostname_resolution_timeout: Option<Duration>,
) -> Result<Vec<SocketAddr>, DnsLookupError> {
    let addrs = match hostname_resolution_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, resolver.resolve(hostname)).await {
            Ok(res) => res?,
            // Elapsed error from tokio library does not provide any context.
            Err(_) => return Err(DnsLookupError::Timeout(timeout.as_millis())),
        },
        None => resolver.resolve(hostname).await?,
    };
    if addrs.is_empty() {
        return Err(DnsLookupError::EmptyAddressListForHost(hostname.to_owned()));
    }
    Ok(addrs)
}

/// Transforms the given [`KnownNode`]s into socket addresses.
///
/// Hostnames are resolved concurrently. Failures are logged and reported
/// back in [`ResolvedContactPoints::unresolved`].
pub(crate) async fn resolve_contact_points(
    known_nodes: &[KnownNode],
    resolver: &dyn HostnameResolver,
    hostname_resolution_timeout: Option<Duration>,
) -> ResolvedContactPoints {
    let resolve_futures = known_nodes.iter().map(|node| async move {
        match node {
            KnownNode::Address(addr) => (addr.to_string(), Ok(vec![*addr])),
            KnownNode::Hostname(hostname) => (
                hostname.clone(),
                resolve_hostname(resolver, hostname, hostname_resolution_timeout).await,
            ),
        }
    });
    let results = futures::future::join_all(resolve_futures).await;

    let mut resolved = ResolvedContactPoints::default();
    for (name, result) in results {
        match result {
            Ok(addrs) => {
                debug!("Contact point {} resolved to {:?}", name, addrs);
                resolved.addresses.extend(addrs.iter().copied());
                resolved.by_name.insert(name, addrs);
            }
            Err(e) => {
                warn!("Hostname resolution failed for {}: {}", name, &e);
                resolved.by_name.insert(name.clone(), Vec::new());
                resolved.unresolved.push(name);
            }
        }
    }
    resolved.addresses = resolved.addresses.into_iter().unique().collect();
    resolved
}
