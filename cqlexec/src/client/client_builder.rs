//! Configuration of a [`Client`] and the builder creating it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cqlexec_cql::types::{DefaultEncoder, Encoder};
use cqlexec_cql::{Consistency, SerialConsistency};

use super::events::ClientEventListener;
use super::execution_profile::{ExecutionProfile, ProfileDefaults};
use super::handlers::{PrepareHandler, RequestHandler};
use super::prepared_cache::DEFAULT_MAX_PREPARED_CACHE_SIZE;
use super::schema_agreement::{DEFAULT_MAX_SCHEMA_AGREEMENT_WAIT, DEFAULT_SCHEMA_AGREEMENT_INTERVAL};
use super::Client;
use crate::cluster::{ControlConnection, DnsResolver, HostnameResolver, KnownNode, Metadata};
use crate::errors::ClientBuildError;
use crate::policies::load_balancing::LoadBalancingPolicy;
use crate::policies::retry::RetryPolicy;
use crate::policies::timestamp_generator::{MonotonicTimestampGenerator, TimestampGenerator};

/// Configuration options for [`Client`].
/// Can be created manually, but usually it's easier to use
/// [ClientBuilder](ClientBuilder)
#[derive(Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    /// List of database servers known on Client startup.
    /// Client will resolve hostnames and connect to them at bootstrap.
    pub known_nodes: Vec<KnownNode>,

    /// Keyspace of requests which do not name one.
    pub keyspace: Option<String>,

    /// Options of the default execution profile, unless a profile named
    /// `"default"` is supplied. Options such a profile leaves unset are
    /// taken from here.
    pub default_profile: ProfileDefaults,

    /// Whether requests are idempotent unless they say otherwise.
    pub default_is_idempotent: bool,

    /// Whether requests are prepared unless they say otherwise.
    pub default_prepare: bool,

    /// Named execution profiles, selectable per request.
    pub execution_profiles: Vec<ExecutionProfile>,

    /// Maximum number of cached prepared statements. Zero disables the cache.
    pub max_prepared_cache_size: usize,

    /// Generator of client-side timestamps. `None` leaves timestamps to the server.
    pub timestamp_generator: Option<Arc<dyn TimestampGenerator>>,

    /// Interval between schema version comparisons while awaiting schema agreement.
    pub schema_agreement_interval: Duration,

    /// Maximum time spent awaiting schema agreement. Zero disables waiting.
    pub max_schema_agreement_wait: Duration,

    /// If true, the client awaits schema agreement after each schema change.
    pub schema_agreement_automatic_waiting: bool,

    /// Timeout of resolving a single contact point hostname. `None` means no timeout.
    pub hostname_resolution_timeout: Option<Duration>,

    /// Interval of the periodic metadata refresh. `None` disables it.
    pub cluster_metadata_refresh_interval: Option<Duration>,

    pub control_connection: Option<Arc<dyn ControlConnection>>,
    pub request_handler: Option<Arc<dyn RequestHandler>>,
    pub prepare_handler: Option<Arc<dyn PrepareHandler>>,
    pub metadata: Option<Arc<dyn Metadata>>,
    pub encoder: Arc<dyn Encoder>,
    pub hostname_resolver: Arc<dyn HostnameResolver>,

    /// Listeners registered before the client is created.
    pub listeners: Vec<Arc<dyn ClientEventListener>>,
}

impl ClientConfig {
    /// Creates a [`ClientConfig`] with default configuration
    /// # Default configuration
    /// * Consistency: `LocalOne`, serial consistency: `Serial`
    /// * Read timeout: 12 seconds
    /// * Client timestamps from a [`MonotonicTimestampGenerator`]
    /// * Schema agreement polled every 200 ms, for up to 10 seconds
    /// * Up to 1000 cached prepared statements
    ///
    /// # Example
    /// ```
    /// # use cqlexec::client::ClientConfig;
    /// let config = ClientConfig::new();
    /// assert!(config.schema_agreement_automatic_waiting);
    /// ```
    pub fn new() -> Self {
        ClientConfig {
            known_nodes: Vec::new(),
            keyspace: None,
            default_profile: ProfileDefaults::default(),
            default_is_idempotent: false,
            default_prepare: false,
            execution_profiles: Vec::new(),
            max_prepared_cache_size: DEFAULT_MAX_PREPARED_CACHE_SIZE,
            timestamp_generator: Some(Arc::new(MonotonicTimestampGenerator::new())),
            schema_agreement_interval: DEFAULT_SCHEMA_AGREEMENT_INTERVAL,
            max_schema_agreement_wait: DEFAULT_MAX_SCHEMA_AGREEMENT_WAIT,
            schema_agreement_automatic_waiting: true,
            hostname_resolution_timeout: Some(Duration::from_secs(5)),
            cluster_metadata_refresh_interval: None,
            control_connection: None,
            request_handler: None,
            prepare_handler: None,
            metadata: None,
            encoder: Arc::new(DefaultEncoder::new()),
            hostname_resolver: Arc::new(DnsResolver),
            listeners: Vec::new(),
        }
    }

    /// Adds a known database server with a hostname.
    /// If the port is not explicitly specified, 9042 is used as default
    pub fn add_known_node(&mut self, hostname: impl AsRef<str>) {
        self.known_nodes.push(KnownNode::from(hostname.as_ref()));
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("known_nodes", &self.known_nodes)
            .field("keyspace", &self.keyspace)
            .field("default_profile", &self.default_profile)
            .field("default_is_idempotent", &self.default_is_idempotent)
            .field("default_prepare", &self.default_prepare)
            .field("execution_profiles", &self.execution_profiles)
            .field("max_prepared_cache_size", &self.max_prepared_cache_size)
            .field("timestamp_generator", &self.timestamp_generator)
            .field("schema_agreement_interval", &self.schema_agreement_interval)
            .field("max_schema_agreement_wait", &self.max_schema_agreement_wait)
            .field(
                "schema_agreement_automatic_waiting",
                &self.schema_agreement_automatic_waiting,
            )
            .field(
                "hostname_resolution_timeout",
                &self.hostname_resolution_timeout,
            )
            .field(
                "cluster_metadata_refresh_interval",
                &self.cluster_metadata_refresh_interval,
            )
            .field("encoder", &self.encoder)
            .field("hostname_resolver", &self.hostname_resolver)
            .finish_non_exhaustive()
    }
}

/// Builder of [`Client`]s.
///
/// Building does not connect: the client connects on first use, or when
/// [`Client::connect`] is called.
///
/// # Example
///
/// ```
/// # use std::time::Duration;
/// # use cqlexec::client::ClientBuilder;
/// # use cqlexec::Consistency;
/// let builder = ClientBuilder::new()
///     .known_node("127.0.0.1:9042")
///     .known_node("db.example.com")
///     .use_keyspace("ks")
///     .default_consistency(Consistency::Quorum)
///     .schema_agreement_interval(Duration::from_millis(100));
/// assert_eq!(builder.config.known_nodes.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientBuilder {
    pub config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder {
            config: ClientConfig::new(),
        }
    }

    /// Adds a known database server with a hostname or an address.
    /// If the port is not explicitly specified, 9042 is used as default
    pub fn known_node(mut self, hostname: impl AsRef<str>) -> Self {
        self.config.add_known_node(hostname);
        self
    }

    /// Adds a list of known database servers.
    pub fn known_nodes(self, hostnames: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        hostnames
            .into_iter()
            .fold(self, |builder, hostname| builder.known_node(hostname))
    }

    /// Adds a known database server with an IP address.
    pub fn known_node_addr(mut self, node_addr: std::net::SocketAddr) -> Self {
        self.config.known_nodes.push(KnownNode::Address(node_addr));
        self
    }

    /// Sets the keyspace of requests which do not name one.
    pub fn use_keyspace(mut self, keyspace_name: impl Into<String>) -> Self {
        self.config.keyspace = Some(keyspace_name.into());
        self
    }

    pub fn default_consistency(mut self, consistency: Consistency) -> Self {
        self.config.default_profile.consistency = consistency;
        self
    }

    pub fn default_serial_consistency(mut self, serial_consistency: SerialConsistency) -> Self {
        self.config.default_profile.serial_consistency = serial_consistency;
        self
    }

    /// Sets the default read timeout. Zero disables the client-side timeout.
    pub fn default_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_profile.read_timeout = timeout;
        self
    }

    pub fn default_retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.config.default_profile.retry_policy = retry_policy;
        self
    }

    pub fn default_load_balancing_policy(
        mut self,
        load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
    ) -> Self {
        self.config.default_profile.load_balancing_policy = load_balancing_policy;
        self
    }

    pub fn default_idempotence(mut self, is_idempotent: bool) -> Self {
        self.config.default_is_idempotent = is_idempotent;
        self
    }

    pub fn default_prepare(mut self, prepare: bool) -> Self {
        self.config.default_prepare = prepare;
        self
    }

    /// Registers a named execution profile.
    pub fn execution_profile(mut self, profile: ExecutionProfile) -> Self {
        self.config.execution_profiles.push(profile);
        self
    }

    /// Sets how many prepared statements the client keeps cached.
    pub fn max_prepared_cache_size(mut self, size: usize) -> Self {
        self.config.max_prepared_cache_size = size;
        self
    }

    /// Sets the timestamp generator. `None` disables client-side timestamps.
    pub fn timestamp_generator(mut self, generator: Option<Arc<dyn TimestampGenerator>>) -> Self {
        self.config.timestamp_generator = generator;
        self
    }

    /// Sets the interval between schema version comparisons.
    pub fn schema_agreement_interval(mut self, interval: Duration) -> Self {
        self.config.schema_agreement_interval = interval;
        self
    }

    /// Sets the maximum time spent awaiting schema agreement.
    pub fn max_schema_agreement_wait(mut self, timeout: Duration) -> Self {
        self.config.max_schema_agreement_wait = timeout;
        self
    }

    /// Whether the client awaits schema agreement after schema changes.
    pub fn auto_await_schema_agreement(mut self, enabled: bool) -> Self {
        self.config.schema_agreement_automatic_waiting = enabled;
        self
    }

    pub fn hostname_resolution_timeout(mut self, duration: Option<Duration>) -> Self {
        self.config.hostname_resolution_timeout = duration;
        self
    }

    /// Enables the periodic metadata refresh with the given interval.
    pub fn cluster_metadata_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.cluster_metadata_refresh_interval = Some(interval);
        self
    }

    pub fn control_connection(mut self, control_connection: Arc<dyn ControlConnection>) -> Self {
        self.config.control_connection = Some(control_connection);
        self
    }

    pub fn request_handler(mut self, request_handler: Arc<dyn RequestHandler>) -> Self {
        self.config.request_handler = Some(request_handler);
        self
    }

    pub fn prepare_handler(mut self, prepare_handler: Arc<dyn PrepareHandler>) -> Self {
        self.config.prepare_handler = Some(prepare_handler);
        self
    }

    pub fn metadata(mut self, metadata: Arc<dyn Metadata>) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.config.encoder = encoder;
        self
    }

    pub fn hostname_resolver(mut self, resolver: Arc<dyn HostnameResolver>) -> Self {
        self.config.hostname_resolver = resolver;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ClientEventListener>) -> Self {
        self.config.listeners.push(listener);
        self
    }

    /// Builds the client.
    ///
    /// Fails if a collaborator is missing or if two execution profiles
    /// share a name.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        Client::new(self.config)
    }
}
