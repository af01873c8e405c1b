use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cqlexec_cql::ProtocolVersion;
use uuid::Uuid;

use crate::client::Client;
use crate::client::options::ResolvedExecutionOptions;
use crate::client::{PrepareHandler, RequestHandler};
use crate::cluster::{ConnectionPool, ControlConnection, Host, HostMap, Metadata, UdtDefinition};
use crate::errors::{ConnectError, RequestError};
use crate::policies::load_balancing::LoadBalancingPolicy;
use crate::response::QueryResult;
use crate::statement::{PreparedStatement, Request};

pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(tracing_subscriber::fmt::TestWriter::new())
        .try_init();
}

pub(crate) fn test_addr(i: u8) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, i], 9042))
}

pub(crate) fn test_host(i: u8) -> Host {
    Host::new(Uuid::new_v4(), test_addr(i), Some("dc1".into()), None)
}

#[derive(Debug, Default)]
pub(crate) struct MockPool {
    pub(crate) shutdown_calls: AtomicUsize,
}

#[async_trait]
impl ConnectionPool for MockPool {
    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockControlConnection {
    pub(crate) init_calls: AtomicUsize,
    pub(crate) shutdown_calls: AtomicUsize,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) pools: Vec<Arc<MockPool>>,
    failing_inits: AtomicUsize,
    init_delay: Duration,
    protocol_version: ProtocolVersion,
    all_hosts: HostMap,
    initialized: AtomicBool,
}

impl MockControlConnection {
    pub(crate) fn with_hosts(n: u8) -> Self {
        let pools: Vec<Arc<MockPool>> = (0..n).map(|_| Arc::new(MockPool::default())).collect();
        let hosts: BTreeMap<_, _> = (1..=n)
            .zip(&pools)
            .map(|(i, pool)| {
                let host = test_host(i).with_pool(pool.clone());
                (host.address, Arc::new(host))
            })
            .collect();
        MockControlConnection {
            init_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            pools,
            failing_inits: AtomicUsize::new(0),
            init_delay: Duration::ZERO,
            protocol_version: ProtocolVersion::V4,
            all_hosts: Arc::new(hosts),
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub(crate) fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    pub(crate) fn fail_next_inits(&self, n: usize) {
        self.failing_inits.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ControlConnection for MockControlConnection {
    async fn init(&self, _contact_points: &[SocketAddr]) -> Result<(), ConnectError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        let failing = self
            .failing_inits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(ConnectError::ControlConnection(
                RequestError::BrokenConnection("connection refused".into()),
            ));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn hosts(&self) -> HostMap {
        if self.initialized.load(Ordering::SeqCst) {
            self.all_hosts.clone()
        } else {
            HostMap::default()
        }
    }

    fn host(&self) -> Option<Arc<Host>> {
        self.hosts().values().next().cloned()
    }

    fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    async fn refresh(&self) -> Result<(), RequestError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Disagrees a given number of times, then agrees.
pub(crate) struct MockMetadata {
    pub(crate) polls: AtomicUsize,
    disagreements: Option<usize>,
    error: Option<RequestError>,
    pub(crate) udts: Mutex<Vec<UdtDefinition>>,
}

impl MockMetadata {
    pub(crate) fn agreeing_after(disagreements: usize) -> Self {
        MockMetadata {
            polls: AtomicUsize::new(0),
            disagreements: Some(disagreements),
            error: None,
            udts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn never_agreeing() -> Self {
        MockMetadata {
            disagreements: None,
            ..Self::agreeing_after(0)
        }
    }

    pub(crate) fn failing(error: RequestError) -> Self {
        MockMetadata {
            error: Some(error),
            ..Self::agreeing_after(0)
        }
    }
}

#[async_trait]
impl Metadata for MockMetadata {
    async fn compare_schema_versions(&self, _control_host: &Host) -> Result<bool, RequestError> {
        let previous = self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(self.disagreements.is_some_and(|d| previous >= d))
    }

    async fn get_udt(
        &self,
        keyspace: &str,
        name: &str,
    ) -> Result<Option<UdtDefinition>, RequestError> {
        Ok(self
            .udts
            .lock()
            .unwrap()
            .iter()
            .find(|udt| udt.keyspace == keyspace && udt.name == name)
            .cloned())
    }
}

/// Records requests and answers with a preset result.
#[derive(Default)]
pub(crate) struct MockRequestHandler {
    pub(crate) sent: Mutex<Vec<(Request, ResolvedExecutionOptions)>>,
    pub(crate) response: Mutex<QueryResult>,
}

#[async_trait]
impl RequestHandler for MockRequestHandler {
    async fn send(
        &self,
        request: &Request,
        options: &ResolvedExecutionOptions,
        _client: &Client,
    ) -> Result<QueryResult, RequestError> {
        self.sent
            .lock()
            .unwrap()
            .push((request.clone(), options.clone()));
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Prepares statements with the preset metadata.
#[derive(Default)]
pub(crate) struct MockPrepareHandler {
    pub(crate) calls: AtomicUsize,
    pub(crate) metadata: Mutex<crate::statement::PreparedMetadata>,
}

#[async_trait]
impl PrepareHandler for MockPrepareHandler {
    async fn prepare(
        &self,
        _client: &Client,
        _load_balancing_policy: &Arc<dyn LoadBalancingPolicy>,
        query: &str,
        keyspace: Option<&str>,
    ) -> Result<PreparedStatement, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PreparedStatement {
            id: bytes::Bytes::copy_from_slice(query.as_bytes()),
            query: query.to_owned(),
            keyspace: keyspace.map(str::to_owned),
            metadata: self.metadata.lock().unwrap().clone(),
        })
    }
}
