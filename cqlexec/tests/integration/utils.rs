use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cqlexec::client::options::ResolvedExecutionOptions;
use cqlexec::client::{Client, ClientBuilder, PrepareHandler, RequestHandler};
use cqlexec::cluster::{
    ConnectionPool, ControlConnection, Host, HostMap, HostnameResolver, Metadata, UdtDefinition,
};
use cqlexec::errors::{ConnectError, RequestError};
use cqlexec::policies::load_balancing::LoadBalancingPolicy;
use cqlexec::response::QueryResult;
use cqlexec::statement::{PreparedMetadata, PreparedStatement, Request};
use cqlexec::ProtocolVersion;
use uuid::Uuid;

pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(tracing_subscriber::fmt::TestWriter::new())
        .try_init();
}

#[derive(Debug, Default)]
pub(crate) struct CountingPool {
    pub(crate) closed: AtomicUsize,
}

#[async_trait]
impl ConnectionPool for CountingPool {
    async fn shutdown(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Control connection of a fake three node cluster.
pub(crate) struct FakeControlConnection {
    pub(crate) bootstraps: AtomicUsize,
    pub(crate) shutdowns: AtomicUsize,
    pub(crate) pools: Vec<Arc<CountingPool>>,
    bootstrap_delay: Duration,
    protocol_version: ProtocolVersion,
    hosts: HostMap,
    ready: AtomicBool,
    fail_bootstrap: bool,
}

impl FakeControlConnection {
    pub(crate) fn new() -> Self {
        let pools: Vec<Arc<CountingPool>> =
            (0..3).map(|_| Arc::new(CountingPool::default())).collect();
        let hosts: BTreeMap<SocketAddr, Arc<Host>> = pools
            .iter()
            .enumerate()
            .map(|(i, pool)| {
                let addr = SocketAddr::from(([127, 0, 0, i as u8 + 1], 9042));
                let host = Host::new(Uuid::new_v4(), addr, Some("dc1".into()), Some("r1".into()))
                    .with_pool(pool.clone());
                (addr, Arc::new(host))
            })
            .collect();
        FakeControlConnection {
            bootstraps: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            pools,
            bootstrap_delay: Duration::from_millis(50),
            protocol_version: ProtocolVersion::V4,
            hosts: Arc::new(hosts),
            ready: AtomicBool::new(false),
            fail_bootstrap: false,
        }
    }

    pub(crate) fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Every bootstrap fails after the usual delay.
    pub(crate) fn failing(mut self) -> Self {
        self.fail_bootstrap = true;
        self
    }
}

#[async_trait]
impl ControlConnection for FakeControlConnection {
    async fn init(&self, _contact_points: &[SocketAddr]) -> Result<(), ConnectError> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.bootstrap_delay).await;
        if self.fail_bootstrap {
            return Err(ConnectError::ControlConnection(RequestError::BrokenConnection(
                "connection refused".into(),
            )));
        }
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn hosts(&self) -> HostMap {
        if self.ready.load(Ordering::SeqCst) {
            self.hosts.clone()
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

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Schema versions agree after a number of polls, or never.
pub(crate) struct FakeMetadata {
    pub(crate) polls: AtomicUsize,
    agree_on_poll: Option<usize>,
}

impl FakeMetadata {
    pub(crate) fn agreeing_on_poll(poll: usize) -> Self {
        FakeMetadata {
            polls: AtomicUsize::new(0),
            agree_on_poll: Some(poll),
        }
    }

    pub(crate) fn never_agreeing() -> Self {
        FakeMetadata {
            polls: AtomicUsize::new(0),
            agree_on_poll: None,
        }
    }
}

#[async_trait]
impl Metadata for FakeMetadata {
    async fn compare_schema_versions(&self, _control_host: &Host) -> Result<bool, RequestError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.agree_on_poll.is_some_and(|p| poll >= p))
    }

    async fn get_udt(
        &self,
        _keyspace: &str,
        _name: &str,
    ) -> Result<Option<UdtDefinition>, RequestError> {
        Ok(None)
    }
}

#[derive(Default)]
pub(crate) struct RecordingHandler {
    pub(crate) sent: Mutex<Vec<(Request, ResolvedExecutionOptions)>>,
    pub(crate) response: Mutex<Option<QueryResult>>,
}

impl RecordingHandler {
    pub(crate) fn last(&self) -> (Request, ResolvedExecutionOptions) {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl RequestHandler for RecordingHandler {
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
        Ok(self
            .response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct FakePreparer {
    pub(crate) metadata: Mutex<PreparedMetadata>,
}

#[async_trait]
impl PrepareHandler for FakePreparer {
    async fn prepare(
        &self,
        _client: &Client,
        _load_balancing_policy: &Arc<dyn LoadBalancingPolicy>,
        query: &str,
        keyspace: Option<&str>,
    ) -> Result<PreparedStatement, RequestError> {
        Ok(PreparedStatement {
            id: bytes::Bytes::from(query.as_bytes().to_vec()),
            query: query.to_owned(),
            keyspace: keyspace.map(str::to_owned),
            metadata: self.metadata.lock().unwrap().clone(),
        })
    }
}

/// Resolves nothing.
#[derive(Debug)]
pub(crate) struct FailingResolver;

#[async_trait]
impl HostnameResolver for FailingResolver {
    async fn resolve(&self, hostname: &str) -> io::Result<Vec<SocketAddr>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such host: {}", hostname),
        ))
    }
}

pub(crate) struct TestCluster {
    pub(crate) client: Client,
    pub(crate) control_connection: Arc<FakeControlConnection>,
    pub(crate) handler: Arc<RecordingHandler>,
    pub(crate) preparer: Arc<FakePreparer>,
    pub(crate) metadata: Arc<FakeMetadata>,
}

impl TestCluster {
    pub(crate) fn new() -> Self {
        Self::with(
            FakeControlConnection::new(),
            FakeMetadata::agreeing_on_poll(1),
            ClientBuilder::new(),
        )
    }

    pub(crate) fn with(
        control_connection: FakeControlConnection,
        metadata: FakeMetadata,
        builder: ClientBuilder,
    ) -> Self {
        let control_connection = Arc::new(control_connection);
        let handler = Arc::new(RecordingHandler::default());
        let preparer = Arc::new(FakePreparer::default());
        let metadata = Arc::new(metadata);
        let client = builder
            .known_node("127.0.0.1:9042")
            .control_connection(control_connection.clone())
            .request_handler(handler.clone())
            .prepare_handler(preparer.clone())
            .metadata(metadata.clone())
            .build()
            .unwrap();
        TestCluster {
            client,
            control_connection,
            handler,
            preparer,
            metadata,
        }
    }
}
