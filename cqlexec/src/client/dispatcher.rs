use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cqlexec_cql::types::{CollectionType, Encoder};
use cqlexec_cql::{ColumnType, ProtocolVersion, Values};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::client_builder::ClientConfig;
use super::events::{ClientEventListener, EventEmitter};
use super::execution_profile::ProfileManager;
use super::handlers::{PrepareHandler, RequestHandler};
use super::lifecycle::{LifecycleConfig, LifecycleCoordinator, LifecycleState};
use super::options::{DefaultQueryOptions, QueryOptions, ResolvedExecutionOptions};
use super::prepared_cache::PreparedCache;
use super::schema_agreement::SchemaAgreementWaiter;
use crate::cluster::{ControlConnection, HostMap, Metadata};
use crate::errors::{
    BadQuery, ClientBuildError, ConnectError, ExecutionError, RequestError, SchemaAgreementError,
};
use crate::policies::timestamp_generator::TimestampGenerator;
use crate::response::QueryResult;
use crate::routing::{RoutingKeyBuilder, RoutingSpec};
use crate::statement::{BatchEntry, BatchStatement, BatchType, PreparedStatement, Request};

/// `Client` executes requests against a cluster.
///
/// Cloning is cheap: clones share the connection state, the prepared
/// statement cache and the collaborators.
///
/// The client connects on first use. Concurrent first requests share a
/// single bootstrap.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    lifecycle: LifecycleCoordinator,
    profiles: Arc<ProfileManager>,
    defaults: DefaultQueryOptions,
    events: Arc<EventEmitter>,
    control_connection: Arc<dyn ControlConnection>,
    request_handler: Arc<dyn RequestHandler>,
    prepare_handler: Arc<dyn PrepareHandler>,
    metadata: Arc<dyn Metadata>,
    encoder: Arc<dyn Encoder>,
    timestamp_generator: Option<Arc<dyn TimestampGenerator>>,
    prepared: PreparedCache,
    schema_agreement_interval: Duration,
    max_schema_agreement_wait: Duration,
    schema_agreement_automatic_waiting: bool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("keyspace", &self.keyspace())
            .field("profiles", &self.inner.profiles)
            .field("events", &self.inner.events)
            .field(
                "schema_agreement_interval",
                &self.inner.schema_agreement_interval,
            )
            .field(
                "max_schema_agreement_wait",
                &self.inner.max_schema_agreement_wait,
            )
            .finish_non_exhaustive()
    }
}

impl Client {
    pub(crate) fn new(config: ClientConfig) -> Result<Self, ClientBuildError> {
        let control_connection = config
            .control_connection
            .ok_or(ClientBuildError::MissingCollaborator("control connection"))?;
        let request_handler = config
            .request_handler
            .ok_or(ClientBuildError::MissingCollaborator("request handler"))?;
        let prepare_handler = config
            .prepare_handler
            .ok_or(ClientBuildError::MissingCollaborator("prepare handler"))?;
        let metadata = config
            .metadata
            .ok_or(ClientBuildError::MissingCollaborator("metadata"))?;

        let profiles = Arc::new(ProfileManager::new(
            config.default_profile,
            config.execution_profiles,
        )?);

        let events = Arc::new(EventEmitter::new());
        for listener in config.listeners {
            events.subscribe(listener);
        }

        let lifecycle = LifecycleCoordinator::new(
            LifecycleConfig {
                known_nodes: config.known_nodes,
                hostname_resolution_timeout: config.hostname_resolution_timeout,
                metadata_refresh_interval: config.cluster_metadata_refresh_interval,
            },
            Arc::clone(&control_connection),
            config.hostname_resolver,
            Arc::clone(&profiles),
            Arc::clone(&events),
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                lifecycle,
                profiles,
                defaults: DefaultQueryOptions {
                    is_idempotent: config.default_is_idempotent,
                    prepare: config.default_prepare,
                    keyspace: config.keyspace,
                },
                events,
                control_connection,
                request_handler,
                prepare_handler,
                metadata,
                encoder: config.encoder,
                timestamp_generator: config.timestamp_generator,
                prepared: PreparedCache::new(config.max_prepared_cache_size),
                schema_agreement_interval: config.schema_agreement_interval,
                max_schema_agreement_wait: config.max_schema_agreement_wait,
                schema_agreement_automatic_waiting: config.schema_agreement_automatic_waiting,
            }),
        })
    }

    /// Connects the client to the cluster.
    ///
    /// Requests connect implicitly, so calling this is optional. Concurrent
    /// calls share one bootstrap and get the same outcome. Fails with
    /// [`UsedAfterShutdown`](crate::errors::NoHostAvailableError::UsedAfterShutdown)
    /// once [`shutdown`](Self::shutdown) was called.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        self.inner.lifecycle.connect().await
    }

    /// Shuts the client down: closes host pools, the control connection,
    /// and stops background tasks. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.lifecycle.shutdown().await
    }

    /// Registers a listener of client events.
    pub fn add_listener(&self, listener: Arc<dyn ClientEventListener>) {
        self.inner.events.subscribe(listener);
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LifecycleState::Connected
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::ShuttingDown | LifecycleState::Shutdown
        )
    }

    /// Known hosts. Empty until connected.
    pub fn hosts(&self) -> HostMap {
        self.inner.control_connection.hosts()
    }

    /// Keyspace used by requests which do not name one.
    pub fn keyspace(&self) -> Option<&str> {
        self.inner.defaults.keyspace.as_deref()
    }

    /// Negotiated protocol version, `None` until connected.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.is_connected()
            .then(|| self.inner.control_connection.protocol_version())
    }

    /// Addresses each contact point resolved to during the last bootstrap.
    /// Unresolved contact points map to an empty list.
    pub fn resolved_contact_points(&self) -> BTreeMap<String, Vec<SocketAddr>> {
        self.inner.lifecycle.resolved_contact_points()
    }

    pub fn profile_manager(&self) -> &ProfileManager {
        &self.inner.profiles
    }

    /// Executes a single statement.
    ///
    /// Option and argument errors are reported before the client connects.
    /// When the statement changes the schema and automatic waiting is
    /// enabled, the result tells whether schema agreement was reached.
    pub async fn execute(
        &self,
        query: &str,
        values: impl Into<Values>,
        options: &QueryOptions,
    ) -> Result<QueryResult, ExecutionError> {
        let values = values.into();
        let mut resolved =
            ResolvedExecutionOptions::resolve(options, &self.inner.profiles, &self.inner.defaults)?;
        if !resolved.prepare && values.is_named() {
            return Err(BadQuery::NamedValuesForUnpreparedStatement.into());
        }

        let version = self.connect_for_request(&mut resolved).await?;

        let request = if resolved.prepare {
            let prepared = self.prepare(query, &resolved).await?;
            let values = prepared.bind(values)?;
            if resolved.routing_key.is_none() {
                resolved.routing_key =
                    self.prepared_routing_key(version, &prepared, &values, &resolved)?;
            }
            Request::Execute { prepared, values }
        } else {
            self.fill_udt_definitions(&mut resolved).await?;
            if resolved.routing_key.is_none() {
                resolved.routing_key = self.routing_key(version, &values, &resolved)?;
            }
            Request::Query {
                query: query.to_owned(),
                values,
            }
        };

        self.send(request, resolved).await
    }

    /// Executes several statements as one batch.
    ///
    /// The batch is routed with the routing key of its first statement.
    pub async fn batch<I, E>(
        &self,
        entries: I,
        options: &QueryOptions,
    ) -> Result<QueryResult, ExecutionError>
    where
        I: IntoIterator<Item = E>,
        E: Into<BatchEntry>,
    {
        let entries: Vec<BatchEntry> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return Err(BadQuery::EmptyBatch.into());
        }
        if entries.len() > u16::MAX as usize {
            return Err(BadQuery::TooManyQueriesInBatchStatement(entries.len()).into());
        }
        if let Some(index) = entries.iter().position(|e| e.query.trim().is_empty()) {
            return Err(BadQuery::InvalidBatchEntry(index).into());
        }

        let mut resolved =
            ResolvedExecutionOptions::resolve(options, &self.inner.profiles, &self.inner.defaults)?;
        if !resolved.prepare && entries.iter().any(|e| e.values.is_named()) {
            return Err(BadQuery::NamedValuesForUnpreparedStatement.into());
        }

        let version = self.connect_for_request(&mut resolved).await?;

        let mut statements = Vec::with_capacity(entries.len());
        if resolved.prepare {
            for entry in entries {
                let prepared = self.prepare(&entry.query, &resolved).await?;
                let values = prepared.bind(entry.values)?;
                if statements.is_empty() && resolved.routing_key.is_none() {
                    resolved.routing_key =
                        self.prepared_routing_key(version, &prepared, &values, &resolved)?;
                }
                statements.push(BatchStatement::Prepared { prepared, values });
            }
        } else {
            self.fill_udt_definitions(&mut resolved).await?;
            for entry in entries {
                if statements.is_empty() && resolved.routing_key.is_none() {
                    resolved.routing_key = self.routing_key(version, &entry.values, &resolved)?;
                }
                statements.push(BatchStatement::Query {
                    query: entry.query,
                    values: entry.values,
                });
            }
        }

        let request = Request::Batch {
            batch_type: BatchType::from_flags(resolved.logged, resolved.counter),
            statements,
        };
        self.send(request, resolved).await
    }

    /// Runs [`execute`](Self::execute) in a spawned task and hands its
    /// outcome to `callback`.
    pub fn execute_with_callback<F>(
        &self,
        query: impl Into<String>,
        values: impl Into<Values>,
        options: QueryOptions,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<QueryResult, ExecutionError>) + Send + 'static,
    {
        let client = self.clone();
        let query = query.into();
        let values = values.into();
        tokio::spawn(async move {
            callback(client.execute(&query, values, &options).await);
        })
    }

    /// Runs [`batch`](Self::batch) in a spawned task and hands its outcome
    /// to `callback`.
    pub fn batch_with_callback<F>(
        &self,
        entries: Vec<BatchEntry>,
        options: QueryOptions,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<QueryResult, ExecutionError>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            callback(client.batch(entries, &options).await);
        })
    }

    /// Compares schema versions of the cluster once.
    pub async fn check_schema_agreement(&self) -> Result<bool, ExecutionError> {
        self.connect().await?;
        let control_host = self
            .inner
            .control_connection
            .host()
            .ok_or(SchemaAgreementError::NoControlHost)?;
        Ok(self
            .inner
            .metadata
            .compare_schema_versions(&control_host)
            .await
            .map_err(SchemaAgreementError::from)?)
    }

    /// Waits until all hosts agree on the schema version.
    ///
    /// Returns false if the maximum wait elapsed first, or if the client
    /// was shut down meanwhile.
    pub async fn await_schema_agreement(&self) -> Result<bool, ExecutionError> {
        self.connect().await?;
        Ok(self.wait_for_schema_agreement().await?)
    }

    async fn wait_for_schema_agreement(&self) -> Result<bool, SchemaAgreementError> {
        let control_host = self
            .inner
            .control_connection
            .host()
            .ok_or(SchemaAgreementError::NoControlHost)?;
        let hosts_count = self.inner.control_connection.hosts().len();
        SchemaAgreementWaiter::new(
            self.inner.metadata.as_ref(),
            self.inner.schema_agreement_interval,
            self.inner.max_schema_agreement_wait,
        )
        .wait(
            &control_host,
            hosts_count,
            self.inner.lifecycle.shutdown_signal(),
        )
        .await
    }

    /// Connects, then settles what depends on the negotiated protocol version.
    async fn connect_for_request(
        &self,
        resolved: &mut ResolvedExecutionOptions,
    ) -> Result<ProtocolVersion, ConnectError> {
        self.connect().await?;
        let version = self.inner.control_connection.protocol_version();
        resolved.assign_timestamp(version, self.inner.timestamp_generator.as_deref());
        Ok(version)
    }

    async fn prepare(
        &self,
        query: &str,
        resolved: &ResolvedExecutionOptions,
    ) -> Result<Arc<PreparedStatement>, ExecutionError> {
        let keyspace = resolved.keyspace.as_deref();
        self.inner
            .prepared
            .get_or_prepare(keyspace, query, || {
                let client = self.clone();
                let lbp = Arc::clone(&resolved.load_balancing_policy);
                let query = query.to_owned();
                let keyspace = keyspace.map(str::to_owned);
                async move {
                    client
                        .inner
                        .prepare_handler
                        .prepare(&client, &lbp, &query, keyspace.as_deref())
                        .await
                }
                .boxed()
            })
            .await
            .map_err(ExecutionError::PrepareError)
    }

    fn prepared_routing_key(
        &self,
        version: ProtocolVersion,
        prepared: &PreparedStatement,
        values: &Values,
        resolved: &ResolvedExecutionOptions,
    ) -> Result<Option<Bytes>, BadQuery> {
        let Some(indexes) = prepared.routing_indexes(
            resolved.routing_indexes.as_deref(),
            resolved.routing_names.as_deref(),
        ) else {
            return Ok(None);
        };
        RoutingKeyBuilder::new(self.inner.encoder.as_ref(), version).build(
            values,
            RoutingSpec::Indexes(&indexes),
            Some(&prepared.column_types()),
        )
    }

    fn routing_key(
        &self,
        version: ProtocolVersion,
        values: &Values,
        resolved: &ResolvedExecutionOptions,
    ) -> Result<Option<Bytes>, BadQuery> {
        let spec = match (&resolved.routing_indexes, &resolved.routing_names) {
            (Some(indexes), _) => RoutingSpec::Indexes(indexes),
            (None, Some(names)) => RoutingSpec::Names(names),
            (None, None) => return Ok(None),
        };
        RoutingKeyBuilder::new(self.inner.encoder.as_ref(), version).build(
            values,
            spec,
            resolved.hints.as_ref(),
        )
    }

    /// Replaces UDT hints, which only carry a name, with their definitions
    /// from cluster metadata.
    async fn fill_udt_definitions(
        &self,
        resolved: &mut ResolvedExecutionOptions,
    ) -> Result<(), RequestError> {
        let Some(hints) = resolved.hints.as_mut() else {
            return Ok(());
        };
        let unresolved: Vec<&mut ColumnType> = hints
            .iter_mut()
            .filter(|typ| typ.has_unresolved_udt())
            .collect();
        for typ in unresolved {
            self.fill_udt(typ).await?;
        }
        Ok(())
    }

    fn fill_udt<'a>(&'a self, typ: &'a mut ColumnType) -> BoxFuture<'a, Result<(), RequestError>> {
        async move {
            match typ {
                ColumnType::UserDefinedType {
                    keyspace,
                    name,
                    field_types,
                } => {
                    if field_types.is_empty() {
                        match self.inner.metadata.get_udt(keyspace, name).await? {
                            Some(definition) => *field_types = definition.field_types,
                            None => trace!("UDT {}.{} not found in metadata", keyspace, name),
                        }
                    }
                    for (_, field_type) in field_types.iter_mut() {
                        self.fill_udt(field_type).await?;
                    }
                }
                ColumnType::Collection(collection) => match collection {
                    CollectionType::List(element) | CollectionType::Set(element) => {
                        self.fill_udt(element).await?;
                    }
                    CollectionType::Map(key, value) => {
                        self.fill_udt(key).await?;
                        self.fill_udt(value).await?;
                    }
                },
                ColumnType::Tuple(types) => {
                    for element in types.iter_mut() {
                        self.fill_udt(element).await?;
                    }
                }
                _ => {}
            }
            Ok(())
        }
        .boxed()
    }

    async fn send(
        &self,
        request: Request,
        resolved: ResolvedExecutionOptions,
    ) -> Result<QueryResult, ExecutionError> {
        trace!(
            profile = %resolved.profile_name,
            routing_key = ?resolved.routing_key,
            "Sending request"
        );
        let mut result = self
            .inner
            .request_handler
            .send(&request, &resolved, self)
            .await?;

        if let Some(change) = &result.schema_change {
            if self.inner.schema_agreement_automatic_waiting {
                debug!(
                    "Schema change {} {} {:?}, awaiting schema agreement",
                    change.change_type, change.target, change.keyspace
                );
                let agreed = self.wait_for_schema_agreement().await?;
                result.set_schema_in_agreement(agreed);
            }
        }
        Ok(result)
    }
}
