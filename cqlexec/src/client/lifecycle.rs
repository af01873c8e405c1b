//! Connect / shutdown state machine of a client.
//!
//! Concurrent `connect` calls share a single bootstrap. `shutdown` is
//! idempotent: concurrent and repeated calls share a single teardown.
//! Once a shutdown has started, the client can not be connected anymore.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::events::{EventEmitter, LogLevel};
use super::execution_profile::ProfileManager;
use crate::cluster::{resolve_contact_points, ControlConnection, HostnameResolver, KnownNode};
use crate::errors::{ConnectError, NoHostAvailableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Connecting,
    Connected,
    ShuttingDown,
    Shutdown,
}

type ConnectFuture = Shared<BoxFuture<'static, Result<(), ConnectError>>>;
type ShutdownFuture = Shared<BoxFuture<'static, ()>>;

struct Transitions {
    state: LifecycleState,
    connecting: Option<ConnectFuture>,
    shutting_down: Option<ShutdownFuture>,
}

/// Resolves once the client starts shutting down.
#[derive(Clone)]
pub(crate) struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub(crate) fn new(receiver: watch::Receiver<bool>) -> Self {
        ShutdownSignal(receiver)
    }

    pub(crate) async fn triggered(mut self) {
        let signalled = self.0.wait_for(|shut_down| *shut_down).await.is_ok();
        if !signalled {
            // Sender gone without signalling: never resolve.
            std::future::pending::<()>().await
        }
    }
}

/// Tasks spawned on behalf of the client, aborted on shutdown.
#[derive(Default)]
pub(crate) struct BackgroundTasks {
    inner: Mutex<BackgroundTasksInner>,
}

#[derive(Default)]
struct BackgroundTasksInner {
    handles: Vec<AbortHandle>,
    closed: bool,
}

impl BackgroundTasks {
    /// Spawns the task unless the registry was already closed.
    pub(crate) fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return false;
        }
        inner.handles.retain(|h| !h.is_finished());
        let handle = tokio::spawn(task);
        inner.handles.push(handle.abort_handle());
        true
    }

    fn abort_all(&self) {
        let handles = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.closed = true;
            std::mem::take(&mut inner.handles)
        };
        trace!("Aborting {} background task(s)", handles.len());
        for handle in handles {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.handles.retain(|h| !h.is_finished());
        inner.handles.len()
    }
}

pub(crate) struct LifecycleConfig {
    pub(crate) known_nodes: Vec<KnownNode>,
    pub(crate) hostname_resolution_timeout: Option<Duration>,
    pub(crate) metadata_refresh_interval: Option<Duration>,
}

struct CoordinatorInner {
    transitions: Mutex<Transitions>,
    config: LifecycleConfig,
    control_connection: Arc<dyn ControlConnection>,
    resolver: Arc<dyn HostnameResolver>,
    profiles: Arc<ProfileManager>,
    events: Arc<EventEmitter>,
    resolved_contact_points: Mutex<BTreeMap<String, Vec<SocketAddr>>>,
    tasks: BackgroundTasks,
    shutdown_tx: watch::Sender<bool>,
}

pub(crate) struct LifecycleCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl LifecycleCoordinator {
    pub(crate) fn new(
        config: LifecycleConfig,
        control_connection: Arc<dyn ControlConnection>,
        resolver: Arc<dyn HostnameResolver>,
        profiles: Arc<ProfileManager>,
        events: Arc<EventEmitter>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        LifecycleCoordinator {
            inner: Arc::new(CoordinatorInner {
                transitions: Mutex::new(Transitions {
                    state: LifecycleState::Idle,
                    connecting: None,
                    shutting_down: None,
                }),
                config,
                control_connection,
                resolver,
                profiles,
                events,
                resolved_contact_points: Mutex::new(BTreeMap::new()),
                tasks: BackgroundTasks::default(),
                shutdown_tx,
            }),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.inner.transitions().state
    }

    /// Connects the client, or joins the bootstrap already in progress.
    pub(crate) async fn connect(&self) -> Result<(), ConnectError> {
        let pending = {
            let mut t = self.inner.transitions();
            match t.state {
                LifecycleState::Connected => return Ok(()),
                LifecycleState::ShuttingDown | LifecycleState::Shutdown => {
                    return Err(NoHostAvailableError::UsedAfterShutdown.into())
                }
                LifecycleState::Idle | LifecycleState::Connecting => {}
            }
            match t.connecting.clone() {
                Some(pending) => pending,
                None => {
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        let outcome = inner.bootstrap().await;
                        inner.finish_connect(outcome)
                    }
                    .boxed()
                    .shared();
                    t.state = LifecycleState::Connecting;
                    t.connecting = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    /// Shuts the client down, or joins the shutdown already in progress.
    ///
    /// A bootstrap in flight is allowed to settle first.
    pub(crate) async fn shutdown(&self) {
        let pending = {
            let mut t = self.inner.transitions();
            match t.shutting_down.clone() {
                Some(pending) => pending,
                None => {
                    let connecting = t.connecting.take();
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        if let Some(connecting) = connecting {
                            let _ = connecting.await;
                        }
                        inner.teardown().await;
                    }
                    .boxed()
                    .shared();
                    t.state = LifecycleState::ShuttingDown;
                    t.shutting_down = Some(pending.clone());
                    pending
                }
            }
        };
        pending.await
    }

    pub(crate) fn resolved_contact_points(&self) -> BTreeMap<String, Vec<SocketAddr>> {
        self.inner
            .resolved_contact_points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal::new(self.inner.shutdown_tx.subscribe())
    }

    pub(crate) fn background_tasks(&self) -> &BackgroundTasks {
        &self.inner.tasks
    }
}

impl CoordinatorInner {
    fn transitions(&self) -> MutexGuard<'_, Transitions> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn bootstrap(&self) -> Result<(), ConnectError> {
        let known_nodes = &self.config.known_nodes;
        if known_nodes.is_empty() {
            return Err(NoHostAvailableError::EmptyKnownNodesList.into());
        }
        self.events.log(
            LogLevel::Info,
            format!("Connecting to cluster using {} contact point(s)", known_nodes.len()),
        );

        let resolved = resolve_contact_points(
            known_nodes,
            self.resolver.as_ref(),
            self.config.hostname_resolution_timeout,
        )
        .await;
        *self
            .resolved_contact_points
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = resolved.by_name;
        if resolved.addresses.is_empty() {
            return Err(NoHostAvailableError::FailedToResolveAnyHostname(resolved.unresolved).into());
        }

        self.control_connection.init(&resolved.addresses).await?;

        let hosts = self.control_connection.hosts();
        for policy in self.profiles.load_balancing_policies() {
            trace!("Initialising load balancing policy {}", policy.name());
            policy.init(&hosts);
        }
        if let Some(host) = self.control_connection.host() {
            let distance = self.profiles.base().load_balancing_policy.distance(&host);
            host.set_distance(distance);
        }
        Ok(())
    }

    fn finish_connect(
        self: &Arc<Self>,
        outcome: Result<(), ConnectError>,
    ) -> Result<(), ConnectError> {
        let mut t = self.transitions();
        t.connecting = None;
        match (t.state, outcome) {
            (LifecycleState::Connecting, Ok(())) => {
                t.state = LifecycleState::Connected;
                drop(t);
                self.start_metadata_refresh();
                self.events.connected();
                Ok(())
            }
            (LifecycleState::Connecting, Err(e)) => {
                t.state = LifecycleState::Idle;
                drop(t);
                self.events
                    .log(LogLevel::Warning, format!("Connection failed: {}", e));
                Err(e)
            }
            // Shutdown started while bootstrapping.
            (_, Ok(())) => Err(NoHostAvailableError::UsedAfterShutdown.into()),
            (_, Err(e)) => Err(e),
        }
    }

    fn start_metadata_refresh(self: &Arc<Self>) {
        let Some(interval) = self.config.metadata_refresh_interval else {
            return;
        };
        let weak: Weak<Self> = Arc::downgrade(self);
        self.tasks.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately, right after bootstrap.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = inner.control_connection.refresh().await {
                    inner
                        .events
                        .log(LogLevel::Warning, format!("Metadata refresh failed: {}", e));
                }
            }
        });
    }

    async fn teardown(&self) {
        self.events.log(LogLevel::Info, "Shutting down");
        self.shutdown_tx.send_replace(true);
        self.tasks.abort_all();

        let hosts = self.control_connection.hosts();
        join_all(hosts.values().map(|host| host.shutdown_pool())).await;
        self.control_connection.shutdown().await;

        self.transitions().state = LifecycleState::Shutdown;
        self.events.close();
        debug!("Client shut down");
    }
}
