//! Collaborators performing the actual network requests.

use std::sync::Arc;

use async_trait::async_trait;

use super::options::ResolvedExecutionOptions;
use super::Client;
use crate::errors::RequestError;
use crate::policies::load_balancing::LoadBalancingPolicy;
use crate::response::QueryResult;
use crate::statement::{PreparedStatement, Request};

/// Sends requests to the cluster.
///
/// Implementations pick hosts with the resolved load balancing policy,
/// apply the read timeout and consult the retry policy. Errors are
/// returned to the caller of the client unchanged.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn send(
        &self,
        request: &Request,
        options: &ResolvedExecutionOptions,
        client: &Client,
    ) -> Result<QueryResult, RequestError>;
}

/// Prepares statements on the cluster.
///
/// The client caches prepared statements, so an implementation is called
/// once per distinct (keyspace, query) pair.
#[async_trait]
pub trait PrepareHandler: Send + Sync {
    async fn prepare(
        &self,
        client: &Client,
        load_balancing_policy: &Arc<dyn LoadBalancingPolicy>,
        query: &str,
        keyspace: Option<&str>,
    ) -> Result<PreparedStatement, RequestError>;
}
