//! This module contains various errors which can be returned by the client.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

pub use cqlexec_cql::types::{SerializationError, TypeHintParseError};
use thiserror::Error;

/// Error returned by [`Client`](crate::client::Client) request methods.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Caller passed an invalid request.
    #[error(transparent)]
    BadQuery(#[from] BadQuery),

    /// A type hint supplied with the request could not be parsed.
    #[error(transparent)]
    BadTypeHint(#[from] TypeHintParseError),

    /// The client could not be connected, or has already been shut down.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Failed to prepare the statement.
    #[error("Failed to prepare the statement: {0}")]
    PrepareError(RequestError),

    /// The request handler failed to execute the request.
    #[error(transparent)]
    RequestError(#[from] RequestError),

    /// Waiting for schema agreement after a schema change failed.
    #[error(transparent)]
    SchemaAgreementError(#[from] SchemaAgreementError),
}

impl ExecutionError {
    /// Returns the [`NoHostAvailableError`] if this error is caused by
    /// a lack of usable hosts.
    pub fn as_no_host_available(&self) -> Option<&NoHostAvailableError> {
        match self {
            ExecutionError::Connect(ConnectError::NoHostAvailable(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<NoHostAvailableError> for ExecutionError {
    fn from(err: NoHostAvailableError) -> Self {
        ExecutionError::Connect(err.into())
    }
}

impl From<SerializationError> for ExecutionError {
    fn from(err: SerializationError) -> Self {
        ExecutionError::BadQuery(BadQuery::SerializationError(err))
    }
}

/// The request is structurally invalid. Never retried.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum BadQuery {
    #[error(
        "Named parameters are only supported for prepared statements, \
         use positional values or enable the prepare option"
    )]
    NamedValuesForUnpreparedStatement,

    #[error("Execution profile {0:?} not found")]
    ExecutionProfileNotFound(String),

    #[error("Batch must contain at least one statement")]
    EmptyBatch,

    #[error("Batch entry at index {0} has no query text")]
    InvalidBatchEntry(usize),

    #[error("Number of Queries in Batch Statement supplied is {0} which has exceeded the max value of 65,535")]
    TooManyQueriesInBatchStatement(usize),

    #[error("No value bound for parameter {0:?}")]
    MissingNamedValue(String),

    #[error("Statement expects {expected} values, got {got}")]
    ValueCountMismatch { expected: usize, got: usize },

    #[error("Serializing values failed: {0}")]
    SerializationError(#[from] SerializationError),

    #[error("Value bytes too long to create partition key, max 65 535 allowed! value.len(): {0}")]
    ValuesTooLongForKey(usize),
}

/// No usable host exists for the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NoHostAvailableError {
    /// None of the contact point hostnames could be resolved.
    #[error("Couldn't resolve any hostname: {0:?}")]
    FailedToResolveAnyHostname(Vec<String>),

    /// The client was configured without any contact point.
    #[error("Empty known nodes list")]
    EmptyKnownNodesList,

    /// The client was used after shutdown.
    #[error("Client used after shutdown, it can not be connected anymore")]
    UsedAfterShutdown,

    /// Every resolved contact point refused the control connection.
    #[error("All contact points failed: {0:?}")]
    AllContactPointsFailed(Vec<String>),
}

/// Outcome of a failed connect. Shared by all callers that awaited the
/// same bootstrap, hence `Clone`.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ConnectError {
    #[error(transparent)]
    NoHostAvailable(#[from] NoHostAvailableError),

    /// The control connection failed for another reason.
    #[error("Control connection bootstrap failed: {0}")]
    ControlConnection(RequestError),
}

/// An error reported by a collaborator (request handler, prepare handler,
/// control connection, metadata). Propagated unchanged to the caller.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RequestError {
    /// Database sent a response containing some error with a message.
    #[error("Database returned an error: {code:#06x}, Error message: {message}")]
    DbError { code: i32, message: String },

    /// Client timeout occurred before any response arrived.
    #[error("Request timeout: {0:?}")]
    Timeout(Duration),

    /// The connection used for the request got broken.
    #[error("Connection broken: {0}")]
    BrokenConnection(String),

    /// Any other error.
    #[error(transparent)]
    Other(Arc<dyn StdError + Send + Sync>),
}

impl RequestError {
    pub fn other(err: impl StdError + Send + Sync + 'static) -> Self {
        RequestError::Other(Arc::new(err))
    }
}

/// Error that occurred while waiting for schema agreement.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum SchemaAgreementError {
    #[error("Failed to compare schema versions: {0}")]
    RequestError(#[from] RequestError),

    /// The control connection has no host to ask about schema versions.
    #[error("No control host available to check schema agreement")]
    NoControlHost,
}

/// Error returned by [`ClientBuilder::build`](crate::client::ClientBuilder::build).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientBuildError {
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Execution profile {0:?} defined more than once")]
    DuplicateExecutionProfile(String),
}
