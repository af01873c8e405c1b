//! Client-side execution core of a token-aware CQL driver.
//!
//! A [`Client`](client::Client) turns a statement, its bound values and
//! per-request [`QueryOptions`](client::options::QueryOptions) into a
//! request ready to be sent: options are merged with
//! [execution profiles](client::execution_profile), a client timestamp is
//! assigned, a routing key is computed from the partition key values, and
//! the result is handed to a pluggable [`RequestHandler`](client::RequestHandler).
//!
//! Network I/O is done by collaborators injected through the
//! [`ClientBuilder`](client::ClientBuilder): the
//! [control connection](cluster::ControlConnection), the request and prepare
//! handlers, and the [schema metadata](cluster::Metadata). The client itself
//! coordinates them:
//! * concurrent first requests share a single cluster bootstrap,
//! * `shutdown` is idempotent and stops every background task,
//! * after schema changes, the client waits until the cluster agrees on
//!   the schema version.

pub mod client;
pub mod cluster;
pub mod errors;
pub mod policies;
pub mod response;
pub mod routing;
pub mod statement;
pub(crate) mod utils;

pub use cqlexec_cql::{ColumnType, Consistency, CqlValue, ProtocolVersion, SerialConsistency, Values};

/// Serializing bound values.
pub mod serialize {
    pub use cqlexec_cql::types::{DefaultEncoder, Encoder, SerializationError};
}

pub use client::execution_profile::ExecutionProfile;
pub use client::{Client, ClientBuilder};
