//! Results of requests, as produced by the request handler.

use std::net::SocketAddr;

use cqlexec_cql::CqlValue;
use uuid::Uuid;

use crate::statement::ColumnSpec;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub columns: Vec<Option<CqlValue>>,
}

/// Describes a schema altering statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    /// `CREATED`, `UPDATED` or `DROPPED`.
    pub change_type: String,
    /// `KEYSPACE`, `TABLE`, `TYPE`, `FUNCTION` or `AGGREGATE`.
    pub target: String,
    pub keyspace: String,
    pub name: Option<String>,
}

/// Result of a single request.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct QueryResult {
    pub rows: Option<Vec<Row>>,
    pub col_specs: Vec<ColumnSpec>,
    /// Set when the request altered the schema.
    pub schema_change: Option<SchemaChange>,
    pub warnings: Vec<String>,
    pub tracing_id: Option<Uuid>,
    /// Host which coordinated the request.
    pub coordinator: Option<SocketAddr>,
    is_schema_in_agreement: bool,
}

impl QueryResult {
    pub fn new() -> Self {
        QueryResult {
            rows: None,
            col_specs: Vec::new(),
            schema_change: None,
            warnings: Vec::new(),
            tracing_id: None,
            coordinator: None,
            is_schema_in_agreement: true,
        }
    }

    pub fn with_rows(mut self, col_specs: Vec<ColumnSpec>, rows: Vec<Row>) -> Self {
        self.col_specs = col_specs;
        self.rows = Some(rows);
        self
    }

    pub fn with_schema_change(mut self, change: SchemaChange) -> Self {
        self.schema_change = Some(change);
        self
    }

    pub fn with_coordinator(mut self, coordinator: SocketAddr) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// False if the request changed the schema and the cluster did not
    /// agree on the new schema version in time. Always true otherwise.
    pub fn is_schema_in_agreement(&self) -> bool {
        self.is_schema_in_agreement
    }

    pub(crate) fn set_schema_in_agreement(&mut self, agreed: bool) {
        self.is_schema_in_agreement = agreed;
    }

    pub fn rows_num(&self) -> Option<usize> {
        self.rows.as_ref().map(Vec::len)
    }
}

impl Default for QueryResult {
    fn default() -> Self {
        Self::new()
    }
}
