//! Requests handed to the request handler.

use std::sync::Arc;

use cqlexec_cql::Values;

mod batch;
mod prepared;

pub use batch::{BatchEntry, BatchStatement, BatchType};
pub use prepared::{ColumnSpec, PreparedMetadata, PreparedStatement};

/// A request ready to be sent, with values bound.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Request {
    /// Unprepared statement, values bound by position.
    Query { query: String, values: Values },
    /// Prepared statement, values in bind marker order.
    Execute {
        prepared: Arc<PreparedStatement>,
        values: Values,
    },
    Batch {
        batch_type: BatchType,
        statements: Vec<BatchStatement>,
    },
}
