use std::sync::Arc;

use cqlexec_cql::Values;

use super::PreparedStatement;

/// Type of a batch, derived from the `logged` and `counter` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchType {
    #[default]
    Logged,
    Unlogged,
    Counter,
}

impl BatchType {
    pub(crate) fn from_flags(logged: bool, counter: bool) -> Self {
        match (counter, logged) {
            (true, _) => BatchType::Counter,
            (false, true) => BatchType::Logged,
            (false, false) => BatchType::Unlogged,
        }
    }
}

/// A statement of a batch, as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub query: String,
    pub values: Values,
}

impl BatchEntry {
    pub fn new(query: impl Into<String>, values: impl Into<Values>) -> Self {
        BatchEntry {
            query: query.into(),
            values: values.into(),
        }
    }
}

impl From<&str> for BatchEntry {
    fn from(query: &str) -> Self {
        BatchEntry::new(query, Values::Empty)
    }
}

impl From<String> for BatchEntry {
    fn from(query: String) -> Self {
        BatchEntry::new(query, Values::Empty)
    }
}

impl<V: Into<Values>> From<(&str, V)> for BatchEntry {
    fn from((query, values): (&str, V)) -> Self {
        BatchEntry::new(query, values)
    }
}

/// A statement of a batch request, with values bound.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum BatchStatement {
    Query {
        query: String,
        values: Values,
    },
    Prepared {
        prepared: Arc<PreparedStatement>,
        values: Values,
    },
}
