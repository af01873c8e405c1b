use bytes::Bytes;
use cqlexec_cql::{ColumnType, Values};

use crate::client::options::TypeHints;
use crate::errors::BadQuery;

/// A bind marker of a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub typ: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, typ: ColumnType) -> Self {
        ColumnSpec {
            name: name.into(),
            typ,
        }
    }
}

/// Bind markers of a prepared statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedMetadata {
    pub col_specs: Vec<ColumnSpec>,
    /// Positions of the partition key components among the bind markers,
    /// in partition key order. Absent with old protocol versions or when
    /// the statement does not restrict the whole partition key.
    pub pk_indexes: Option<Vec<usize>>,
}

/// Represents a statement prepared on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub id: Bytes,
    pub query: String,
    pub keyspace: Option<String>,
    pub metadata: PreparedMetadata,
}

impl PreparedStatement {
    /// Types of the bind markers, usable as type hints.
    pub fn column_types(&self) -> TypeHints<ColumnType> {
        TypeHints::Positional(
            self.metadata
                .col_specs
                .iter()
                .map(|c| Some(c.typ.clone()))
                .collect(),
        )
    }

    /// Positions of the partition key components.
    ///
    /// Uses the server-provided partition key indexes when present. Falls
    /// back to the caller's routing indexes, then to the caller's routing
    /// names matched against bind marker names.
    pub(crate) fn routing_indexes(
        &self,
        routing_indexes: Option<&[usize]>,
        routing_names: Option<&[String]>,
    ) -> Option<Vec<usize>> {
        if let Some(pk_indexes) = &self.metadata.pk_indexes {
            return Some(pk_indexes.clone());
        }
        if let Some(indexes) = routing_indexes {
            return Some(indexes.to_vec());
        }
        routing_names?
            .iter()
            .map(|name| {
                self.metadata
                    .col_specs
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name))
            })
            .collect()
    }

    /// Arranges values in bind marker order.
    ///
    /// Named values are looked up by bind marker name. Every marker must
    /// get a value (possibly null).
    pub(crate) fn bind(&self, values: Values) -> Result<Values, BadQuery> {
        let expected = self.metadata.col_specs.len();
        match values {
            Values::Named(_) => self
                .metadata
                .col_specs
                .iter()
                .map(|spec| {
                    if values.contains_name(&spec.name) {
                        Ok(values.get_by_name(&spec.name).cloned())
                    } else {
                        Err(BadQuery::MissingNamedValue(spec.name.clone()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Values::Positional),
            other if other.len() != expected => Err(BadQuery::ValueCountMismatch {
                expected,
                got: other.len(),
            }),
            other => Ok(other),
        }
    }
}
