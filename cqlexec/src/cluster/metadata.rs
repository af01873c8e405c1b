use async_trait::async_trait;
use cqlexec_cql::ColumnType;

use super::Host;
use crate::errors::RequestError;

/// Definition of a user defined type, as found in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtDefinition {
    pub keyspace: String,
    pub name: String,
    pub field_types: Vec<(String, ColumnType)>,
}

/// Access to schema information kept by the driver.
#[async_trait]
pub trait Metadata: Send + Sync {
    /// Returns true if every host reachable from `control_host` reports
    /// the same schema version.
    async fn compare_schema_versions(&self, control_host: &Host) -> Result<bool, RequestError>;

    /// Looks up a user defined type. Returns `None` if it does not exist.
    async fn get_udt(
        &self,
        keyspace: &str,
        name: &str,
    ) -> Result<Option<UdtDefinition>, RequestError>;
}
