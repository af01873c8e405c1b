//! Defines CQL protocol-level types used by the `cqlexec` client core:
//! consistencies, protocol version, type descriptors with their hint parser,
//! bound values and the value encoder.

pub mod frame;
pub mod types;

pub(crate) mod utils;

pub use crate::frame::types::{Consistency, ProtocolVersion, SerialConsistency};
pub use crate::types::{ColumnType, CqlValue, Values};
