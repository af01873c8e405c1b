pub mod types;

pub use types::{Consistency, ProtocolVersion, SerialConsistency};
