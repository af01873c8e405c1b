//! CQL type descriptors, values and their serialization.

pub mod column_type;
pub mod serialize;
pub mod value;

pub use column_type::{
    CollectionType, ColumnType, NativeType, TypeHintParseError, TypeHintParseErrorKind,
};
pub use serialize::{DefaultEncoder, Encoder, SerializationError};
pub use value::{CqlDuration, CqlValue, Values};
