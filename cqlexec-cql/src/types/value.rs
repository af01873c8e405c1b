//! Values bound to statements.

use std::net::IpAddr;

use uuid::Uuid;

use super::column_type::{ColumnType, NativeType};

/// CQL duration: months, days and nanoseconds, each encoded as a vint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CqlDuration {
    pub months: i32,
    pub days: i32,
    pub nanoseconds: i64,
}

/// A typed CQL value. Nulls are represented on the binding level,
/// as `None` in [`Values`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CqlValue {
    Ascii(String),
    Boolean(bool),
    Blob(Vec<u8>),
    Counter(i64),
    Decimal {
        scale: i32,
        /// Two's complement, big-endian unscaled value.
        unscaled: Vec<u8>,
    },
    Date(u32),
    Double(f64),
    Duration(CqlDuration),
    Float(f32),
    Int(i32),
    BigInt(i64),
    Text(String),
    /// Milliseconds since the unix epoch.
    Timestamp(i64),
    Inet(IpAddr),
    List(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
    Set(Vec<CqlValue>),
    UserDefinedType {
        keyspace: String,
        name: String,
        fields: Vec<(String, Option<CqlValue>)>,
    },
    SmallInt(i16),
    TinyInt(i8),
    /// Nanoseconds since midnight.
    Time(i64),
    Timeuuid(Uuid),
    Tuple(Vec<Option<CqlValue>>),
    Uuid(Uuid),
    /// Two's complement, big-endian.
    Varint(Vec<u8>),
}

impl CqlValue {
    /// Name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CqlValue::Ascii(_) => "ascii",
            CqlValue::Boolean(_) => "boolean",
            CqlValue::Blob(_) => "blob",
            CqlValue::Counter(_) => "counter",
            CqlValue::Decimal { .. } => "decimal",
            CqlValue::Date(_) => "date",
            CqlValue::Double(_) => "double",
            CqlValue::Duration(_) => "duration",
            CqlValue::Float(_) => "float",
            CqlValue::Int(_) => "int",
            CqlValue::BigInt(_) => "bigint",
            CqlValue::Text(_) => "text",
            CqlValue::Timestamp(_) => "timestamp",
            CqlValue::Inet(_) => "inet",
            CqlValue::List(_) => "list",
            CqlValue::Map(_) => "map",
            CqlValue::Set(_) => "set",
            CqlValue::UserDefinedType { .. } => "udt",
            CqlValue::SmallInt(_) => "smallint",
            CqlValue::TinyInt(_) => "tinyint",
            CqlValue::Time(_) => "time",
            CqlValue::Timeuuid(_) => "timeuuid",
            CqlValue::Tuple(_) => "tuple",
            CqlValue::Uuid(_) => "uuid",
            CqlValue::Varint(_) => "varint",
        }
    }

    /// Infers the type descriptor of the value.
    ///
    /// Returns `None` when the type cannot be determined, which happens for
    /// empty collections and for tuples containing nulls.
    pub fn column_type(&self) -> Option<ColumnType> {
        let native = |n| Some(ColumnType::Native(n));
        match self {
            CqlValue::Ascii(_) => native(NativeType::Ascii),
            CqlValue::Boolean(_) => native(NativeType::Boolean),
            CqlValue::Blob(_) => native(NativeType::Blob),
            CqlValue::Counter(_) => native(NativeType::Counter),
            CqlValue::Decimal { .. } => native(NativeType::Decimal),
            CqlValue::Date(_) => native(NativeType::Date),
            CqlValue::Double(_) => native(NativeType::Double),
            CqlValue::Duration(_) => native(NativeType::Duration),
            CqlValue::Float(_) => native(NativeType::Float),
            CqlValue::Int(_) => native(NativeType::Int),
            CqlValue::BigInt(_) => native(NativeType::BigInt),
            CqlValue::Text(_) => native(NativeType::Text),
            CqlValue::Timestamp(_) => native(NativeType::Timestamp),
            CqlValue::Inet(_) => native(NativeType::Inet),
            CqlValue::SmallInt(_) => native(NativeType::SmallInt),
            CqlValue::TinyInt(_) => native(NativeType::TinyInt),
            CqlValue::Time(_) => native(NativeType::Time),
            CqlValue::Timeuuid(_) => native(NativeType::Timeuuid),
            CqlValue::Uuid(_) => native(NativeType::Uuid),
            CqlValue::Varint(_) => native(NativeType::Varint),
            CqlValue::List(elems) => elems.first()?.column_type().map(ColumnType::list),
            CqlValue::Set(elems) => elems.first()?.column_type().map(ColumnType::set),
            CqlValue::Map(entries) => {
                let (k, v) = entries.first()?;
                Some(ColumnType::map(k.column_type()?, v.column_type()?))
            }
            CqlValue::Tuple(elems) => elems
                .iter()
                .map(|e| e.as_ref().and_then(CqlValue::column_type))
                .collect::<Option<Vec<_>>>()
                .map(ColumnType::Tuple),
            CqlValue::UserDefinedType { keyspace, name, .. } => {
                Some(ColumnType::udt(keyspace.clone(), name.clone()))
            }
        }
    }
}

macro_rules! impl_from_for_cql_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for CqlValue {
                fn from(v: $t) -> Self {
                    CqlValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_cql_value!(
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    Uuid => Uuid,
    IpAddr => Inet,
    CqlDuration => Duration,
);

/// Values bound to a statement, either by position or by name.
///
/// Named values keep their insertion order. Names are matched
/// case-insensitively, like unquoted CQL identifiers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Values {
    #[default]
    Empty,
    Positional(Vec<Option<CqlValue>>),
    Named(Vec<(String, Option<CqlValue>)>),
}

impl Values {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Option<CqlValue>>,
    {
        Values::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, N, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Option<CqlValue>>,
    {
        Values::Named(
            values
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Empty => 0,
            Values::Positional(v) => v.len(),
            Values::Named(v) => v.len(),
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Values::Named(_))
    }

    /// Value at given position. For named values, the insertion order is used.
    /// Returns `None` both for a missing value and for a bound null.
    pub fn get(&self, index: usize) -> Option<&CqlValue> {
        match self {
            Values::Empty => None,
            Values::Positional(v) => v.get(index)?.as_ref(),
            Values::Named(v) => v.get(index)?.1.as_ref(),
        }
    }

    /// Value bound to given name. Always `None` for positional values.
    pub fn get_by_name(&self, name: &str) -> Option<&CqlValue> {
        match self {
            Values::Named(v) => v
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))?
                .1
                .as_ref(),
            _ => None,
        }
    }

    /// Returns true if a (possibly null) value is bound to the name.
    pub fn contains_name(&self, name: &str) -> bool {
        match self {
            Values::Named(v) => v.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)),
            _ => false,
        }
    }
}

impl From<()> for Values {
    fn from(_: ()) -> Self {
        Values::Empty
    }
}

impl From<Vec<CqlValue>> for Values {
    fn from(values: Vec<CqlValue>) -> Self {
        Values::positional(values)
    }
}

impl From<Vec<Option<CqlValue>>> for Values {
    fn from(values: Vec<Option<CqlValue>>) -> Self {
        Values::Positional(values)
    }
}
