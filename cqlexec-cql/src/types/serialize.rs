//! Serialization of single CQL values to their wire representation.

use std::fmt::Debug;
use std::net::IpAddr;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::column_type::{CollectionType, ColumnType, NativeType};
use super::value::{CqlDuration, CqlValue};
use crate::frame::types::ProtocolVersion;

/// Failed to serialize a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SerializationError {
    #[error("Cannot serialize a {got} value as {expected}")]
    TypeMismatch { expected: String, got: &'static str },

    #[error("Value of {0} bytes does not fit the length prefix of protocol {1}")]
    ValueTooLong(usize, ProtocolVersion),

    #[error("Tuple value has {got} elements, but type {expected} has {expected_len}")]
    TupleLengthMismatch {
        expected: String,
        expected_len: usize,
        got: usize,
    },

    #[error("UDT value has a field {field:?} not present in the definition of {udt}")]
    UnknownUdtField { udt: String, field: String },
}

/// Turns a typed value into bytes, given the target type.
///
/// The output is the value body only, without the `[bytes]` length prefix
/// used when the value is sent as a bound parameter.
pub trait Encoder: Debug + Send + Sync {
    fn encode(
        &self,
        value: &CqlValue,
        typ: &ColumnType,
        version: ProtocolVersion,
    ) -> Result<Bytes, SerializationError>;
}

/// Encoder implementing the native protocol encoding of all CQL types.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEncoder;

impl DefaultEncoder {
    pub fn new() -> Self {
        DefaultEncoder
    }
}

impl Encoder for DefaultEncoder {
    fn encode(
        &self,
        value: &CqlValue,
        typ: &ColumnType,
        version: ProtocolVersion,
    ) -> Result<Bytes, SerializationError> {
        let mut buf = BytesMut::new();
        write_value(&mut buf, value, typ, version)?;
        Ok(buf.freeze())
    }
}

fn mismatch(value: &CqlValue, typ: &ColumnType) -> SerializationError {
    SerializationError::TypeMismatch {
        expected: typ.to_string(),
        got: value.kind(),
    }
}

fn write_value(
    buf: &mut BytesMut,
    value: &CqlValue,
    typ: &ColumnType,
    version: ProtocolVersion,
) -> Result<(), SerializationError> {
    match typ {
        ColumnType::Native(native) => write_native(buf, value, *native, typ),
        ColumnType::Collection(CollectionType::List(elem))
        | ColumnType::Collection(CollectionType::Set(elem)) => {
            let elems = match value {
                CqlValue::List(v) | CqlValue::Set(v) => v,
                _ => return Err(mismatch(value, typ)),
            };
            write_length(buf, elems.len(), version)?;
            for e in elems {
                write_element(buf, Some(e), elem, version)?;
            }
            Ok(())
        }
        ColumnType::Collection(CollectionType::Map(key_type, value_type)) => {
            let CqlValue::Map(entries) = value else {
                return Err(mismatch(value, typ));
            };
            write_length(buf, entries.len(), version)?;
            for (k, v) in entries {
                write_element(buf, Some(k), key_type, version)?;
                write_element(buf, Some(v), value_type, version)?;
            }
            Ok(())
        }
        ColumnType::Tuple(types) => {
            let CqlValue::Tuple(elems) = value else {
                return Err(mismatch(value, typ));
            };
            if elems.len() > types.len() {
                return Err(SerializationError::TupleLengthMismatch {
                    expected: typ.to_string(),
                    expected_len: types.len(),
                    got: elems.len(),
                });
            }
            // Tuple elements are always prefixed with a 4-byte length.
            for (elem, elem_type) in elems.iter().zip(types) {
                write_bytes_opt(buf, elem.as_ref(), elem_type, ProtocolVersion::V4, version)?;
            }
            Ok(())
        }
        ColumnType::UserDefinedType { field_types, .. } => {
            let CqlValue::UserDefinedType { fields, .. } = value else {
                return Err(mismatch(value, typ));
            };
            if field_types.is_empty() {
                // Definition unknown: trust the value, in its own field order.
                for (_, field) in fields {
                    let inferred = field.as_ref().and_then(CqlValue::column_type);
                    match (field, inferred) {
                        (Some(v), Some(t)) => {
                            write_bytes_opt(buf, Some(v), &t, ProtocolVersion::V4, version)?
                        }
                        (Some(v), None) => return Err(mismatch(v, typ)),
                        (None, _) => buf.put_i32(-1),
                    }
                }
                return Ok(());
            }
            if let Some((unknown, _)) = fields
                .iter()
                .find(|(name, _)| !field_types.iter().any(|(n, _)| n == name))
            {
                return Err(SerializationError::UnknownUdtField {
                    udt: typ.to_string(),
                    field: unknown.clone(),
                });
            }
            for (field_name, field_type) in field_types {
                let field_value = fields
                    .iter()
                    .find(|(n, _)| n == field_name)
                    .and_then(|(_, v)| v.as_ref());
                write_bytes_opt(buf, field_value, field_type, ProtocolVersion::V4, version)?;
            }
            Ok(())
        }
    }
}

// Element of a collection: its length prefix size depends on the protocol version.
fn write_element(
    buf: &mut BytesMut,
    value: Option<&CqlValue>,
    typ: &ColumnType,
    version: ProtocolVersion,
) -> Result<(), SerializationError> {
    write_bytes_opt(buf, value, typ, version, version)
}

fn write_bytes_opt(
    buf: &mut BytesMut,
    value: Option<&CqlValue>,
    typ: &ColumnType,
    prefix_version: ProtocolVersion,
    version: ProtocolVersion,
) -> Result<(), SerializationError> {
    let Some(value) = value else {
        if prefix_version.collection_length_size() == 4 {
            buf.put_i32(-1);
        } else {
            buf.put_i16(-1);
        }
        return Ok(());
    };
    let mut inner = BytesMut::new();
    write_value(&mut inner, value, typ, version)?;
    write_length(buf, inner.len(), prefix_version)?;
    buf.put_slice(&inner);
    Ok(())
}

fn write_length(
    buf: &mut BytesMut,
    len: usize,
    version: ProtocolVersion,
) -> Result<(), SerializationError> {
    if version.collection_length_size() == 4 {
        let len: i32 = len
            .try_into()
            .map_err(|_| SerializationError::ValueTooLong(len, version))?;
        buf.put_i32(len);
    } else {
        let len: u16 = len
            .try_into()
            .map_err(|_| SerializationError::ValueTooLong(len, version))?;
        buf.put_u16(len);
    }
    Ok(())
}

fn write_native(
    buf: &mut BytesMut,
    value: &CqlValue,
    native: NativeType,
    typ: &ColumnType,
) -> Result<(), SerializationError> {
    match (native, value) {
        (NativeType::Ascii | NativeType::Text | NativeType::Varchar, CqlValue::Text(s))
        | (NativeType::Ascii | NativeType::Text | NativeType::Varchar, CqlValue::Ascii(s)) => {
            buf.put_slice(s.as_bytes())
        }
        (NativeType::Blob, CqlValue::Blob(b)) => buf.put_slice(b),
        (NativeType::Boolean, CqlValue::Boolean(b)) => buf.put_u8(u8::from(*b)),
        (NativeType::BigInt | NativeType::Counter, CqlValue::BigInt(v) | CqlValue::Counter(v)) => {
            buf.put_i64(*v)
        }
        (NativeType::Timestamp, CqlValue::Timestamp(v) | CqlValue::BigInt(v)) => buf.put_i64(*v),
        (NativeType::Int, CqlValue::Int(v)) => buf.put_i32(*v),
        (NativeType::SmallInt, CqlValue::SmallInt(v)) => buf.put_i16(*v),
        (NativeType::TinyInt, CqlValue::TinyInt(v)) => buf.put_i8(*v),
        (NativeType::Double, CqlValue::Double(v)) => buf.put_f64(*v),
        (NativeType::Float, CqlValue::Float(v)) => buf.put_f32(*v),
        (NativeType::Date, CqlValue::Date(v)) => buf.put_u32(*v),
        (NativeType::Time, CqlValue::Time(v)) => buf.put_i64(*v),
        (NativeType::Uuid | NativeType::Timeuuid, CqlValue::Uuid(u) | CqlValue::Timeuuid(u)) => {
            buf.put_slice(u.as_bytes())
        }
        (NativeType::Inet, CqlValue::Inet(IpAddr::V4(a))) => buf.put_slice(&a.octets()),
        (NativeType::Inet, CqlValue::Inet(IpAddr::V6(a))) => buf.put_slice(&a.octets()),
        (NativeType::Varint, CqlValue::Varint(v)) => buf.put_slice(v),
        (NativeType::Decimal, CqlValue::Decimal { scale, unscaled }) => {
            buf.put_i32(*scale);
            buf.put_slice(unscaled);
        }
        (NativeType::Duration, CqlValue::Duration(d)) => write_duration(buf, d),
        _ => return Err(mismatch(value, typ)),
    }
    Ok(())
}

fn write_duration(buf: &mut BytesMut, d: &CqlDuration) {
    write_vint(buf, d.months.into());
    write_vint(buf, d.days.into());
    write_vint(buf, d.nanoseconds);
}

// Zigzag-encoded, variable length integer: the number of leading one bits
// in the first byte tells how many extra bytes follow.
fn write_vint(buf: &mut BytesMut, v: i64) {
    let zigzag = ((v << 1) ^ (v >> 63)) as u64;
    let significant_bits = 64 - zigzag.leading_zeros().min(63) as usize;
    let mut extra_bytes = 0;
    while extra_bytes < 8 && significant_bits > 7 * (extra_bytes + 1) {
        extra_bytes += 1;
    }
    if extra_bytes == 8 {
        buf.put_u8(0xFF);
        buf.put_u64(zigzag);
        return;
    }
    let total = extra_bytes + 1;
    let mut bytes = zigzag.to_be_bytes()[8 - total..].to_vec();
    let marker = !(0xFFu8 >> extra_bytes);
    bytes[0] |= marker;
    buf.put_slice(&bytes);
}
