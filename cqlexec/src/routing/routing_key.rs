use bytes::{BufMut, Bytes, BytesMut};
use cqlexec_cql::types::Encoder;
use cqlexec_cql::{ColumnType, CqlValue, ProtocolVersion, Values};
use smallvec::SmallVec;
use tracing::trace;

use crate::client::options::TypeHints;
use crate::errors::BadQuery;

/// Where the partition key components of a request come from.
#[derive(Debug, Clone, Copy)]
pub enum RoutingSpec<'a> {
    /// The caller already computed the routing key.
    Explicit(&'a [u8]),
    /// Components are the bound values at these positions, in key order.
    Indexes(&'a [usize]),
    /// Components are the named values with these names, in key order.
    Names(&'a [String]),
}

/// Serializes partition key components into a routing key.
///
/// A single component is used as is. Several components form a composite
/// key: each is written as a 2-byte big-endian length, the bytes, and a
/// trailing zero byte.
#[derive(Debug, Clone, Copy)]
pub struct RoutingKeyBuilder<'a> {
    encoder: &'a dyn Encoder,
    version: ProtocolVersion,
}

impl<'a> RoutingKeyBuilder<'a> {
    pub fn new(encoder: &'a dyn Encoder, version: ProtocolVersion) -> Self {
        RoutingKeyBuilder { encoder, version }
    }

    /// Computes the routing key of a request.
    ///
    /// Returns `Ok(None)` when there are no components, or when some component
    /// is missing, null or of a type that cannot be inferred. Such requests
    /// are not token-aware.
    /// Types come from `hints` when present there and are inferred from the
    /// values otherwise.
    pub fn build(
        &self,
        values: &Values,
        spec: RoutingSpec<'_>,
        hints: Option<&TypeHints<ColumnType>>,
    ) -> Result<Option<Bytes>, BadQuery> {
        let components: SmallVec<[Bytes; 8]> = match spec {
            RoutingSpec::Explicit(key) => return Ok(Some(Bytes::copy_from_slice(key))),
            RoutingSpec::Indexes(indexes) => {
                let mut components = SmallVec::with_capacity(indexes.len());
                for &index in indexes {
                    let hint = hints.and_then(|h| h.get(index));
                    match self.encode_component(values.get(index), hint)? {
                        Some(c) => components.push(c),
                        None => {
                            trace!("No routing key: component at index {} is unset", index);
                            return Ok(None);
                        }
                    }
                }
                components
            }
            RoutingSpec::Names(names) => {
                let mut components = SmallVec::with_capacity(names.len());
                for name in names {
                    let hint = hints.and_then(|h| h.get_by_name(name));
                    match self.encode_component(values.get_by_name(name), hint)? {
                        Some(c) => components.push(c),
                        None => {
                            trace!("No routing key: component {:?} is unset", name);
                            return Ok(None);
                        }
                    }
                }
                components
            }
        };

        if components.is_empty() {
            trace!("No routing key: no partition key components");
            return Ok(None);
        }
        write_encoded_routing_key(&components).map(Some)
    }

    fn encode_component(
        &self,
        value: Option<&CqlValue>,
        hint: Option<&ColumnType>,
    ) -> Result<Option<Bytes>, BadQuery> {
        let Some(value) = value else {
            return Ok(None);
        };
        let typ = match hint {
            Some(typ) => typ.clone(),
            None => match value.column_type() {
                Some(typ) => typ,
                None => return Ok(None),
            },
        };
        Ok(Some(self.encoder.encode(value, &typ, self.version)?))
    }
}

fn write_encoded_routing_key(components: &[Bytes]) -> Result<Bytes, BadQuery> {
    match components {
        [single] => Ok(single.clone()),
        composite => {
            let size = composite.iter().map(|c| c.len() + 3).sum();
            let mut buf = BytesMut::with_capacity(size);
            for value in composite {
                let len: u16 = value
                    .len()
                    .try_into()
                    .map_err(|_| BadQuery::ValuesTooLongForKey(value.len()))?;
                buf.put_u16(len);
                buf.extend_from_slice(value);
                buf.put_u8(0);
            }
            Ok(buf.freeze())
        }
    }
}
