//! CQL protocol-level types shared by requests: consistencies and protocol version.

use std::fmt;

use thiserror::Error;

/// Error returned when a wire code does not map to any enum variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("No discriminant in enum `{enum_name}` matches the value `{primitive:?}`")]
pub struct TryFromPrimitiveError<T: Copy + fmt::Debug> {
    enum_name: &'static str,
    primitive: T,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    #[default]
    LocalOne = 0x000A,

    // Serial and LocalSerial are accepted as regular consistencies for
    // SELECT statements reading Paxos state.
    Serial = 0x0008,
    LocalSerial = 0x0009,
}

impl Consistency {
    /// Whether the consistency only involves the local datacenter.
    pub fn is_dc_local(self) -> bool {
        matches!(
            self,
            Consistency::LocalOne | Consistency::LocalQuorum | Consistency::LocalSerial
        )
    }
}

impl TryFrom<u16> for Consistency {
    type Error = TryFromPrimitiveError<u16>;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(Consistency::Any),
            0x0001 => Ok(Consistency::One),
            0x0002 => Ok(Consistency::Two),
            0x0003 => Ok(Consistency::Three),
            0x0004 => Ok(Consistency::Quorum),
            0x0005 => Ok(Consistency::All),
            0x0006 => Ok(Consistency::LocalQuorum),
            0x0007 => Ok(Consistency::EachQuorum),
            0x000A => Ok(Consistency::LocalOne),
            0x0008 => Ok(Consistency::Serial),
            0x0009 => Ok(Consistency::LocalSerial),
            _ => Err(TryFromPrimitiveError {
                enum_name: "Consistency",
                primitive: value,
            }),
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i16)]
pub enum SerialConsistency {
    #[default]
    Serial = 0x0008,
    LocalSerial = 0x0009,
}

impl TryFrom<i16> for SerialConsistency {
    type Error = TryFromPrimitiveError<i16>;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0x0008 => Ok(Self::Serial),
            0x0009 => Ok(Self::LocalSerial),
            _ => Err(TryFromPrimitiveError {
                enum_name: "SerialConsistency",
                primitive: value,
            }),
        }
    }
}

impl fmt::Display for SerialConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Version of the native protocol negotiated with the cluster.
///
/// A few encoding decisions depend on it: client-side timestamps exist only
/// since v3, and collections switched from 2-byte to 4-byte length prefixes
/// at the same point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u8);

impl ProtocolVersion {
    pub const V1: ProtocolVersion = ProtocolVersion(1);
    pub const V2: ProtocolVersion = ProtocolVersion(2);
    pub const V3: ProtocolVersion = ProtocolVersion(3);
    pub const V4: ProtocolVersion = ProtocolVersion(4);
    pub const V5: ProtocolVersion = ProtocolVersion(5);

    /// Highest version this crate knows how to encode for.
    pub const MAX_SUPPORTED: ProtocolVersion = ProtocolVersion::V5;

    pub const fn new(version: u8) -> Self {
        ProtocolVersion(version)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Client-provided timestamps were introduced in protocol v3.
    pub fn supports_timestamps(self) -> bool {
        self.0 > 2
    }

    /// Size in bytes of collection element counts and element lengths.
    pub fn collection_length_size(self) -> usize {
        if self.0 >= 3 {
            4
        } else {
            2
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::V4
    }
}

impl From<u8> for ProtocolVersion {
    fn from(version: u8) -> Self {
        ProtocolVersion(version)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
