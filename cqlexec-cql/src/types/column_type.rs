//! Type descriptors of CQL values and the parser of human-readable type hints.
//!
//! Type hints are what users attach to bound values when the driver cannot
//! learn their types from prepared statement metadata, e.g. to compute
//! a routing key for an unprepared statement:
//!
//! ```
//! # use cqlexec_cql::types::{ColumnType, NativeType};
//! let typ = ColumnType::parse("map<text, list<int>>").unwrap();
//! assert_eq!(
//!     typ,
//!     ColumnType::map(
//!         ColumnType::Native(NativeType::Text),
//!         ColumnType::list(ColumnType::Native(NativeType::Int)),
//!     )
//! );
//! ```

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

use crate::utils::parse::{ParseError, ParseErrorCause, ParseResult, ParserState};

/// Types that are not parametrized by any other type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NativeType {
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Text,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    Timeuuid,
    Inet,
    Date,
    Time,
    SmallInt,
    TinyInt,
    Duration,
}

impl NativeType {
    const ALL: [NativeType; 21] = [
        NativeType::Ascii,
        NativeType::BigInt,
        NativeType::Blob,
        NativeType::Boolean,
        NativeType::Counter,
        NativeType::Decimal,
        NativeType::Double,
        NativeType::Float,
        NativeType::Int,
        NativeType::Text,
        NativeType::Timestamp,
        NativeType::Uuid,
        NativeType::Varchar,
        NativeType::Varint,
        NativeType::Timeuuid,
        NativeType::Inet,
        NativeType::Date,
        NativeType::Time,
        NativeType::SmallInt,
        NativeType::TinyInt,
        NativeType::Duration,
    ];

    /// Option id of the type in the native protocol.
    pub fn code(self) -> u16 {
        match self {
            NativeType::Ascii => 0x0001,
            NativeType::BigInt => 0x0002,
            NativeType::Blob => 0x0003,
            NativeType::Boolean => 0x0004,
            NativeType::Counter => 0x0005,
            NativeType::Decimal => 0x0006,
            NativeType::Double => 0x0007,
            NativeType::Float => 0x0008,
            NativeType::Int => 0x0009,
            NativeType::Text => 0x000A,
            NativeType::Timestamp => 0x000B,
            NativeType::Uuid => 0x000C,
            NativeType::Varchar => 0x000D,
            NativeType::Varint => 0x000E,
            NativeType::Timeuuid => 0x000F,
            NativeType::Inet => 0x0010,
            NativeType::Date => 0x0011,
            NativeType::Time => 0x0012,
            NativeType::SmallInt => 0x0013,
            NativeType::TinyInt => 0x0014,
            NativeType::Duration => 0x0015,
        }
    }

    /// CQL name of the type, as it appears in type hints.
    pub fn name(self) -> &'static str {
        match self {
            NativeType::Ascii => "ascii",
            NativeType::BigInt => "bigint",
            NativeType::Blob => "blob",
            NativeType::Boolean => "boolean",
            NativeType::Counter => "counter",
            NativeType::Decimal => "decimal",
            NativeType::Double => "double",
            NativeType::Float => "float",
            NativeType::Int => "int",
            NativeType::Text => "text",
            NativeType::Timestamp => "timestamp",
            NativeType::Uuid => "uuid",
            NativeType::Varchar => "varchar",
            NativeType::Varint => "varint",
            NativeType::Timeuuid => "timeuuid",
            NativeType::Inet => "inet",
            NativeType::Date => "date",
            NativeType::Time => "time",
            NativeType::SmallInt => "smallint",
            NativeType::TinyInt => "tinyint",
            NativeType::Duration => "duration",
        }
    }

    /// Case-insensitive lookup by CQL name.
    pub fn from_name(name: &str) -> Option<NativeType> {
        Self::ALL
            .into_iter()
            .find(|typ| typ.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionType {
    List(Box<ColumnType>),
    Set(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
}

/// A structured descriptor of a CQL type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ColumnType {
    Native(NativeType),
    Collection(CollectionType),
    /// A user defined type. `field_types` is empty until the definition
    /// is fetched from cluster metadata; a hint only carries the name.
    UserDefinedType {
        keyspace: String,
        name: String,
        field_types: Vec<(String, ColumnType)>,
    },
    Tuple(Vec<ColumnType>),
}

pub const LIST_CODE: u16 = 0x0020;
pub const MAP_CODE: u16 = 0x0021;
pub const SET_CODE: u16 = 0x0022;
pub const UDT_CODE: u16 = 0x0030;
pub const TUPLE_CODE: u16 = 0x0031;

impl ColumnType {
    pub fn list(element: ColumnType) -> Self {
        ColumnType::Collection(CollectionType::List(Box::new(element)))
    }

    pub fn set(element: ColumnType) -> Self {
        ColumnType::Collection(CollectionType::Set(Box::new(element)))
    }

    pub fn map(key: ColumnType, value: ColumnType) -> Self {
        ColumnType::Collection(CollectionType::Map(Box::new(key), Box::new(value)))
    }

    /// Creates an unresolved UDT descriptor, as produced by hint parsing.
    pub fn udt(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnType::UserDefinedType {
            keyspace: keyspace.into(),
            name: name.into(),
            field_types: Vec::new(),
        }
    }

    /// Option id of the outermost type in the native protocol.
    pub fn code(&self) -> u16 {
        match self {
            ColumnType::Native(n) => n.code(),
            ColumnType::Collection(CollectionType::List(_)) => LIST_CODE,
            ColumnType::Collection(CollectionType::Map(_, _)) => MAP_CODE,
            ColumnType::Collection(CollectionType::Set(_)) => SET_CODE,
            ColumnType::UserDefinedType { .. } => UDT_CODE,
            ColumnType::Tuple(_) => TUPLE_CODE,
        }
    }

    /// Returns true if this type, or any type nested in it, is a UDT
    /// whose definition has not been fetched yet.
    pub fn has_unresolved_udt(&self) -> bool {
        match self {
            ColumnType::Native(_) => false,
            ColumnType::Collection(CollectionType::List(t) | CollectionType::Set(t)) => {
                t.has_unresolved_udt()
            }
            ColumnType::Collection(CollectionType::Map(k, v)) => {
                k.has_unresolved_udt() || v.has_unresolved_udt()
            }
            ColumnType::UserDefinedType { field_types, .. } => {
                field_types.is_empty() || field_types.iter().any(|(_, t)| t.has_unresolved_udt())
            }
            ColumnType::Tuple(types) => types.iter().any(ColumnType::has_unresolved_udt),
        }
    }

    /// Parses a type hint such as `int`, `list<text>`, `map<text, list<int>>`,
    /// `tuple<int, text>` or `udt<keyspace.name>`.
    ///
    /// Type names are case-insensitive. `frozen<T>` is accepted and is
    /// equivalent to `T`. Any unresolvable token fails the whole hint.
    pub fn parse(hint: &str) -> Result<ColumnType, TypeHintParseError> {
        TypeHintParser::parse(hint)
    }
}

impl FromStr for ColumnType {
    type Err = TypeHintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::parse(s)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Native(n) => f.write_str(n.name()),
            ColumnType::Collection(CollectionType::List(t)) => write!(f, "list<{}>", t),
            ColumnType::Collection(CollectionType::Set(t)) => write!(f, "set<{}>", t),
            ColumnType::Collection(CollectionType::Map(k, v)) => write!(f, "map<{}, {}>", k, v),
            ColumnType::UserDefinedType { keyspace, name, .. } => {
                write!(f, "udt<{}.{}>", keyspace, name)
            }
            ColumnType::Tuple(types) => write!(f, "tuple<{}>", types.iter().format(", ")),
        }
    }
}

/// Failed to parse a type hint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid type hint {hint:?}: {kind}")]
pub struct TypeHintParseError {
    pub hint: String,
    pub kind: TypeHintParseErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeHintParseErrorKind {
    #[error("unknown type name {0:?}")]
    UnknownTypeName(String),

    #[error("type {type_name} expects {expected} type argument(s), got {got}")]
    WrongArgumentCount {
        type_name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("type {0} does not accept type arguments")]
    UnexpectedArguments(String),

    #[error("udt hint must have the form udt<keyspace.name>, got {0:?}")]
    InvalidUdtName(String),

    #[error("syntax error at position {position}: {cause}")]
    Syntax { position: usize, cause: String },
}

struct TypeHintParser<'h> {
    hint: &'h str,
}

// Identifiers inside hints. Dots are allowed so that `udt<ks.name>` can be
// read as a single token and validated afterwards.
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

impl<'h> TypeHintParser<'h> {
    fn parse(hint: &'h str) -> Result<ColumnType, TypeHintParseError> {
        let parser = TypeHintParser { hint };
        let p = ParserState::new(hint).skip_white();
        let (typ, p) = parser.parse_type(p)?;
        let p = p.skip_white();
        if !p.is_at_eof() {
            return Err(parser.syntax_error(p.error(ParseErrorCause::Other("trailing characters"))));
        }
        Ok(typ)
    }

    fn error(&self, kind: TypeHintParseErrorKind) -> TypeHintParseError {
        TypeHintParseError {
            hint: self.hint.to_owned(),
            kind,
        }
    }

    fn syntax_error(&self, err: ParseError) -> TypeHintParseError {
        self.error(TypeHintParseErrorKind::Syntax {
            position: err.calculate_position(self.hint).unwrap_or(0),
            cause: err.cause.to_string(),
        })
    }

    fn lex<T>(&self, res: ParseResult<T>) -> Result<T, TypeHintParseError> {
        res.map_err(|e| self.syntax_error(e))
    }

    fn parse_type<'s>(
        &self,
        p: ParserState<'s>,
    ) -> Result<(ColumnType, ParserState<'s>), TypeHintParseError> {
        let (name, p) = p.take_while(is_identifier_char);
        if name.is_empty() {
            return Err(self.syntax_error(p.error(ParseErrorCause::Other("expected type name"))));
        }
        let p = p.skip_white();
        let (has_args, p) = p.try_accept("<");
        if !has_args {
            return self.native(name).map(|t| (t, p));
        }

        let lowercase = name.to_ascii_lowercase();
        if lowercase == "udt" {
            let p = p.skip_white();
            let (qualified, p) = p.take_while(is_identifier_char);
            let p = self.lex(p.skip_white().accept(">"))?;
            return self.udt(qualified).map(|t| (t, p));
        }

        let (args, p) = self.parse_arguments(p)?;
        let typ = match lowercase.as_str() {
            "list" => ColumnType::list(self.single_argument("list", args)?),
            "set" => ColumnType::set(self.single_argument("set", args)?),
            "frozen" => self.single_argument("frozen", args)?,
            "map" => {
                let got = args.len();
                let [key, value]: [ColumnType; 2] = args.try_into().map_err(|_| {
                    self.error(TypeHintParseErrorKind::WrongArgumentCount {
                        type_name: "map",
                        expected: 2,
                        got,
                    })
                })?;
                ColumnType::map(key, value)
            }
            "tuple" => ColumnType::Tuple(args),
            _ => {
                // Make sure unknown names are reported as such, and not
                // as a misuse of type arguments.
                self.native(name)?;
                return Err(self.error(TypeHintParseErrorKind::UnexpectedArguments(
                    name.to_owned(),
                )));
            }
        };
        Ok((typ, p))
    }

    // Parses `T1, T2, ... >`; the opening `<` has already been consumed.
    fn parse_arguments<'s>(
        &self,
        mut p: ParserState<'s>,
    ) -> Result<(Vec<ColumnType>, ParserState<'s>), TypeHintParseError> {
        let mut args = Vec::new();
        loop {
            let (arg, next) = self.parse_type(p.skip_white())?;
            args.push(arg);
            let next = next.skip_white();
            let (more, next) = next.try_accept(",");
            if more {
                p = next;
                continue;
            }
            let next = self.lex(next.accept(">"))?;
            return Ok((args, next));
        }
    }

    fn single_argument(
        &self,
        type_name: &'static str,
        mut args: Vec<ColumnType>,
    ) -> Result<ColumnType, TypeHintParseError> {
        if args.len() != 1 {
            return Err(self.error(TypeHintParseErrorKind::WrongArgumentCount {
                type_name,
                expected: 1,
                got: args.len(),
            }));
        }
        Ok(args.remove(0))
    }

    fn native(&self, name: &str) -> Result<ColumnType, TypeHintParseError> {
        NativeType::from_name(name)
            .map(ColumnType::Native)
            .ok_or_else(|| self.error(TypeHintParseErrorKind::UnknownTypeName(name.to_owned())))
    }

    fn udt(&self, qualified: &str) -> Result<ColumnType, TypeHintParseError> {
        let mut parts = qualified.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(keyspace), Some(name), None) if !keyspace.is_empty() && !name.is_empty() => {
                Ok(ColumnType::udt(keyspace, name))
            }
            _ => Err(self.error(TypeHintParseErrorKind::InvalidUdtName(
                qualified.to_owned(),
            ))),
        }
    }
}
