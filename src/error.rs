//! Centralized error handling for Mapcode.
//!
//! Every fallible operation returns [`Result`]. Failures fall into two classes
//! that callers usually want to tell apart:
//!
//! - **Configuration errors** ([`MapcodeError::Configuration`]) are raised while a
//!   mapping list is being built: a collection member without an element strategy,
//!   conflicting member kinds, an ambiguous converter lookup. They surface on the
//!   first encode/decode of a type and repeat until the configuration is fixed.
//! - **Data errors** ([`MapcodeError::Data`]) are raised while decoding a
//!   particular stream: an unknown enum name, a converter asked to handle a type
//!   it does not target, a truncated or malformed payload.
//!
//! Neither class is recovered internally. The only tolerant path is the version
//! header read, which treats an unreadable header as "unversioned".
//!
//! ```rust
//! use mapcode::{Mapcode, MapcodeError};
//!
//! // `0x02` is not a valid presence flag for a `String` root.
//! match Mapcode::deserialize::<String>(&[0x02]) {
//!     Err(MapcodeError::Serialization(msg)) => eprintln!("corrupt input: {msg}"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Mapcode operations.
pub type Result<T> = std::result::Result<T, MapcodeError>;

/// The master error enum covering all failure domains in Mapcode.
///
/// This type is `Clone`; I/O errors are wrapped in `Arc` so a cached failure can
/// be handed to several callers.
#[derive(Debug, Clone)]
pub enum MapcodeError {
    /// Low-level I/O failure on a caller stream or a file opened by the facade.
    Io(Arc<io::Error>),

    /// A primitive could not be encoded or decoded by the binary codec.
    ///
    /// The string carries the codec's own message (end of input, invalid bool
    /// byte, invalid UTF-8 in a `char`, ...).
    Serialization(String),

    /// The type graph or the options cannot be turned into a mapping list.
    Configuration(ConfigError),

    /// The payload being decoded does not match what the mapping expects.
    Data(DataError),

    /// Logic error inside the engine. Should not occur; please report it.
    Internal(String),
}

/// Configuration failures, raised at mapping-list construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A list or dictionary member has no converter for its element (or key, or
    /// value) type and no `elements`/`keys`/`values` recursion annotation.
    MissingElementStrategy {
        /// `Owner.member` path of the offending member.
        member: String,
        /// Name of the element type that could not be resolved.
        element: &'static str,
    },
    /// The options select both fields and properties.
    ConflictingMemberKinds {
        /// Name of the type being resolved when the conflict was detected.
        ty: &'static str,
    },
    /// More than one registered converter targets the type and none was picked
    /// by name.
    AmbiguousConverter {
        /// Target type.
        ty: &'static str,
        /// Names of the competing converters.
        candidates: Vec<String>,
    },
    /// A member asked for a converter name that is not registered for its type.
    UnknownConverter {
        /// Requested converter name.
        name: String,
        /// Declared type of the member.
        ty: &'static str,
    },
    /// A member type has no converter and cannot be recursively mapped.
    UnsupportedMember {
        /// `Owner.member` path of the offending member.
        member: String,
        /// Declared type of the member.
        ty: &'static str,
    },
    /// A member refers back to a type already on the mapping chain and the
    /// cycle policy forbids skipping it.
    CyclicMember {
        /// `Owner.member` path of the back-reference.
        member: String,
        /// The type that would have been re-entered.
        ty: &'static str,
    },
    /// A mapping list was requested for a type that has no members to map.
    NotAnObject {
        /// Name of the type.
        ty: &'static str,
    },
}

/// Data failures, raised while decoding a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The stream names an enum variant the type does not declare.
    UnknownEnumName {
        /// Enum type.
        ty: &'static str,
        /// Name read from the stream.
        name: String,
    },
    /// A converter was handed a value or a type it does not target.
    TypeMismatch {
        /// The type the converter (or accessor) expected.
        expected: &'static str,
        /// The type it was given.
        found: &'static str,
    },
    /// A length prefix is negative or larger than the remaining input.
    InvalidLength {
        /// The raw length read from the stream.
        length: i64,
        /// Bytes left in the input when the length was read.
        remaining: u64,
    },
    /// A string payload is not valid in the configured encoding.
    InvalidString(String),
    /// A fixed array segment does not fit the value being written.
    SegmentOutOfRange {
        /// Segment start.
        offset: usize,
        /// Segment length.
        len: usize,
        /// Actual length of the array.
        actual: usize,
    },
    /// A count does not fit in the `i32` count prefix.
    LengthOverflow(usize),
}

impl fmt::Display for MapcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Serialization(s) => write!(f, "Serialization Error: {s}"),
            Self::Configuration(e) => write!(f, "Configuration Error: {e}"),
            Self::Data(e) => write!(f, "Data Error: {e}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingElementStrategy { member, element } => write!(
                f,
                "member '{member}' has no converter for '{element}' and no recursion annotation"
            ),
            Self::ConflictingMemberKinds { ty } => {
                write!(f, "fields and properties both selected while resolving '{ty}'")
            }
            Self::AmbiguousConverter { ty, candidates } => write!(
                f,
                "several converters target '{ty}' ({}); select one by name",
                candidates.join(", ")
            ),
            Self::UnknownConverter { name, ty } => {
                write!(f, "no converter named '{name}' targets '{ty}'")
            }
            Self::UnsupportedMember { member, ty } => {
                write!(f, "member '{member}' of type '{ty}' has no converter and cannot be mapped")
            }
            Self::CyclicMember { member, ty } => {
                write!(f, "member '{member}' re-enters '{ty}' which is already being mapped")
            }
            Self::NotAnObject { ty } => write!(f, "'{ty}' has no members to map"),
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEnumName { ty, name } => write!(f, "'{name}' is not a variant of '{ty}'"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected '{expected}', found '{found}'")
            }
            Self::InvalidLength { length, remaining } => write!(
                f,
                "length prefix {length} is invalid with {remaining} bytes remaining"
            ),
            Self::InvalidString(msg) => write!(f, "invalid string payload: {msg}"),
            Self::SegmentOutOfRange {
                offset,
                len,
                actual,
            } => write!(
                f,
                "segment {offset}..{} exceeds array of length {actual}",
                offset + len
            ),
            Self::LengthOverflow(len) => write!(f, "count {len} does not fit the i32 prefix"),
        }
    }
}

impl std::error::Error for MapcodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Configuration(e) => Some(e),
            Self::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for DataError {}

impl From<io::Error> for MapcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<ConfigError> for MapcodeError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err)
    }
}

impl From<DataError> for MapcodeError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<bincode::error::EncodeError> for MapcodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for MapcodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl MapcodeError {
    /// Returns `true` for errors raised while building a mapping list.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` for errors raised while decoding a payload.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub(crate) fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::Data(DataError::TypeMismatch { expected, found })
    }
}
