//! Defines the physical binary layout of a Mapcode stream.
//!
//! # Layout
//! ```text
//! [Version Marker (4)] [Version Present (1)] [Version Value (8)?] [Comparison (str)?]
//! { for each mapping in list order: [Is-Null (1) if the converter handles null] [Payload] }
//! ```
//!
//! Scalars are little-endian and fixed width. Strings, byte arrays, lists and
//! dictionaries are prefixed by an `i32` count. There are no timestamps, random
//! seeds or padding, so equal inputs always produce identical bytes.

use bincode::config::{Configuration, Fixint, LittleEndian, NoLimit};

/// Magic bytes opening the version header: "MCVH".
pub const VERSION_MARKER: [u8; 4] = *b"MCVH";

/// Size in bytes of a presence / is-null flag.
pub const FLAG_SIZE: usize = 1;

/// Size in bytes of a count or length prefix.
pub const COUNT_PREFIX_SIZE: usize = 4;

/// Size of the header written when no version is configured.
/// Marker(4) + Present(1) = 5
pub const UNVERSIONED_HEADER_SIZE: usize = VERSION_MARKER.len() + FLAG_SIZE;

/// Codec configuration for every fixed-width scalar on the wire.
pub(crate) const WIRE_CONFIG: Configuration<LittleEndian, Fixint, NoLimit> =
    bincode::config::legacy();
