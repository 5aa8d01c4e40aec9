//! # Mapcode
//!
//! A binary object serialization engine for Rust that maps object graphs member by
//! member onto a compact, deterministic byte stream.
//!
//! ## Overview
//!
//! Mapcode does not hand a whole value to a generic serializer. Instead it
//! discovers the members of each type, pairs every member with a converter, and
//! stores the result as a *mapping list*: the ordered recipe for encoding that type.
//! Mapping lists are built once per type and version and then replayed for every
//! value.
//!
//! ### Key Features
//!
//! *   **Two Engines, One Format:** A dynamic engine replays mapping lists over
//!     `&dyn Any`; a compiled engine turns them into monomorphized closures. Both
//!     produce identical bytes.
//! *   **Cascading:** Nested object fields are flattened into their owner's mapping
//!     list, so a nested struct costs no framing.
//! *   **Cycle Safety:** A type that refers back to itself is detected while the
//!     mapping list is built, never at encode time.
//! *   **Versioning:** Members can be gated by schema version; the stream carries the
//!     version it was written with.
//! *   **Thread Safety:** A [`Serializer`] is `Send + Sync`. Its caches are concurrent
//!     maps and batches are encoded in parallel with Rayon.
//!
//! ## Architecture
//!
//! ### Wire Format
//!
//! ```text
//! [Version Header] [Member 1] [Member 2] ... [Member N]
//! ```
//!
//! The header is the `MCVH` marker, a presence flag and, if present, the version
//! number and comparison name. Members follow in mapping-list order. Scalars are
//! little-endian with fixed widths; strings, byte arrays, lists and dictionaries
//! carry an `i32` count prefix. Converters for reference-like values (strings,
//! arrays, collections, objects, `Option`) write a one-byte null flag first.
//!
//! ### Pipeline
//!
//! 1. [`resolver::MemberResolver`] lists the participating members of a type.
//! 2. [`converter::ConverterResolver`] picks a converter for each member.
//! 3. [`mapping::Mapper`] builds and caches the mapping list.
//! 4. The dynamic engine or a [`mapping::CompiledMapping`] replays it.
//!
//! ## Usage Patterns
//!
//! ### Basic Serialization
//!
//! ```rust
//! use mapcode::{Mapcode, MapcodeObject};
//!
//! #[derive(Debug, Default, PartialEq, MapcodeObject)]
//! struct Player {
//!     name: String,
//!     tags: Vec<String>,
//!     count: i32,
//! }
//!
//! let player = Player {
//!     name: "abc".into(),
//!     tags: vec!["x".into(), "y".into()],
//!     count: 2,
//! };
//! let bytes = Mapcode::serialize(&player).unwrap();
//! let back: Player = Mapcode::deserialize(&bytes).unwrap();
//! assert_eq!(back, player);
//! ```
//!
//! ### Versioned Members
//!
//! ```rust
//! use mapcode::{Mapcode, MapcodeObject};
//!
//! #[derive(Debug, Default, MapcodeObject)]
//! struct Settings {
//!     volume: u8,
//!     #[mapcode(since = 2.0)]
//!     theme: String,
//! }
//!
//! let v1 = Mapcode::builder().version(1.0).build();
//! let v2 = Mapcode::builder().version(2.0).build();
//! let settings = Settings { volume: 3, theme: "dark".into() };
//! assert!(v1.serialize(&settings).unwrap().len() < v2.serialize(&settings).unwrap().len());
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** the only `unsafe` block memory-maps a file in
//!   [`Serializer::load`].
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`MapcodeError`], split
//!   into configuration errors (a type cannot be mapped) and data errors (a stream
//!   cannot be decoded).

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets the derive macros refer to `::mapcode` from inside this crate's own tests and docs.
extern crate self as mapcode;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod converter;
pub mod error;
pub mod format;
pub mod mapping;
pub mod options;
pub mod reflect;
pub mod resolver;
pub mod version;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod io;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{Mapcode, Serializer, SerializerBuilder};
pub use error::{ConfigError, DataError, MapcodeError, Result};
pub use options::{CyclePolicy, SerializerOptions, StringEncoding};
pub use reflect::{Reflect, Type};
pub use version::{Comparison, Version};

// Re-export the derive macros so they are accessible as `mapcode::MapcodeObject`
pub use mapcode_derive::{MapcodeEnum, MapcodeObject};
