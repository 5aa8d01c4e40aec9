//! The converter model.
//!
//! A [`Converter`] encodes and decodes values of one target type. Converters are
//! stateless after construction and shared through `Arc` by every mapping that
//! uses them, across threads.
//!
//! The null-flag protocol lives in the provided [`Converter::write`] and
//! [`Converter::read`] methods, so individual converters only implement the
//! payload (`write_core` / `read_core`). Wrappers such as
//! [`NullableConverter`] call the inner converter's core methods directly, so a
//! value never carries two flags.
//!
//! # Writing a custom converter
//!
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//!
//! use mapcode::converter::{Converter, MemberContext};
//! use mapcode::io::{BinaryReader, BinaryWriter};
//! use mapcode::reflect::{BoxedValue, Type};
//! use mapcode::{Mapcode, MapcodeError, Result};
//!
//! /// Stores a `u32` as a decimal string.
//! #[derive(Debug, Default)]
//! struct DecimalU32;
//!
//! impl Converter for DecimalU32 {
//!     fn target(&self) -> Type {
//!         Type::of::<u32>()
//!     }
//!
//!     fn write_core(
//!         &self,
//!         writer: &mut BinaryWriter<'_>,
//!         _ty: &Type,
//!         value: &dyn Any,
//!         _ctx: &MemberContext<'_>,
//!     ) -> Result<()> {
//!         let value = value
//!             .downcast_ref::<u32>()
//!             .ok_or_else(|| MapcodeError::Internal("not a u32".into()))?;
//!         writer.write_string(&value.to_string())
//!     }
//!
//!     fn read_core(
//!         &self,
//!         reader: &mut BinaryReader<'_>,
//!         _ty: &Type,
//!         _ctx: &MemberContext<'_>,
//!     ) -> Result<BoxedValue> {
//!         let text = reader.read_string()?;
//!         let value: u32 = text
//!             .parse()
//!             .map_err(|_| MapcodeError::Internal(format!("bad decimal '{text}'")))?;
//!         Ok(Box::new(value))
//!     }
//! }
//!
//! // Custom converters are scanned first, so this one wins over the built-in.
//! let serializer = Mapcode::builder().converter(Arc::new(DecimalU32)).build();
//! let bytes = serializer.serialize(&42u32).unwrap();
//! assert_eq!(&bytes[5..], &[2, 0, 0, 0, b'4', b'2']);
//! assert_eq!(serializer.deserialize::<u32>(&bytes).unwrap(), 42);
//! ```

mod array;
mod dictionary;
mod enumeration;
mod list;
mod nullable;
mod object;
mod primitive;
mod resolver;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use array::ArrayConverter;
pub use dictionary::{DictionaryConverter, KeyValuePairConverter, PairCodec};
pub use enumeration::EnumConverter;
pub use list::ListConverter;
pub use nullable::{NullableConverter, PointerConverter};
pub use object::ObjectConverter;
pub use primitive::{PrimitiveConverter, StringConverter};
pub use resolver::{ConverterResolver, RecursionPlan, Request};

use crate::error::{MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::mapping::Mapper;
use crate::reflect::{ArraySegment, BoxedValue, Type};
use crate::resolver::MemberDescriptor;
use crate::version::Version;

/// Encode/decode logic for one target type.
pub trait Converter: Send + Sync + fmt::Debug {
    /// The type this converter is registered for.
    fn target(&self) -> Type;

    /// Optional name used to pick between converters targeting the same type.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Whether this converter accepts `ty`. Exact target match by default.
    fn can_convert(&self, ty: &Type) -> bool {
        self.target() == *ty
    }

    /// Whether values carry a leading is-null flag.
    fn handles_null(&self) -> bool {
        false
    }

    /// Object types this converter encodes through their own mapping lists.
    /// Their lists are built along with the list of the member using this
    /// converter.
    fn nested_objects(&self) -> Vec<Type> {
        Vec::new()
    }

    /// Writes the payload of a non-null value.
    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()>;

    /// Reads the payload of a non-null value.
    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue>;

    /// Writes a value, with its is-null flag when [`handles_null`](Self::handles_null).
    fn write(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        if !self.can_convert(ty) {
            return Err(MapcodeError::type_mismatch(self.target().name(), ty.name()));
        }
        if self.handles_null() {
            let is_null = ty.is_null(value);
            writer.write_bool(is_null)?;
            if is_null {
                return Ok(());
            }
        }
        self.write_core(writer, ty, value, ctx)
    }

    /// Reads a value. A set is-null flag short-circuits to the type's default.
    fn read(
        &self,
        reader: &mut BinaryReader<'_>,
        ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        if !self.can_convert(ty) {
            return Err(MapcodeError::type_mismatch(self.target().name(), ty.name()));
        }
        if self.handles_null() && reader.read_bool()? {
            return Ok(ty.default_value());
        }
        self.read_core(reader, ty, ctx)
    }
}

/// Downcasts the value handed to a converter, or reports what it was given.
pub(crate) fn expect_value<'a, T: Any>(value: &'a dyn Any, ty: &Type) -> Result<&'a T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| MapcodeError::type_mismatch(std::any::type_name::<T>(), ty.name()))
}

/// Everything a converter may need besides the value: the mapper for nested
/// objects, the active version, and the member being converted.
#[derive(Clone, Copy)]
pub struct MemberContext<'a> {
    mapper: &'a Mapper,
    version: Option<Version>,
    member: Option<&'a MemberDescriptor>,
}

impl<'a> MemberContext<'a> {
    pub(crate) fn new(mapper: &'a Mapper, version: Option<Version>) -> Self {
        Self {
            mapper,
            version,
            member: None,
        }
    }

    /// The mapper driving this operation.
    pub fn mapper(&self) -> &'a Mapper {
        self.mapper
    }

    /// The version in effect for this stream.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// The member being converted, if any. `None` for roots and collection
    /// elements.
    pub fn member(&self) -> Option<&'a MemberDescriptor> {
        self.member
    }

    /// The array segment annotated on the current member.
    pub fn segment(&self) -> Option<ArraySegment> {
        self.member.and_then(|m| m.attributes().segment)
    }

    /// This context, narrowed to `member`.
    pub fn for_member<'b>(&self, member: &'b MemberDescriptor) -> MemberContext<'b>
    where
        'a: 'b,
    {
        MemberContext {
            mapper: self.mapper,
            version: self.version,
            member: Some(member),
        }
    }

    /// This context without member information, for nested values.
    pub fn detached(&self) -> Self {
        Self {
            member: None,
            ..*self
        }
    }
}

impl fmt::Debug for MemberContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberContext")
            .field("version", &self.version)
            .field("member", &self.member.map(MemberDescriptor::qualified_name))
            .finish_non_exhaustive()
    }
}

/// The set of converters available to a serializer.
///
/// Custom converters are scanned before the built-in ones, each group in
/// registration order.
#[derive(Clone)]
pub struct ConverterRegistry {
    custom: Vec<Arc<dyn Converter>>,
    builtin: Vec<Arc<dyn Converter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self {
            custom: Vec::new(),
            builtin: primitive::builtins(),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("custom", &self.custom)
            .field("builtin", &self.builtin.len())
            .finish()
    }
}

impl ConverterRegistry {
    /// A registry holding only the built-in converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom converter.
    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.custom.push(converter);
    }

    /// All converters in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Converter>> {
        self.custom.iter().chain(self.builtin.iter())
    }

    /// Converters accepting `ty`, in scan order.
    pub fn candidates(&self, ty: &Type) -> Vec<&Arc<dyn Converter>> {
        self.iter().filter(|c| c.can_convert(ty)).collect()
    }
}
