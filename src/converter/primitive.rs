//! Fixed-width scalars and strings.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{expect_value, ArrayConverter, Converter, MemberContext};
use crate::error::Result;
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, Reflect, Type};

/// Writes a scalar through the fixed-width little-endian wire codec.
///
/// Never null; an `Option<T>` member gets its flag from the nullable wrapper.
pub struct PrimitiveConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> PrimitiveConverter<T> {
    /// Creates the converter.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PrimitiveConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PrimitiveConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveConverter<{}>", type_name::<T>())
    }
}

impl<T> Converter for PrimitiveConverter<T>
where
    T: Reflect + Serialize + DeserializeOwned,
{
    fn target(&self) -> Type {
        Type::of::<T>()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        _ctx: &MemberContext<'_>,
    ) -> Result<()> {
        writer.write_value(expect_value::<T>(value, ty)?)
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        _ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        Ok(Box::new(reader.read_value::<T>()?))
    }
}

/// Length-prefixed string in the configured encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn target(&self) -> Type {
        Type::of::<String>()
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        _ctx: &MemberContext<'_>,
    ) -> Result<()> {
        writer.write_string(expect_value::<String>(value, ty)?)
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        _ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        Ok(Box::new(reader.read_string()?))
    }
}

macro_rules! primitive_converters {
    ($($t:ty),* $(,)?) => {
        vec![
            $(Arc::new(PrimitiveConverter::<$t>::new()) as Arc<dyn Converter>,)*
        ]
    };
}

/// The converters every registry starts with.
pub(super) fn builtins() -> Vec<Arc<dyn Converter>> {
    let mut converters = primitive_converters!(
        bool, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, char,
    );
    converters.push(Arc::new(StringConverter));
    converters.push(Arc::new(ArrayConverter));
    converters
}
