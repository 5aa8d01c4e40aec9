use std::any::Any;

use super::{Converter, MemberContext};
use crate::error::{DataError, MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, EnumShape, Type};

/// Fieldless enums, encoded by variant name so that reordering or renumbering
/// variants keeps old streams readable.
#[derive(Debug)]
pub struct EnumConverter {
    ty: Type,
    shape: EnumShape,
}

impl EnumConverter {
    /// Builds the converter for enum type `ty`.
    pub fn new(ty: Type, shape: EnumShape) -> Self {
        Self { ty, shape }
    }
}

impl Converter for EnumConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        _ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let name = (self.shape.name_of)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        writer.write_string(name)
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        _ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let name = reader.read_string()?;
        match (self.shape.from_name)(&name) {
            Some(value) => Ok(value),
            None => Err(DataError::UnknownEnumName {
                ty: self.ty.name(),
                name,
            }
            .into()),
        }
    }
}
