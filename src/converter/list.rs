use std::any::Any;
use std::sync::Arc;

use super::{Converter, MemberContext};
use crate::error::{ConfigError, MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, ListShape, Type};

/// Variable-length sequences: an `i32` count, then each element through the
/// element converter.
///
/// The element converter is either one resolved directly for the element type
/// or an [`ObjectConverter`](super::ObjectConverter) replaying the element
/// type's own mapping.
#[derive(Debug)]
pub struct ListConverter {
    ty: Type,
    shape: ListShape,
    element: Arc<dyn Converter>,
}

impl ListConverter {
    /// Builds the converter for list type `ty`.
    ///
    /// Fails if no element converter could be found, which happens when the
    /// element type has no registered converter and the member declares no
    /// recursion strategy for its elements.
    pub fn new(
        ty: Type,
        shape: ListShape,
        element: Option<Arc<dyn Converter>>,
        member: &str,
    ) -> Result<Self> {
        let element = element.ok_or_else(|| ConfigError::MissingElementStrategy {
            member: member.to_owned(),
            element: shape.element.name(),
        })?;
        Ok(Self { ty, shape, element })
    }

    /// The converter applied to each element.
    pub fn element(&self) -> &Arc<dyn Converter> {
        &self.element
    }
}

impl Converter for ListConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn nested_objects(&self) -> Vec<Type> {
        self.element.nested_objects()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let len = (self.shape.len)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        writer.write_len(len)?;
        let element_ctx = ctx.detached();
        for index in 0..len {
            let item = (self.shape.item)(value, index).ok_or_else(|| {
                MapcodeError::Internal(format!("element {index} of {len} vanished during write"))
            })?;
            self.element
                .write(writer, &self.shape.element, item, &element_ctx)?;
        }
        Ok(())
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let count = reader.read_len(1)?;
        let element_ctx = ctx.detached();
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.element.read(reader, &self.shape.element, &element_ctx)?);
        }
        (self.shape.build)(items)
    }
}
