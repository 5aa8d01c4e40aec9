use std::any::Any;

use super::{expect_value, Converter, MemberContext};
use crate::error::{DataError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, Type};

/// Byte arrays (`Vec<u8>`), registered as `"array"`.
///
/// With an [`ArraySegment`](crate::reflect::ArraySegment) on the member only the
/// bytes `offset..offset + len` are written, with no length prefix; decoding
/// restores them at the same offset, zero-filling what precedes it. Without a
/// segment the whole array is written with an `i32` length prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayConverter;

impl ArrayConverter {
    /// Registered name.
    pub const NAME: &'static str = "array";
}

impl Converter for ArrayConverter {
    fn target(&self) -> Type {
        Type::of::<Vec<u8>>()
    }

    fn name(&self) -> Option<&str> {
        Some(Self::NAME)
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let bytes = expect_value::<Vec<u8>>(value, ty)?;
        match ctx.segment() {
            Some(segment) => {
                let run = segment
                    .offset
                    .checked_add(segment.len)
                    .and_then(|end| bytes.get(segment.offset..end))
                    .ok_or(DataError::SegmentOutOfRange {
                        offset: segment.offset,
                        len: segment.len,
                        actual: bytes.len(),
                    })?;
                writer.write_raw(run)
            }
            None => writer.write_bytes(bytes),
        }
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        match ctx.segment() {
            Some(segment) => {
                let run = reader.read_raw(segment.len)?;
                let mut bytes = vec![0u8; segment.offset];
                bytes.extend_from_slice(&run);
                Ok(Box::new(bytes))
            }
            None => Ok(Box::new(reader.read_bytes()?)),
        }
    }
}
