use std::any::Any;

use super::{Converter, MemberContext};
use crate::error::Result;
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, CompiledHooks, RecursionKind, Type};

/// A nested object with no converter of its own, encoded through its own
/// mapping list.
///
/// The nested mapping list is checked when the outer list is built (see
/// [`Converter::nested_objects`]) but only fetched from the mapper's cache when
/// a value is converted, so recursive element types never recurse at build time.
#[derive(Debug)]
pub struct ObjectConverter {
    ty: Type,
    kind: RecursionKind,
    hooks: CompiledHooks,
}

impl ObjectConverter {
    /// Builds the converter for object type `ty`.
    pub fn new(ty: Type, kind: RecursionKind, hooks: CompiledHooks) -> Self {
        Self { ty, kind, hooks }
    }

    /// Which engine replays the nested mapping.
    pub fn kind(&self) -> RecursionKind {
        self.kind
    }
}

impl Converter for ObjectConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn nested_objects(&self) -> Vec<Type> {
        vec![self.ty]
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        _ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let ctx = ctx.detached();
        match self.kind {
            RecursionKind::Dynamic => {
                ctx.mapper()
                    .write_dynamic(self.ty, value, writer, ctx.version())
            }
            RecursionKind::Compiled => (self.hooks.write)(&ctx, value, writer),
        }
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let ctx = ctx.detached();
        match self.kind {
            RecursionKind::Dynamic => {
                let mut value = self.ty.default_value();
                let target: &mut dyn Any = &mut *value;
                ctx.mapper()
                    .read_dynamic_into(self.ty, target, reader, ctx.version())?;
                Ok(value)
            }
            RecursionKind::Compiled => (self.hooks.read)(&ctx, reader),
        }
    }
}
