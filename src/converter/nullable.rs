use std::any::Any;
use std::sync::Arc;

use super::{Converter, MemberContext};
use crate::error::{MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, NullableShape, PointerShape, Type, TypeShape};

/// `Option<T>`: one is-null flag, then the inner payload.
///
/// The inner converter's own flag is skipped, so `Option<String>` costs a
/// single flag byte like `String` does. An inner `Option` keeps its flag:
/// `Some(None)` and `None` must stay distinguishable.
#[derive(Debug)]
pub struct NullableConverter {
    ty: Type,
    shape: NullableShape,
    inner: Arc<dyn Converter>,
    inner_nullable: bool,
}

impl NullableConverter {
    /// Wraps the converter for `T` into one for `Option<T>`.
    pub fn new(ty: Type, shape: NullableShape, inner: Arc<dyn Converter>) -> Self {
        let inner_nullable = can_hold_none(shape.inner);
        Self {
            ty,
            shape,
            inner,
            inner_nullable,
        }
    }
}

/// Whether `ty` is an `Option`, possibly behind `Box` layers.
fn can_hold_none(mut ty: Type) -> bool {
    loop {
        match ty.shape() {
            TypeShape::Nullable(_) => return true,
            TypeShape::Pointer(shape) => ty = shape.inner,
            _ => return false,
        }
    }
}

impl Converter for NullableConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn handles_null(&self) -> bool {
        true
    }

    fn nested_objects(&self) -> Vec<Type> {
        self.inner.nested_objects()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let inner = (self.shape.unwrap)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        if self.inner_nullable {
            self.inner.write(writer, &self.shape.inner, inner, ctx)
        } else {
            self.inner.write_core(writer, &self.shape.inner, inner, ctx)
        }
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let inner = if self.inner_nullable {
            self.inner.read(reader, &self.shape.inner, ctx)?
        } else {
            self.inner.read_core(reader, &self.shape.inner, ctx)?
        };
        (self.shape.wrap)(inner)
    }
}

/// `Box<T>`: transparent; encodes exactly like `T`.
#[derive(Debug)]
pub struct PointerConverter {
    ty: Type,
    shape: PointerShape,
    inner: Arc<dyn Converter>,
}

impl PointerConverter {
    /// Wraps the converter for `T` into one for `Box<T>`.
    pub fn new(ty: Type, shape: PointerShape, inner: Arc<dyn Converter>) -> Self {
        Self { ty, shape, inner }
    }
}

impl Converter for PointerConverter {
    fn target(&self) -> Type {
        self.ty
    }

    fn handles_null(&self) -> bool {
        self.inner.handles_null()
    }

    fn nested_objects(&self) -> Vec<Type> {
        self.inner.nested_objects()
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        let inner = (self.shape.deref)(value)
            .ok_or_else(|| MapcodeError::type_mismatch(self.ty.name(), ty.name()))?;
        self.inner.write_core(writer, &self.shape.inner, inner, ctx)
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        ctx: &MemberContext<'_>,
    ) -> Result<BoxedValue> {
        let inner = self.inner.read_core(reader, &self.shape.inner, ctx)?;
        (self.shape.wrap)(inner)
    }
}
