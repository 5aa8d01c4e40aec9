//! The compiled engine: a mapping list turned into monomorphized closures.
//!
//! For each mapping of `T` one write closure and one read closure are built
//! once, capturing the converter and `T`'s statically typed accessor. Encoding
//! then runs the closures in order with no downcast of the root and no
//! accessor lookup. Cascaded members start from the typed accessor of their
//! outermost field and continue through the type-erased path.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use super::{navigate, navigate_mut, MappingList, MemberMapping};
use crate::converter::MemberContext;
use crate::error::{MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::{BoxedValue, Reflect, TypedMember};
use crate::resolver::MemberDescriptor;

type WriteFn<T> =
    Box<dyn Fn(&T, &mut BinaryWriter<'_>, &MemberContext<'_>) -> Result<()> + Send + Sync>;
type ReadFn<T> =
    Box<dyn Fn(&mut T, &mut BinaryReader<'_>, &MemberContext<'_>) -> Result<()> + Send + Sync>;

struct CompiledAccessor<T> {
    write: WriteFn<T>,
    read: ReadFn<T>,
}

/// The compiled form of `T`'s mapping list.
pub struct CompiledMapping<T> {
    list: Arc<MappingList>,
    accessors: Vec<CompiledAccessor<T>>,
}

impl<T> fmt::Debug for CompiledMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMapping")
            .field("ty", &type_name::<T>())
            .field("mappings", &self.accessors.len())
            .finish()
    }
}

impl<T: Reflect> CompiledMapping<T> {
    /// Compiles `list`, which must be `T`'s mapping list.
    pub fn build(list: Arc<MappingList>) -> Result<Self> {
        if !list.ty().is::<T>() {
            return Err(MapcodeError::type_mismatch(type_name::<T>(), list.ty().name()));
        }
        let typed = T::typed_members();
        let accessors = list
            .iter()
            .map(|mapping| compile(mapping, &typed))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { list, accessors })
    }

    /// The list this mapping was compiled from.
    pub fn list(&self) -> &Arc<MappingList> {
        &self.list
    }

    /// Encodes `value`.
    pub fn write(
        &self,
        value: &T,
        writer: &mut BinaryWriter<'_>,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        for accessor in &self.accessors {
            (accessor.write)(value, writer, ctx)?;
        }
        Ok(())
    }

    /// Decodes into `target`. Unmapped members keep their current value.
    pub fn read_into(
        &self,
        target: &mut T,
        reader: &mut BinaryReader<'_>,
        ctx: &MemberContext<'_>,
    ) -> Result<()> {
        for accessor in &self.accessors {
            (accessor.read)(target, reader, ctx)?;
        }
        Ok(())
    }
}

fn compile<T: Reflect>(
    mapping: &MemberMapping,
    typed: &[TypedMember<T>],
) -> Result<CompiledAccessor<T>> {
    let member = Arc::clone(mapping.member());
    let converter = Arc::clone(mapping.converter());
    let head = mapping.path().first().unwrap_or(mapping.member());
    let accessor = typed
        .get(head.index())
        .filter(|a| a.name == head.name())
        .copied()
        .ok_or_else(|| {
            MapcodeError::Internal(format!(
                "no typed accessor for '{}' at index {}",
                head.qualified_name(),
                head.index()
            ))
        })?;
    let missing = |what: &str| {
        MapcodeError::Internal(format!(
            "typed accessor of '{}' cannot {what}",
            head.qualified_name()
        ))
    };

    if mapping.path().is_empty() {
        let get = accessor.get.ok_or_else(|| missing("read"))?;
        let write_member = Arc::clone(&member);
        let write_converter = Arc::clone(&converter);
        let write: WriteFn<T> = Box::new(
            move |owner: &T, writer: &mut BinaryWriter<'_>, ctx: &MemberContext<'_>| {
                let value = get(owner);
                write_converter.write(
                    writer,
                    &write_member.ty(),
                    value.as_any(),
                    &ctx.for_member(&write_member),
                )
            },
        );
        let set = accessor.set;
        let read: ReadFn<T> = Box::new(
            move |owner: &mut T, reader: &mut BinaryReader<'_>, ctx: &MemberContext<'_>| {
                let value = converter.read(reader, &member.ty(), &ctx.for_member(&member))?;
                store(set, owner, value, &member)
            },
        );
        return Ok(CompiledAccessor { write, read });
    }

    let get = accessor.get.ok_or_else(|| missing("read"))?;
    let get_mut = accessor.get_mut.ok_or_else(|| missing("borrow mutably"))?;
    let rest: Arc<[Arc<MemberDescriptor>]> = mapping.path()[1..].into();
    let write_rest = Arc::clone(&rest);
    let write_member = Arc::clone(&member);
    let write_converter = Arc::clone(&converter);
    let write: WriteFn<T> = Box::new(
        move |owner: &T, writer: &mut BinaryWriter<'_>, ctx: &MemberContext<'_>| {
            let head = get(owner);
            let nested_owner = navigate(head.as_any(), &write_rest)?;
            let value = write_member.get(nested_owner)?;
            write_converter.write(
                writer,
                &write_member.ty(),
                value.as_any(),
                &ctx.for_member(&write_member),
            )
        },
    );
    let read: ReadFn<T> = Box::new(
        move |owner: &mut T, reader: &mut BinaryReader<'_>, ctx: &MemberContext<'_>| {
            let value = converter.read(reader, &member.ty(), &ctx.for_member(&member))?;
            let nested_owner = navigate_mut(get_mut(owner), &rest)?;
            if !member.set(nested_owner, value)? {
                log::trace!("discarded read-only '{}'", member.qualified_name());
            }
            Ok(())
        },
    );
    Ok(CompiledAccessor { write, read })
}

fn store<T>(
    set: Option<fn(&mut T, BoxedValue) -> Result<()>>,
    owner: &mut T,
    value: BoxedValue,
    member: &MemberDescriptor,
) -> Result<()> {
    match set {
        Some(set) => set(owner, value),
        None => {
            log::trace!("discarded read-only '{}'", member.qualified_name());
            Ok(())
        }
    }
}

/// Compiled-engine entry point for encoding a type-erased `T`.
pub(crate) fn write_hook<T: Reflect>(
    ctx: &MemberContext<'_>,
    value: &dyn Any,
    writer: &mut BinaryWriter<'_>,
) -> Result<()> {
    let value = value
        .downcast_ref::<T>()
        .ok_or_else(|| MapcodeError::type_mismatch(type_name::<T>(), "a value of another type"))?;
    let mapping = ctx.mapper().compiled::<T>(ctx.version())?;
    mapping.write(value, writer, &ctx.detached())
}

/// Compiled-engine entry point for decoding a fresh `T`.
pub(crate) fn read_hook<T: Reflect>(
    ctx: &MemberContext<'_>,
    reader: &mut BinaryReader<'_>,
) -> Result<BoxedValue> {
    let mapping = ctx.mapper().compiled::<T>(ctx.version())?;
    let mut value = T::default();
    mapping.read_into(&mut value, reader, &ctx.detached())?;
    Ok(Box::new(value))
}
