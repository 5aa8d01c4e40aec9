//! The dynamic engine: replays a mapping list over type-erased values.

use std::any::Any;
use std::sync::Arc;

use super::Mapper;
use crate::converter::MemberContext;
use crate::error::{MapcodeError, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::reflect::Type;
use crate::resolver::MemberDescriptor;
use crate::version::Version;

/// Follows cascaded fields from `root` down to the owner of a mapped member.
pub(crate) fn navigate<'a>(
    root: &'a dyn Any,
    path: &[Arc<MemberDescriptor>],
) -> Result<&'a dyn Any> {
    path.iter().try_fold(root, |owner, hop| hop.borrow(owner))
}

/// Mutable counterpart of [`navigate`].
pub(crate) fn navigate_mut<'a>(
    root: &'a mut dyn Any,
    path: &[Arc<MemberDescriptor>],
) -> Result<&'a mut dyn Any> {
    path.iter().try_fold(root, |owner, hop| hop.get_mut(owner))
}

impl Mapper {
    /// Encodes `value`, an instance of `ty`, member by member.
    pub fn write_dynamic(
        &self,
        ty: Type,
        value: &dyn Any,
        writer: &mut BinaryWriter<'_>,
        version: Option<Version>,
    ) -> Result<()> {
        if !ty.matches(value) {
            return Err(MapcodeError::type_mismatch(ty.name(), "a value of another type"));
        }
        let list = self.mapping_list(ty, version)?;
        let ctx = MemberContext::new(self, version);
        for mapping in list.iter() {
            let member = mapping.member();
            let owner = navigate(value, mapping.path())?;
            let member_value = member.get(owner)?;
            mapping.converter().write(
                writer,
                &member.ty(),
                member_value.as_any(),
                &ctx.for_member(member),
            )?;
        }
        Ok(())
    }

    /// Decodes into `target`, an instance of `ty`, member by member.
    ///
    /// Members of `target` with no mapping keep their current value; read-only
    /// members are read and discarded.
    pub fn read_dynamic_into(
        &self,
        ty: Type,
        target: &mut dyn Any,
        reader: &mut BinaryReader<'_>,
        version: Option<Version>,
    ) -> Result<()> {
        if !ty.matches(target) {
            return Err(MapcodeError::type_mismatch(ty.name(), "a value of another type"));
        }
        let list = self.mapping_list(ty, version)?;
        let ctx = MemberContext::new(self, version);
        for mapping in list.iter() {
            let member = mapping.member();
            let value = mapping
                .converter()
                .read(reader, &member.ty(), &ctx.for_member(member))?;
            let owner = navigate_mut(&mut *target, mapping.path())?;
            if !member.set(owner, value)? {
                log::trace!("discarded read-only '{}'", member.qualified_name());
            }
        }
        Ok(())
    }
}
