//! Member discovery.
//!
//! [`MemberResolver`] turns a type's declared members into the ordered list of
//! [`MemberDescriptor`]s that take part in mapping: only the configured member
//! kind, only readable members, never ignored ones. Results are cached per type
//! for the lifetime of the owning serializer.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ConfigError, MapcodeError, Result};
use crate::options::SerializerOptions;
use crate::reflect::{
    BoxedValue, MemberAccess, MemberAttributes, MemberInfo, MemberKind, MemberRef, Type,
    TypeShape,
};

/// One participating member of a type. Immutable once built.
#[derive(Clone)]
pub struct MemberDescriptor {
    declaring_type: Type,
    name: &'static str,
    kind: MemberKind,
    ty: Type,
    order: i64,
    index: usize,
    access: MemberAccess,
    attributes: MemberAttributes,
}

impl MemberDescriptor {
    fn new(declaring_type: Type, info: &MemberInfo, index: usize, order: i64) -> Self {
        Self {
            declaring_type,
            name: info.name(),
            kind: info.kind(),
            ty: info.ty(),
            order,
            index,
            access: *info.access(),
            attributes: info.attributes().clone(),
        }
    }

    /// The type that declares this member.
    pub fn declaring_type(&self) -> Type {
        self.declaring_type
    }

    /// Declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field or property.
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Declared type.
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Ordering key.
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Position among the declaring type's members, as declared.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Annotations.
    pub fn attributes(&self) -> &MemberAttributes {
        &self.attributes
    }

    /// Whether a decoded value can be stored back.
    pub fn can_write(&self) -> bool {
        self.access.set.is_some()
    }

    /// Whether the engine can descend into this member's own members.
    pub fn can_cascade(&self) -> bool {
        self.kind == MemberKind::Field && self.access.get_mut.is_some()
    }

    /// `Owner.member`, for logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type.short_name(), self.name)
    }

    /// Reads the member from `owner`.
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Result<MemberRef<'a>> {
        let get = self.access.get.ok_or_else(|| self.no_access("read"))?;
        get(owner).ok_or_else(|| self.wrong_owner())
    }

    /// Borrows a stored field of `owner`. Computed properties cannot be borrowed.
    pub fn borrow<'a>(&self, owner: &'a dyn Any) -> Result<&'a dyn Any> {
        self.get(owner)?
            .into_borrowed()
            .ok_or_else(|| self.no_access("borrow"))
    }

    /// Borrows a stored field of `owner` mutably.
    pub fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let get_mut = self.access.get_mut.ok_or_else(|| self.no_access("borrow mutably"))?;
        if !self.declaring_type.matches(owner) {
            return Err(self.wrong_owner());
        }
        get_mut(owner).ok_or_else(|| self.no_access("borrow mutably"))
    }

    /// Stores a decoded value into `owner`. Returns `false` for read-only members.
    pub fn set(&self, owner: &mut dyn Any, value: BoxedValue) -> Result<bool> {
        match self.access.set {
            Some(set) => set(owner, value).map(|()| true),
            None => Ok(false),
        }
    }

    fn no_access(&self, what: &str) -> MapcodeError {
        MapcodeError::Internal(format!("cannot {what} member '{}'", self.qualified_name()))
    }

    fn wrong_owner(&self) -> MapcodeError {
        MapcodeError::type_mismatch(self.declaring_type.name(), "a different owner type")
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("member", &self.qualified_name())
            .field("kind", &self.kind)
            .field("ty", &self.ty)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Discovers and caches the participating members of object types.
#[derive(Default)]
pub struct MemberResolver {
    cache: DashMap<TypeId, Arc<[Arc<MemberDescriptor>]>>,
}

impl fmt::Debug for MemberResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberResolver")
            .field("cached_types", &self.cache.len())
            .finish()
    }
}

impl MemberResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered participating members of `ty`.
    ///
    /// Fails if `ty` is not an object or if `options` selects both member kinds.
    pub fn resolve_members(
        &self,
        ty: Type,
        options: &SerializerOptions,
    ) -> Result<Arc<[Arc<MemberDescriptor>]>> {
        if let Some(found) = self.cache.get(&ty.id()) {
            return Ok(Arc::clone(found.value()));
        }
        let built = discover(ty, options)?;
        log::debug!("resolved {} members of '{}'", built.len(), ty.name());
        let entry = self.cache.entry(ty.id()).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every cached member list.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

fn discover(ty: Type, options: &SerializerOptions) -> Result<Arc<[Arc<MemberDescriptor>]>> {
    let kind = options.member_kind(&ty)?;
    let TypeShape::Object(shape) = ty.shape() else {
        return Err(ConfigError::NotAnObject { ty: ty.name() }.into());
    };
    let of_kind: Vec<(usize, &MemberInfo)> = shape
        .members()
        .iter()
        .enumerate()
        .filter(|(_, info)| info.kind() == kind)
        .collect();
    let total = of_kind.len();

    let mut members: Vec<Arc<MemberDescriptor>> = of_kind
        .into_iter()
        .enumerate()
        .filter(|(_, (_, info))| info.can_read() && !info.attributes().ignore)
        .map(|(discovery, (index, info))| {
            let order = options.order_of(info, discovery, total);
            Arc::new(MemberDescriptor::new(ty, info, index, order))
        })
        .collect();
    members.sort_by_key(|m| m.order());
    Ok(members.into())
}
