//! Mapping lists and the two engines that replay them.
//!
//! A [`MappingList`] is the ordered sequence of (member, converter) pairs for one
//! object type under one version. It is built once per `(type, version)` by
//! [`Mapper::mapping_list`] and shared afterwards.
//!
//! Building walks the type's members:
//!
//! 1. Members gated out by the active version are dropped.
//! 2. A member with a converter becomes a mapping.
//! 3. A nested object field without a converter is **cascaded**: its own
//!    members are appended with a deeper cascade id and a path leading to them.
//!    A `nested` annotation opts a field out of cascading.
//! 4. Anything else wrapping an object (`Option<T>`, `Box<T>`) gets an
//!    [`ObjectConverter`](crate::converter::ObjectConverter). Without a
//!    `nested` annotation it replays the nested list with the dynamic engine,
//!    whichever engine drives the outer value; both engines write the same
//!    bytes.
//!
//! Every object type a member's converter reaches (list elements, map keys and
//! values, nested objects) has its own list built on the way, so configuration
//! errors anywhere below a type surface when that type's list is built, not
//! when the first non-empty value is encoded.
//!
//! A type already on the chain being built is never entered again; the member
//! that would re-enter it is skipped (or rejected, per
//! [`CyclePolicy`](crate::CyclePolicy)).
//!
//! The list is sorted by cascade id, then order key. Replaying it is the job of
//! the dynamic engine (over `&dyn Any`, see [`Mapper::write_dynamic`]) and of the
//! compiled engine ([`CompiledMapping`]).

pub mod compiled;
mod dynamic;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

pub use compiled::CompiledMapping;
pub(crate) use dynamic::{navigate, navigate_mut};

use crate::converter::{Converter, ConverterResolver, Request};
use crate::error::{ConfigError, Result};
use crate::options::{CyclePolicy, SerializerOptions};
use crate::reflect::{RecursionKind, Type, TypeShape};
use crate::resolver::{MemberDescriptor, MemberResolver};
use crate::version::{self, Version, VersionKey};

/// One member bound to its converter.
#[derive(Clone)]
pub struct MemberMapping {
    member: Arc<MemberDescriptor>,
    path: Arc<[Arc<MemberDescriptor>]>,
    cascade_id: u32,
    converter: Arc<dyn Converter>,
}

impl MemberMapping {
    /// The mapped member.
    pub fn member(&self) -> &Arc<MemberDescriptor> {
        &self.member
    }

    /// Cascaded fields leading from the root object to the member's owner.
    /// Empty for the root's own members.
    pub fn path(&self) -> &[Arc<MemberDescriptor>] {
        &self.path
    }

    /// Nesting depth of the member's owner; 0 for the root's own members.
    pub fn cascade_id(&self) -> u32 {
        self.cascade_id
    }

    /// The converter used for the member's value.
    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    /// Dotted path from the root, e.g. `address.city`.
    pub fn path_name(&self) -> String {
        self.path
            .iter()
            .map(|hop| hop.name())
            .chain(std::iter::once(self.member.name()))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Debug for MemberMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMapping")
            .field("path", &self.path_name())
            .field("cascade_id", &self.cascade_id)
            .field("order", &self.member.order())
            .field("converter", &self.converter)
            .finish()
    }
}

/// The ordered mappings of one type under one version.
#[derive(Debug)]
pub struct MappingList {
    ty: Type,
    version: Option<Version>,
    mappings: Vec<MemberMapping>,
}

impl MappingList {
    /// The mapped type.
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The version the list was built for.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Mappings in wire order.
    pub fn iter(&self) -> std::slice::Iter<'_, MemberMapping> {
        self.mappings.iter()
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Dotted member paths in wire order.
    pub fn paths(&self) -> Vec<String> {
        self.mappings.iter().map(MemberMapping::path_name).collect()
    }
}

impl<'a> IntoIterator for &'a MappingList {
    type Item = &'a MemberMapping;
    type IntoIter = std::slice::Iter<'a, MemberMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MappingKey {
    ty: TypeId,
    version: Option<VersionKey>,
}

impl MappingKey {
    fn new(ty: TypeId, version: Option<Version>) -> Self {
        Self {
            ty,
            version: version.map(|v| v.key()),
        }
    }
}

/// How a root value is encoded.
#[derive(Debug, Clone)]
pub(crate) enum RootPlan {
    Object,
    Converter(Arc<dyn Converter>),
}

/// Owns the options, the resolvers and every mapping cache of one serializer.
pub struct Mapper {
    options: Arc<SerializerOptions>,
    members: MemberResolver,
    converters: ConverterResolver,
    lists: DashMap<MappingKey, Arc<MappingList>>,
    compiled: DashMap<MappingKey, Arc<dyn Any + Send + Sync>>,
    roots: DashMap<(TypeId, RecursionKind), RootPlan>,
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("options", &self.options)
            .field("lists", &self.lists.len())
            .field("compiled", &self.compiled.len())
            .finish_non_exhaustive()
    }
}

impl Mapper {
    /// A mapper with empty caches.
    pub fn new(options: SerializerOptions) -> Self {
        let converters = ConverterResolver::new(options.registry().clone());
        Self {
            options: Arc::new(options),
            members: MemberResolver::new(),
            converters,
            lists: DashMap::new(),
            compiled: DashMap::new(),
            roots: DashMap::new(),
        }
    }

    /// The options every cache was built with.
    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// The participating members of `ty`.
    pub fn members(&self, ty: Type) -> Result<Arc<[Arc<MemberDescriptor>]>> {
        self.members.resolve_members(ty, &self.options)
    }

    /// The mapping list of `ty` under `version`, built on first use.
    ///
    /// Concurrent first uses may both build; exactly one result is kept and
    /// returned to everyone.
    pub fn mapping_list(&self, ty: Type, version: Option<Version>) -> Result<Arc<MappingList>> {
        let key = MappingKey::new(ty.id(), version);
        if let Some(found) = self.lists.get(&key) {
            return Ok(Arc::clone(found.value()));
        }
        let built = Arc::new(self.build_list(ty, version, &mut vec![ty.id()])?);
        let entry = self.lists.entry(key).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }

    /// Drops every cached member list, mapping list and compiled mapping.
    pub fn clear(&self) {
        self.members.clear();
        self.lists.clear();
        self.compiled.clear();
        self.roots.clear();
    }

    /// `visiting` holds the types whose lists are being built further up; their
    /// nested checks are left to that outer build.
    fn build_list(
        &self,
        ty: Type,
        version: Option<Version>,
        visiting: &mut Vec<TypeId>,
    ) -> Result<MappingList> {
        if !matches!(ty.shape(), TypeShape::Object(_)) {
            return Err(ConfigError::NotAnObject { ty: ty.name() }.into());
        }
        let mut mappings = Vec::new();
        let mut chain = vec![ty.id()];
        self.collect(ty, version, &mut chain, visiting, &[], 0, &mut mappings)?;
        mappings.sort_by_key(|m| (m.cascade_id, m.member.order()));
        log::debug!(
            "built mapping list for '{}' ({} mappings, version {:?})",
            ty.name(),
            mappings.len(),
            version.map(|v| v.value())
        );
        Ok(MappingList {
            ty,
            version,
            mappings,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn collect(
        &self,
        ty: Type,
        version: Option<Version>,
        chain: &mut Vec<TypeId>,
        visiting: &mut Vec<TypeId>,
        path: &[Arc<MemberDescriptor>],
        depth: u32,
        out: &mut Vec<MemberMapping>,
    ) -> Result<()> {
        let shared_path: Arc<[Arc<MemberDescriptor>]> = path.into();
        for member in self.members(ty)?.iter() {
            if !version::is_member_present(&member.attributes().versions, version) {
                log::trace!("'{}' is gated out", member.qualified_name());
                continue;
            }
            let bind = |converter| MemberMapping {
                member: Arc::clone(member),
                path: Arc::clone(&shared_path),
                cascade_id: depth,
                converter,
            };
            if let Some(converter) = self.converters.resolve_member(member, None)? {
                self.check_nested(converter.as_ref(), version, visiting)?;
                out.push(bind(converter));
                continue;
            }

            let Some(target) = innermost_object(member.ty()) else {
                return Err(ConfigError::UnsupportedMember {
                    member: member.qualified_name(),
                    ty: member.ty().name(),
                }
                .into());
            };
            if chain.contains(&target.id()) {
                match self.options.cycle_policy() {
                    CyclePolicy::Skip => {
                        log::warn!(
                            "skipping '{}': it refers back to '{}'",
                            member.qualified_name(),
                            target.name()
                        );
                        continue;
                    }
                    CyclePolicy::Error => {
                        return Err(ConfigError::CyclicMember {
                            member: member.qualified_name(),
                            ty: target.name(),
                        }
                        .into())
                    }
                }
            }

            if member.ty() == target && member.can_cascade() && member.attributes().nested.is_none() {
                chain.push(target.id());
                let mut nested_path = path.to_vec();
                nested_path.push(Arc::clone(member));
                let nested = self.collect(
                    target,
                    version,
                    chain,
                    visiting,
                    &nested_path,
                    depth + 1,
                    out,
                );
                chain.pop();
                nested?;
            } else {
                let kind = member.attributes().nested.unwrap_or(RecursionKind::Dynamic);
                let converter = self
                    .converters
                    .resolve_member(member, Some(kind))?
                    .ok_or_else(|| ConfigError::UnsupportedMember {
                        member: member.qualified_name(),
                        ty: member.ty().name(),
                    })?;
                self.check_nested(converter.as_ref(), version, visiting)?;
                out.push(bind(converter));
            }
        }
        Ok(())
    }

    /// Builds (without caching) the list of every object type `converter`
    /// reaches that is neither cached nor already being built.
    fn check_nested(
        &self,
        converter: &dyn Converter,
        version: Option<Version>,
        visiting: &mut Vec<TypeId>,
    ) -> Result<()> {
        for nested in converter.nested_objects() {
            let key = MappingKey::new(nested.id(), version);
            if visiting.contains(&nested.id()) || self.lists.contains_key(&key) {
                continue;
            }
            visiting.push(nested.id());
            let checked = self.build_list(nested, version, visiting);
            visiting.pop();
            checked?;
            log::trace!("checked nested mapping of '{}'", nested.name());
        }
        Ok(())
    }

    /// The compiled mapping of `T` under `version`, built on first use.
    pub fn compiled<T: crate::Reflect>(
        &self,
        version: Option<Version>,
    ) -> Result<Arc<CompiledMapping<T>>> {
        let key = MappingKey::new(TypeId::of::<T>(), version);
        if let Some(found) = self.compiled.get(&key) {
            if let Ok(mapping) = Arc::clone(found.value()).downcast::<CompiledMapping<T>>() {
                return Ok(mapping);
            }
        }
        let list = self.mapping_list(Type::of::<T>(), version)?;
        let built: Arc<CompiledMapping<T>> = Arc::new(CompiledMapping::build(list)?);
        let entry = self
            .compiled
            .entry(key)
            .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
        Ok(Arc::clone(entry.value())
            .downcast::<CompiledMapping<T>>()
            .unwrap_or(built))
    }

    /// How a root value of `ty` is encoded.
    pub(crate) fn root_plan(&self, ty: Type, kind: RecursionKind) -> Result<RootPlan> {
        let key = (ty.id(), kind);
        if let Some(found) = self.roots.get(&key) {
            return Ok(found.value().clone());
        }
        let plan = if matches!(ty.shape(), TypeShape::Object(_)) {
            RootPlan::Object
        } else {
            let label = ty.short_name();
            let converter = self
                .converters
                .resolve(&ty, &Request::root(kind, label))?
                .ok_or_else(|| ConfigError::UnsupportedMember {
                    member: label.to_owned(),
                    ty: ty.name(),
                })?;
            self.check_nested(converter.as_ref(), self.options.version(), &mut Vec::new())?;
            RootPlan::Converter(converter)
        };
        let entry = self.roots.entry(key).or_insert(plan);
        Ok(entry.value().clone())
    }
}

/// The object type at the bottom of `Option`/`Box` layers, if any.
fn innermost_object(mut ty: Type) -> Option<Type> {
    loop {
        match ty.shape() {
            TypeShape::Object(_) => return Some(ty),
            TypeShape::Nullable(shape) => ty = shape.inner,
            TypeShape::Pointer(shape) => ty = shape.inner,
            _ => return None,
        }
    }
}
