use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{BoxedValue, Opaque, Reflect, Type};
use crate::converter::Converter;
use crate::error::Result;
use crate::version::Version;

/// Reads a member from a type-erased owner. `None` if the owner is not the
/// declaring type.
pub type GetFn = for<'a> fn(&'a dyn Any) -> Option<MemberRef<'a>>;
/// Borrows a field mutably from a type-erased owner.
pub type GetMutFn = for<'a> fn(&'a mut dyn Any) -> Option<&'a mut dyn Any>;
/// Stores a decoded value into a type-erased owner.
pub type SetFn = fn(&mut dyn Any, BoxedValue) -> Result<()>;
/// Statically typed counterpart of [`GetFn`].
pub type TypedGetFn<T> = for<'a> fn(&'a T) -> MemberRef<'a>;
/// Statically typed counterpart of [`GetMutFn`].
pub type TypedGetMutFn<T> = for<'a> fn(&'a mut T) -> &'a mut dyn Any;
/// Statically typed counterpart of [`SetFn`].
pub type TypedSetFn<T> = fn(&mut T, BoxedValue) -> Result<()>;

/// Whether a member is a stored field or a getter/setter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A struct field.
    Field,
    /// A computed member exposed through accessor methods.
    Property,
}

/// Which engine maps a nested object that has no direct converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecursionKind {
    /// Replay the nested type's mapping list over `&dyn Any`.
    Dynamic,
    /// Use the nested type's monomorphized compiled mapping.
    Compiled,
}

/// A fixed run of bytes inside a byte-array member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArraySegment {
    /// Index of the first byte.
    pub offset: usize,
    /// Number of bytes.
    pub len: usize,
}

/// An explicit converter choice on a member.
#[derive(Clone, Copy, Default)]
pub struct ConverterSelector {
    /// Registered converter name.
    pub name: Option<&'static str>,
    /// A converter instance that bypasses the registry.
    pub instance: Option<fn() -> Arc<dyn Converter>>,
}

impl ConverterSelector {
    /// Selects a registered converter by name.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name: Some(name),
            instance: None,
        }
    }

    /// Selects a specific converter instance.
    pub const fn instance(make: fn() -> Arc<dyn Converter>) -> Self {
        Self {
            name: None,
            instance: Some(make),
        }
    }
}

impl fmt::Debug for ConverterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterSelector")
            .field("name", &self.name)
            .field("instance", &self.instance.is_some())
            .finish()
    }
}

/// Per-member annotations.
#[derive(Debug, Clone, Default)]
pub struct MemberAttributes {
    /// Never map this member.
    pub ignore: bool,
    /// Explicit ordering key.
    pub order: Option<i64>,
    /// Explicit converter.
    pub converter: Option<ConverterSelector>,
    /// Fixed byte run for byte-array members.
    pub segment: Option<ArraySegment>,
    /// Engine for a single nested object (`Option<T>`, `Box<T>`) that cannot be
    /// cascaded.
    pub nested: Option<RecursionKind>,
    /// Engine for list elements.
    pub elements: Option<RecursionKind>,
    /// Engine for dictionary keys.
    pub keys: Option<RecursionKind>,
    /// Engine for dictionary values.
    pub values: Option<RecursionKind>,
    /// Version gates. All must admit the active version.
    pub versions: Vec<Version>,
}

/// A member value handed out by an accessor.
///
/// Fields are lent; properties compute their value and hand it over owned.
pub enum MemberRef<'a> {
    /// A borrow of a stored field.
    Borrowed(&'a dyn Any),
    /// A computed value.
    Owned(BoxedValue),
}

impl<'a> MemberRef<'a> {
    /// The value, whichever way it is held.
    pub fn as_any(&self) -> &dyn Any {
        match self {
            Self::Borrowed(value) => *value,
            Self::Owned(value) => &**value,
        }
    }

    /// The borrow, if this is a stored field.
    pub fn into_borrowed(self) -> Option<&'a dyn Any> {
        match self {
            Self::Borrowed(value) => Some(value),
            Self::Owned(_) => None,
        }
    }
}

impl fmt::Debug for MemberRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrowed(_) => f.write_str("MemberRef::Borrowed(..)"),
            Self::Owned(_) => f.write_str("MemberRef::Owned(..)"),
        }
    }
}

/// Type-erased accessors of one member.
#[derive(Clone, Copy, Default)]
pub struct MemberAccess {
    /// Read access. Members without it are never mapped.
    pub get: Option<GetFn>,
    /// Mutable borrow, fields only. Required to cascade into a nested object.
    pub get_mut: Option<GetMutFn>,
    /// Write access. Members without it are read and discarded on decode.
    pub set: Option<SetFn>,
}

impl MemberAccess {
    /// Full access to a stored field.
    pub fn field(get: GetFn, get_mut: GetMutFn, set: SetFn) -> Self {
        Self {
            get: Some(get),
            get_mut: Some(get_mut),
            set: Some(set),
        }
    }

    /// No access yet; add accessors with [`with_getter`](Self::with_getter) and
    /// [`with_setter`](Self::with_setter).
    pub fn property() -> Self {
        Self::default()
    }

    /// Adds read access.
    #[must_use]
    pub fn with_getter(mut self, get: GetFn) -> Self {
        self.get = Some(get);
        self
    }

    /// Adds write access.
    #[must_use]
    pub fn with_setter(mut self, set: SetFn) -> Self {
        self.set = Some(set);
        self
    }
}

impl fmt::Debug for MemberAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberAccess")
            .field("get", &self.get.is_some())
            .field("get_mut", &self.get_mut.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

/// Static description of one declared member.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    name: &'static str,
    kind: MemberKind,
    ty: Type,
    access: MemberAccess,
    attributes: MemberAttributes,
}

impl MemberInfo {
    /// A field of type `T`, without accessors.
    pub fn field<T: Reflect>(name: &'static str) -> Self {
        Self::new(name, MemberKind::Field, Type::of::<T>())
    }

    /// A property of type `T`, without accessors.
    pub fn property<T: Reflect>(name: &'static str) -> Self {
        Self::new(name, MemberKind::Property, Type::of::<T>())
    }

    /// A declared member that is never mapped.
    pub fn ignored(name: &'static str, kind: MemberKind) -> Self {
        let mut info = Self::new(name, kind, Type::of::<Opaque>());
        info.attributes.ignore = true;
        info
    }

    fn new(name: &'static str, kind: MemberKind, ty: Type) -> Self {
        Self {
            name,
            kind,
            ty,
            access: MemberAccess::default(),
            attributes: MemberAttributes::default(),
        }
    }

    /// Sets the accessors.
    #[must_use]
    pub fn with_access(mut self, access: MemberAccess) -> Self {
        self.access = access;
        self
    }

    /// Sets the annotations. An `ignore` already set is kept.
    #[must_use]
    pub fn with_attributes(mut self, attributes: MemberAttributes) -> Self {
        let ignore = self.attributes.ignore || attributes.ignore;
        self.attributes = attributes;
        self.attributes.ignore = ignore;
        self
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

    /// Accessors.
    pub fn access(&self) -> &MemberAccess {
        &self.access
    }

    /// Annotations.
    pub fn attributes(&self) -> &MemberAttributes {
        &self.attributes
    }

    /// Whether the member can be read.
    pub fn can_read(&self) -> bool {
        self.access.get.is_some()
    }

    /// Whether a decoded value can be stored back.
    pub fn can_write(&self) -> bool {
        self.access.set.is_some()
    }
}

/// Statically typed accessors of one member of `T`.
pub struct TypedMember<T> {
    /// Declared name; must match the [`MemberInfo`] at the same index.
    pub name: &'static str,
    /// Read access.
    pub get: Option<TypedGetFn<T>>,
    /// Mutable borrow, fields only.
    pub get_mut: Option<TypedGetMutFn<T>>,
    /// Write access.
    pub set: Option<TypedSetFn<T>>,
}

impl<T> TypedMember<T> {
    /// Full access to a stored field.
    pub fn field(
        name: &'static str,
        get: TypedGetFn<T>,
        get_mut: TypedGetMutFn<T>,
        set: TypedSetFn<T>,
    ) -> Self {
        Self {
            name,
            get: Some(get),
            get_mut: Some(get_mut),
            set: Some(set),
        }
    }

    /// A member with no accessors (a property before
    /// [`with_getter`](Self::with_getter), or an ignored member).
    pub fn bare(name: &'static str) -> Self {
        Self {
            name,
            get: None,
            get_mut: None,
            set: None,
        }
    }

    /// Adds read access.
    #[must_use]
    pub fn with_getter(mut self, get: TypedGetFn<T>) -> Self {
        self.get = Some(get);
        self
    }

    /// Adds write access.
    #[must_use]
    pub fn with_setter(mut self, set: TypedSetFn<T>) -> Self {
        self.set = Some(set);
        self
    }
}

impl<T> Clone for TypedMember<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedMember<T> {}

impl<T> fmt::Debug for TypedMember<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedMember")
            .field("name", &self.name)
            .field("get", &self.get.is_some())
            .field("get_mut", &self.get_mut.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}
