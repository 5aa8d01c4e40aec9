//! Type introspection.
//!
//! Rust has no runtime reflection, so every mappable type describes itself
//! through [`Reflect`]: a [`TypeShape`] telling the engine what kind of value it
//! is, plus (for objects) its members and their accessors. The derive macros
//! `MapcodeObject` and `MapcodeEnum` generate these impls; the built-in
//! primitives, strings, `Option`, `Box`, `Vec`, `VecDeque`, `HashMap`,
//! `BTreeMap` and 2-tuples are covered here.
//!
//! [`Type`] is the runtime handle the resolvers and the dynamic engine work with.
//! It is `Copy`, compares by [`TypeId`], and carries function pointers back into
//! the concrete `Reflect` impl so that a value can be built, probed for null or
//! inspected without knowing its static type.

mod impls;
mod member;
mod shape;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use member::{
    ArraySegment, ConverterSelector, GetFn, GetMutFn, MemberAccess, MemberAttributes,
    MemberInfo, MemberKind, MemberRef, RecursionKind, SetFn, TypedGetFn, TypedGetMutFn,
    TypedMember, TypedSetFn,
};
pub use shape::{
    CompiledHooks, EnumShape, ListShape, MapShape, NullableShape, ObjectShape, PairShape,
    PointerShape, TypeShape,
};

/// An owned, type-erased value as produced by a converter's read.
pub type BoxedValue = Box<dyn Any + Send>;

/// Implemented by every type the engine can map.
///
/// `Default` supplies the value a decode starts from (and the value a null flag
/// decodes to).
pub trait Reflect: Any + Send + Sync + Default {
    /// Describes the structure of the type.
    fn shape() -> TypeShape;

    /// Whether this value counts as null on the wire. Only `Option::None` does.
    fn is_null(&self) -> bool {
        false
    }

    /// Statically typed accessors, index-aligned with
    /// [`ObjectShape::members`]. Used by the compiled engine; empty for
    /// non-object types.
    fn typed_members() -> Vec<TypedMember<Self>> {
        Vec::new()
    }
}

/// Runtime handle to a [`Reflect`] type.
#[derive(Clone, Copy)]
pub struct Type {
    id: TypeId,
    name: &'static str,
    shape: fn() -> TypeShape,
    default: fn() -> BoxedValue,
    is_null: fn(&dyn Any) -> bool,
}

impl Type {
    /// The handle for `T`.
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape: T::shape,
            default: boxed_default::<T>,
            is_null: probe_null::<T>,
        }
    }

    /// The `TypeId` of the described type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the shape description. Object shapes allocate their member list,
    /// so callers on hot paths should cache what they need.
    pub fn shape(&self) -> TypeShape {
        (self.shape)()
    }

    /// A fresh default value.
    pub fn default_value(&self) -> BoxedValue {
        (self.default)()
    }

    /// Whether `value` is a null of this type. `false` if `value` is some other type.
    pub fn is_null(&self, value: &dyn Any) -> bool {
        (self.is_null)(value)
    }

    /// Whether this handle describes `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }

    /// The type name without its module path (generic arguments keep theirs).
    pub fn short_name(&self) -> &'static str {
        let head = self.name.split('<').next().unwrap_or(self.name);
        match head.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Placeholder type for members that are declared but never mapped
/// (`#[mapcode(ignore)]`); lets them keep their slot without requiring their
/// real type to implement [`Reflect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Opaque;

impl Reflect for Opaque {
    fn shape() -> TypeShape {
        TypeShape::Primitive
    }
}

pub(crate) fn boxed_default<T: Reflect>() -> BoxedValue {
    Box::new(T::default())
}

fn probe_null<T: Reflect>(value: &dyn Any) -> bool {
    value.downcast_ref::<T>().is_some_and(Reflect::is_null)
}
