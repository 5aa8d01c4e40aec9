use std::any::Any;
use std::fmt;

use super::{boxed_default, BoxedValue, MemberInfo, Reflect, Type};
use crate::converter::MemberContext;
use crate::error::Result;
use crate::io::{BinaryReader, BinaryWriter};
use crate::mapping::compiled;

/// What kind of value a type is, with the type-erased operations the converters
/// need to take it apart and put it back together.
#[derive(Clone)]
pub enum TypeShape {
    /// Handled entirely by a registered converter.
    Primitive,
    /// `Option<T>`.
    Nullable(NullableShape),
    /// `Box<T>`.
    Pointer(PointerShape),
    /// A sequence of elements.
    List(ListShape),
    /// A keyed collection.
    Map(MapShape),
    /// A 2-tuple.
    Pair(PairShape),
    /// A fieldless enum, encoded by variant name.
    Enum(EnumShape),
    /// A type with named members.
    Object(ObjectShape),
}

impl TypeShape {
    /// Short label used in logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Nullable(_) => "nullable",
            Self::Pointer(_) => "pointer",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Pair(_) => "pair",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
        }
    }
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(shape) => f
                .debug_struct("Object")
                .field("members", &shape.members)
                .finish_non_exhaustive(),
            Self::Enum(shape) => f
                .debug_struct("Enum")
                .field("variants", &shape.variants)
                .finish_non_exhaustive(),
            other => f.write_str(other.label()),
        }
    }
}

/// Shape of `Option<T>`.
#[derive(Clone, Copy)]
pub struct NullableShape {
    /// `T`.
    pub inner: Type,
    /// The `Some` payload.
    pub unwrap: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>,
    /// Wraps a decoded `T` in `Some`.
    pub wrap: fn(BoxedValue) -> Result<BoxedValue>,
}

/// Shape of `Box<T>`.
#[derive(Clone, Copy)]
pub struct PointerShape {
    /// `T`.
    pub inner: Type,
    /// The pointee.
    pub deref: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>,
    /// Boxes a decoded `T`.
    pub wrap: fn(BoxedValue) -> Result<BoxedValue>,
}

/// Shape of a list.
#[derive(Clone, Copy)]
pub struct ListShape {
    /// Element type.
    pub element: Type,
    /// Number of elements.
    pub len: fn(&dyn Any) -> Option<usize>,
    /// Element at an index.
    pub item: for<'a> fn(&'a dyn Any, usize) -> Option<&'a dyn Any>,
    /// Builds the list from decoded elements.
    pub build: fn(Vec<BoxedValue>) -> Result<BoxedValue>,
}

/// Shape of a keyed collection.
#[derive(Clone, Copy)]
pub struct MapShape {
    /// Key type.
    pub key: Type,
    /// Value type.
    pub value: Type,
    /// Whether iteration order is a function of the contents alone (key order).
    /// Entries of other maps are sorted by their encoded bytes before writing.
    pub sorted: bool,
    /// Entries in iteration order.
    pub entries: for<'a> fn(&'a dyn Any) -> Option<Vec<(&'a dyn Any, &'a dyn Any)>>,
    /// Builds the collection from decoded entries.
    pub build: fn(Vec<(BoxedValue, BoxedValue)>) -> Result<BoxedValue>,
}

/// Shape of a 2-tuple.
#[derive(Clone, Copy)]
pub struct PairShape {
    /// First element type.
    pub key: Type,
    /// Second element type.
    pub value: Type,
    /// Borrows both halves.
    pub split: for<'a> fn(&'a dyn Any) -> Option<(&'a dyn Any, &'a dyn Any)>,
    /// Builds the tuple from decoded halves.
    pub join: fn(BoxedValue, BoxedValue) -> Result<BoxedValue>,
}

/// Shape of a fieldless enum.
#[derive(Clone, Copy)]
pub struct EnumShape {
    /// Variant names, in declaration order.
    pub variants: &'static [&'static str],
    /// Name of a value's variant.
    pub name_of: fn(&dyn Any) -> Option<&'static str>,
    /// The variant with a given name.
    pub from_name: fn(&str) -> Option<BoxedValue>,
}

impl EnumShape {
    /// Bundles the variant table.
    pub fn new(
        variants: &'static [&'static str],
        name_of: fn(&dyn Any) -> Option<&'static str>,
        from_name: fn(&str) -> Option<BoxedValue>,
    ) -> Self {
        Self {
            variants,
            name_of,
            from_name,
        }
    }
}

/// Entry points into the compiled engine for one concrete object type.
#[derive(Clone, Copy)]
pub struct CompiledHooks {
    /// Encodes a value through its compiled mapping.
    pub write: fn(&MemberContext<'_>, &dyn Any, &mut BinaryWriter<'_>) -> Result<()>,
    /// Decodes a fresh value through its compiled mapping.
    pub read: fn(&MemberContext<'_>, &mut BinaryReader<'_>) -> Result<BoxedValue>,
}

/// Shape of a type with named members.
#[derive(Clone)]
pub struct ObjectShape {
    members: Vec<MemberInfo>,
    construct: fn() -> BoxedValue,
    hooks: CompiledHooks,
}

impl ObjectShape {
    /// Describes `T` with the given members, in declaration order.
    pub fn new<T: Reflect>(members: Vec<MemberInfo>) -> Self {
        Self {
            members,
            construct: boxed_default::<T>,
            hooks: CompiledHooks {
                write: compiled::write_hook::<T>,
                read: compiled::read_hook::<T>,
            },
        }
    }

    /// Declared members.
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// A default instance to decode into.
    pub fn construct(&self) -> BoxedValue {
        (self.construct)()
    }

    /// Compiled-engine entry points.
    pub fn hooks(&self) -> CompiledHooks {
        self.hooks
    }
}

macro_rules! debug_types {
    ($($shape:ident { $($field:ident),* }),* $(,)?) => {
        $(
            impl fmt::Debug for $shape {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($shape))
                        $(.field(stringify!($field), &self.$field))*
                        .finish_non_exhaustive()
                }
            }
        )*
    };
}

debug_types!(
    NullableShape { inner },
    PointerShape { inner },
    ListShape { element },
    MapShape { key, value, sorted },
    PairShape { key, value },
    EnumShape { variants },
);

impl fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectShape")
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for CompiledHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledHooks")
    }
}
