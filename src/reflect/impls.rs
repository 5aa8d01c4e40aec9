//! [`Reflect`] for standard library types.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::Hash;

use super::{
    BoxedValue, ListShape, MapShape, NullableShape, PairShape, PointerShape, Reflect,
    Type, TypeShape,
};
use crate::error::Result;
use crate::rt::unbox;

macro_rules! impl_reflect_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn shape() -> TypeShape {
                    TypeShape::Primitive
                }
            }
        )*
    };
}

impl_reflect_primitive!(
    bool, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, char, String,
);

impl<T: Reflect> Reflect for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::Nullable(NullableShape {
            inner: Type::of::<T>(),
            unwrap: option_unwrap::<T>,
            wrap: option_wrap::<T>,
        })
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }
}

fn option_unwrap<T: Reflect>(value: &dyn Any) -> Option<&dyn Any> {
    value
        .downcast_ref::<Option<T>>()?
        .as_ref()
        .map(|inner| inner as &dyn Any)
}

fn option_wrap<T: Reflect>(value: BoxedValue) -> Result<BoxedValue> {
    Ok(Box::new(Some(unbox::<T>(value)?)))
}

impl<T: Reflect> Reflect for Box<T> {
    fn shape() -> TypeShape {
        TypeShape::Pointer(PointerShape {
            inner: Type::of::<T>(),
            deref: box_deref::<T>,
            wrap: box_wrap::<T>,
        })
    }

    fn is_null(&self) -> bool {
        (**self).is_null()
    }
}

fn box_deref<T: Reflect>(value: &dyn Any) -> Option<&dyn Any> {
    value
        .downcast_ref::<Box<T>>()
        .map(|inner| &**inner as &dyn Any)
}

fn box_wrap<T: Reflect>(value: BoxedValue) -> Result<BoxedValue> {
    Ok(Box::new(Box::new(unbox::<T>(value)?)))
}

macro_rules! impl_reflect_list {
    ($($list:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $list<T> {
                fn shape() -> TypeShape {
                    fn len<T: Reflect>(value: &dyn Any) -> Option<usize> {
                        value.downcast_ref::<$list<T>>().map($list::len)
                    }
                    fn item<T: Reflect>(value: &dyn Any, index: usize) -> Option<&dyn Any> {
                        value
                            .downcast_ref::<$list<T>>()?
                            .get(index)
                            .map(|item| item as &dyn Any)
                    }
                    fn build<T: Reflect>(items: Vec<BoxedValue>) -> Result<BoxedValue> {
                        let list = items
                            .into_iter()
                            .map(unbox::<T>)
                            .collect::<Result<$list<T>>>()?;
                        Ok(Box::new(list))
                    }
                    TypeShape::List(ListShape {
                        element: Type::of::<T>(),
                        len: len::<T>,
                        item: item::<T>,
                        build: build::<T>,
                    })
                }
            }
        )*
    };
}

impl_reflect_list!(Vec, VecDeque);

impl<K, V> Reflect for HashMap<K, V>
where
    K: Reflect + Eq + Hash,
    V: Reflect,
{
    fn shape() -> TypeShape {
        fn entries<K: Reflect + Eq + Hash, V: Reflect>(
            value: &dyn Any,
        ) -> Option<Vec<(&dyn Any, &dyn Any)>> {
            let map = value.downcast_ref::<HashMap<K, V>>()?;
            Some(
                map.iter()
                    .map(|(k, v)| (k as &dyn Any, v as &dyn Any))
                    .collect(),
            )
        }
        fn build<K: Reflect + Eq + Hash, V: Reflect>(
            entries: Vec<(BoxedValue, BoxedValue)>,
        ) -> Result<BoxedValue> {
            let mut map = HashMap::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(unbox::<K>(k)?, unbox::<V>(v)?);
            }
            Ok(Box::new(map))
        }
        TypeShape::Map(MapShape {
            key: Type::of::<K>(),
            value: Type::of::<V>(),
            sorted: false,
            entries: entries::<K, V>,
            build: build::<K, V>,
        })
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Ord,
    V: Reflect,
{
    fn shape() -> TypeShape {
        fn entries<K: Reflect + Ord, V: Reflect>(
            value: &dyn Any,
        ) -> Option<Vec<(&dyn Any, &dyn Any)>> {
            let map = value.downcast_ref::<BTreeMap<K, V>>()?;
            Some(
                map.iter()
                    .map(|(k, v)| (k as &dyn Any, v as &dyn Any))
                    .collect(),
            )
        }
        fn build<K: Reflect + Ord, V: Reflect>(
            entries: Vec<(BoxedValue, BoxedValue)>,
        ) -> Result<BoxedValue> {
            let mut map = BTreeMap::new();
            for (k, v) in entries {
                map.insert(unbox::<K>(k)?, unbox::<V>(v)?);
            }
            Ok(Box::new(map))
        }
        TypeShape::Map(MapShape {
            key: Type::of::<K>(),
            value: Type::of::<V>(),
            sorted: true,
            entries: entries::<K, V>,
            build: build::<K, V>,
        })
    }
}

impl<K: Reflect, V: Reflect> Reflect for (K, V) {
    fn shape() -> TypeShape {
        fn split<K: Reflect, V: Reflect>(value: &dyn Any) -> Option<(&dyn Any, &dyn Any)> {
            let (k, v) = value.downcast_ref::<(K, V)>()?;
            Some((k as &dyn Any, v as &dyn Any))
        }
        fn join<K: Reflect, V: Reflect>(k: BoxedValue, v: BoxedValue) -> Result<BoxedValue> {
            Ok(Box::new((unbox::<K>(k)?, unbox::<V>(v)?)))
        }
        TypeShape::Pair(PairShape {
            key: Type::of::<K>(),
            value: Type::of::<V>(),
            split: split::<K, V>,
            join: join::<K, V>,
        })
    }
}
