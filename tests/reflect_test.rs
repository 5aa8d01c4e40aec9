#![allow(missing_docs)]

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};

use mapcode::options::default_order;
use mapcode::reflect::{
    BoxedValue, MemberAccess, MemberInfo, MemberRef, ObjectShape, TypeShape, TypedMember,
};
use mapcode::{Mapcode, Reflect, Type};

#[test]
fn types_compare_by_id() {
    assert_eq!(Type::of::<u32>(), Type::of::<u32>());
    assert_ne!(Type::of::<u32>(), Type::of::<i32>());
    assert!(Type::of::<String>().is::<String>());
    assert!(Type::of::<u8>().matches(&5u8));
    assert!(!Type::of::<u8>().matches(&5u16));
}

#[test]
fn null_probe_only_fires_for_none() {
    let ty = Type::of::<Option<u8>>();
    assert!(ty.is_null(&None::<u8>));
    assert!(!ty.is_null(&Some(1u8)));
    assert!(!ty.is_null(&1u8));
    assert!(Type::of::<Box<Option<u8>>>().is_null(&Box::new(None::<u8>)));
}

#[test]
fn short_name_strips_module_path() {
    assert_eq!(Type::of::<String>().short_name(), "String");
    assert_eq!(Type::of::<u8>().short_name(), "u8");
    assert!(Type::of::<Vec<String>>().short_name().starts_with("Vec<"));
}

#[test]
fn default_value_is_boxed_default() {
    let value = Type::of::<Vec<u8>>().default_value();
    assert_eq!(value.downcast_ref::<Vec<u8>>(), Some(&Vec::new()));
}

#[test]
fn list_shape_walks_and_rebuilds() -> mapcode::Result<()> {
    let TypeShape::List(shape) = Type::of::<Vec<u16>>().shape() else {
        panic!("Vec should have a list shape");
    };
    let value = vec![3u16, 4];
    assert_eq!((shape.len)(&value), Some(2));
    assert_eq!(
        (shape.item)(&value, 1).and_then(|v| v.downcast_ref::<u16>()),
        Some(&4)
    );

    let rebuilt = (shape.build)(vec![Box::new(7u16) as BoxedValue, Box::new(8u16)])?;
    assert_eq!(rebuilt.downcast_ref::<Vec<u16>>(), Some(&vec![7, 8]));
    Ok(())
}

#[test]
fn list_build_rejects_foreign_elements() {
    let TypeShape::List(shape) = Type::of::<VecDeque<u8>>().shape() else {
        panic!("VecDeque should have a list shape");
    };
    let err = (shape.build)(vec![Box::new("x".to_string()) as BoxedValue]).unwrap_err();
    assert!(err.is_data());
}

#[test]
fn option_shape_unwraps_some_only() {
    let TypeShape::Nullable(shape) = Type::of::<Option<u8>>().shape() else {
        panic!("Option should have a nullable shape");
    };
    assert!((shape.unwrap)(&None::<u8>).is_none());
    assert_eq!(
        (shape.unwrap)(&Some(5u8)).and_then(|v| v.downcast_ref::<u8>()),
        Some(&5)
    );
}

#[test]
fn btree_entries_follow_key_order() {
    let TypeShape::Map(shape) = Type::of::<BTreeMap<u8, bool>>().shape() else {
        panic!("BTreeMap should have a map shape");
    };
    let map = BTreeMap::from([(2u8, true), (1u8, false)]);
    let keys: Vec<u8> = (shape.entries)(&map)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, _)| k.downcast_ref::<u8>().copied())
        .collect();
    assert_eq!(keys, vec![1, 2]);
}

#[test]
fn default_order_prefers_explicit_order() {
    let plain = MemberInfo::field::<u32>("a");
    assert_eq!(default_order(&plain, 0, 2), 1);
    assert_eq!(default_order(&plain, 4, 5), 5);

    let mut attributes = plain.attributes().clone();
    attributes.order = Some(-3);
    let ordered = MemberInfo::field::<u32>("b").with_attributes(attributes);
    assert_eq!(default_order(&ordered, 1, 2), -3);
}

#[test]
fn ignored_members_stay_ignored() {
    let info = MemberInfo::ignored("cache", mapcode::reflect::MemberKind::Field)
        .with_attributes(Default::default());
    assert!(info.attributes().ignore);
    assert!(!info.can_read());
}

// A hand-written impl, for types the derive cannot describe.
#[derive(Debug, Default, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

fn point_x(owner: &dyn Any) -> Option<MemberRef<'_>> {
    owner
        .downcast_ref::<Point>()
        .map(|p| MemberRef::Borrowed(&p.x as &dyn Any))
}

fn point_x_mut(owner: &mut dyn Any) -> Option<&mut dyn Any> {
    owner
        .downcast_mut::<Point>()
        .map(|p| &mut p.x as &mut dyn Any)
}

fn point_set_x(owner: &mut dyn Any, value: BoxedValue) -> mapcode::Result<()> {
    mapcode::rt::owner_mut::<Point>(owner)?.x = mapcode::rt::unbox(value)?;
    Ok(())
}

// `y` is exposed read-only: written, then discarded on decode.
fn point_y(owner: &dyn Any) -> Option<MemberRef<'_>> {
    owner
        .downcast_ref::<Point>()
        .map(|p| MemberRef::Owned(Box::new(p.y) as BoxedValue))
}

impl Reflect for Point {
    fn shape() -> TypeShape {
        TypeShape::Object(ObjectShape::new::<Self>(vec![
            MemberInfo::field::<i32>("x")
                .with_access(MemberAccess::field(point_x, point_x_mut, point_set_x)),
            MemberInfo::field::<i32>("y").with_access(MemberAccess::property().with_getter(point_y)),
        ]))
    }

    fn typed_members() -> Vec<TypedMember<Self>> {
        fn x(p: &Point) -> MemberRef<'_> {
            MemberRef::Borrowed(&p.x)
        }
        fn x_mut(p: &mut Point) -> &mut dyn Any {
            &mut p.x
        }
        fn set_x(p: &mut Point, value: BoxedValue) -> mapcode::Result<()> {
            p.x = mapcode::rt::unbox(value)?;
            Ok(())
        }
        fn y(p: &Point) -> MemberRef<'_> {
            MemberRef::Owned(Box::new(p.y))
        }
        vec![
            TypedMember::field("x", x, x_mut, set_x),
            TypedMember::bare("y").with_getter(y),
        ]
    }
}

#[test]
fn hand_written_reflect_round_trips() -> mapcode::Result<()> {
    let point = Point { x: 3, y: -4 };
    let bytes = Mapcode::serialize(&point)?;
    assert_eq!(&bytes[5..], &[3, 0, 0, 0, 0xFC, 0xFF, 0xFF, 0xFF]);

    let back: Point = Mapcode::deserialize(&bytes)?;
    assert_eq!(back, Point { x: 3, y: 0 });
    Ok(())
}

#[test]
fn hand_written_reflect_matches_dynamic_engine() -> mapcode::Result<()> {
    let point = Point { x: 10, y: 20 };
    let serializer = Mapcode::default_serializer();
    let compiled = serializer.serialize(&point)?;
    let dynamic = serializer.serialize_dyn(&point, Type::of::<Point>())?;
    assert_eq!(compiled, dynamic);

    let back = serializer.deserialize_dyn(&dynamic, Type::of::<Point>(), None)?;
    assert_eq!(back.downcast_ref::<Point>(), Some(&Point { x: 10, y: 0 }));
    Ok(())
}
