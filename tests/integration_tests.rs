#![allow(missing_docs)]

use mapcode::{Mapcode, MapcodeObject, Serializer, Type};

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Record {
    name: String,
    tags: Vec<String>,
    count: i32,
}

fn record() -> Record {
    Record {
        name: "abc".into(),
        tags: vec!["x".into(), "y".into()],
        count: 2,
    }
}

#[test]
fn record_has_the_documented_layout() -> mapcode::Result<()> {
    let bytes = Mapcode::serialize(&record())?;
    #[rustfmt::skip]
    let parts: &[&[u8]] = &[
        &b"MCVH"[..], &[0],
        &[0], &[3, 0, 0, 0], b"abc",
        &[0], &[2, 0, 0, 0],
        &[0], &[1, 0, 0, 0], b"x",
        &[0], &[1, 0, 0, 0], b"y",
        &[2, 0, 0, 0],
    ];
    assert_eq!(bytes, parts.concat());
    Ok(())
}

#[test]
fn equal_values_encode_identically() -> mapcode::Result<()> {
    let first = Mapcode::serialize(&record())?;
    let second = Serializer::default().serialize(&record())?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn compiled_and_dynamic_engines_agree() -> mapcode::Result<()> {
    let serializer = Serializer::default();
    let compiled = serializer.serialize(&record())?;
    let dynamic = serializer.serialize_dyn(&record(), Type::of::<Record>())?;
    assert_eq!(compiled, dynamic);

    let back = serializer.deserialize_dyn(&compiled, Type::of::<Record>(), None)?;
    assert_eq!(back.downcast_ref::<Record>(), Some(&record()));
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Address {
    city: String,
    zip: u32,
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Customer {
    address: Address,
    id: u16,
    #[mapcode(order = 0)]
    vip: bool,
}

#[test]
fn nested_fields_are_cascaded_after_their_owner() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Customer>())?;
    assert_eq!(list.paths(), vec!["vip", "id", "address.city", "address.zip"]);
    let depths: Vec<u32> = list.iter().map(|m| m.cascade_id()).collect();
    assert_eq!(depths, vec![0, 0, 1, 1]);

    let customer = Customer {
        address: Address {
            city: "Oslo".into(),
            zip: 150,
        },
        id: 7,
        vip: true,
    };
    let bytes = Mapcode::serialize(&customer)?;
    // No framing around the cascaded address.
    assert_eq!(
        &bytes[5..],
        &[1, 7, 0, 0, 4, 0, 0, 0, b'O', b's', b'l', b'o', 150, 0, 0, 0]
    );
    assert_eq!(Mapcode::deserialize::<Customer>(&bytes)?, customer);
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Order {
    id: u32,
    shipping: Option<Address>,
    #[mapcode(nested = "compiled")]
    billing: Option<Box<Address>>,
    #[mapcode(elements = "compiled")]
    lines: Vec<Line>,
    #[mapcode(elements = "dynamic")]
    history: Vec<Line>,
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Line {
    sku: String,
    qty: u16,
}

fn order() -> Order {
    Order {
        id: 1,
        shipping: Some(Address {
            city: "Rome".into(),
            zip: 100,
        }),
        billing: None,
        lines: vec![
            Line {
                sku: "A-1".into(),
                qty: 2,
            },
            Line {
                sku: "B-2".into(),
                qty: 1,
            },
        ],
        history: vec![Line {
            sku: "Z".into(),
            qty: 9,
        }],
    }
}

#[test]
fn optional_objects_and_object_lists_round_trip() -> mapcode::Result<()> {
    let bytes = Mapcode::serialize(&order())?;
    assert_eq!(Mapcode::deserialize::<Order>(&bytes)?, order());

    let mut filled = order();
    filled.billing = Some(Box::new(Address {
        city: "Bern".into(),
        zip: 3000,
    }));
    filled.shipping = None;
    let bytes = Mapcode::serialize(&filled)?;
    assert_eq!(Mapcode::deserialize::<Order>(&bytes)?, filled);
    Ok(())
}

#[test]
fn recursion_strategy_does_not_change_the_bytes() -> mapcode::Result<()> {
    let serializer = Serializer::default();
    let compiled = serializer.serialize(&order())?;
    let dynamic = serializer.serialize_dyn(&order(), Type::of::<Order>())?;
    assert_eq!(compiled, dynamic);

    // `lines` and `history` hold the same element type with different engines.
    let mut swapped = order();
    std::mem::swap(&mut swapped.lines, &mut swapped.history);
    let back: Order = serializer.deserialize(&serializer.serialize(&swapped)?)?;
    assert_eq!(back, swapped);
    Ok(())
}

#[test]
fn nested_object_converters_use_the_requested_engine() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Order>())?;
    let shipping = list
        .iter()
        .find(|m| m.path_name() == "shipping")
        .expect("shipping is mapped");
    assert!(format!("{:?}", shipping.converter()).contains("kind: Dynamic"));

    let billing = list
        .iter()
        .find(|m| m.path_name() == "billing")
        .expect("billing is mapped");
    assert!(format!("{:?}", billing.converter()).contains("kind: Compiled"));
    Ok(())
}

#[test]
fn deserialize_into_keeps_unmapped_members() -> mapcode::Result<()> {
    #[derive(Debug, Default, PartialEq, MapcodeObject)]
    struct Settings {
        volume: u8,
        #[mapcode(ignore)]
        session: u64,
    }

    let bytes = Mapcode::serialize(&Settings {
        volume: 3,
        session: 99,
    })?;
    let mut target = Settings {
        volume: 0,
        session: 42,
    };
    Mapcode::default_serializer().deserialize_into(&bytes, &mut target)?;
    assert_eq!(
        target,
        Settings {
            volume: 3,
            session: 42
        }
    );
    Ok(())
}

#[test]
fn dynamic_decode_into_an_initial_value() -> mapcode::Result<()> {
    let serializer = Serializer::default();
    let bytes = serializer.serialize(&record())?;
    let initial = Box::new(Record {
        name: "old".into(),
        tags: Vec::new(),
        count: -1,
    });
    let back = serializer.deserialize_dyn(&bytes, Type::of::<Record>(), Some(initial))?;
    assert_eq!(back.downcast_ref::<Record>(), Some(&record()));

    let err = serializer
        .deserialize_dyn(&bytes, Type::of::<Record>(), Some(Box::new(5u8)))
        .unwrap_err();
    assert!(err.is_data());
    Ok(())
}

#[test]
fn utf16_encoding_applies_to_every_string() -> mapcode::Result<()> {
    let serializer = Mapcode::builder()
        .encoding(mapcode::StringEncoding::Utf16Le)
        .build();
    let bytes = serializer.serialize(&record())?;
    assert_eq!(&bytes[5..12], &[0, 6, 0, 0, 0, b'a', 0]);
    assert_eq!(serializer.deserialize::<Record>(&bytes)?, record());
    Ok(())
}

#[test]
fn custom_ordering_function() -> mapcode::Result<()> {
    // Reverse declaration order.
    let serializer = Mapcode::builder()
        .order_by(|_, index, total| (total - index) as i64)
        .build();
    let list = serializer.mapping_list(Type::of::<Record>())?;
    assert_eq!(list.paths(), vec!["count", "tags", "name"]);
    assert_eq!(serializer.deserialize::<Record>(&serializer.serialize(&record())?)?, record());
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Reading {
    value: Option<Option<i32>>,
}

#[test]
fn nested_options_keep_both_flags() -> mapcode::Result<()> {
    let cases: [(Option<Option<i32>>, &[u8]); 3] = [
        (None, &[1]),
        (Some(None), &[0, 1]),
        (Some(Some(3)), &[0, 0, 3, 0, 0, 0]),
    ];
    for (value, expected) in cases {
        let reading = Reading { value };
        let bytes = Mapcode::serialize(&reading)?;
        assert_eq!(&bytes[5..], expected, "{value:?}");
        assert_eq!(Mapcode::deserialize::<Reading>(&bytes)?, reading);

        let dynamic = Mapcode::default_serializer().serialize_dyn(&reading, Type::of::<Reading>())?;
        assert_eq!(dynamic, bytes);
    }
    Ok(())
}
