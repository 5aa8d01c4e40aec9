#![allow(missing_docs)]

use std::any::Any;

use mapcode::converter::{Converter, MemberContext};
use mapcode::io::{BinaryReader, BinaryWriter};
use mapcode::reflect::{BoxedValue, MemberKind};
use mapcode::{Mapcode, MapcodeEnum, MapcodeObject, Type};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Clone, Copy, PartialEq, MapcodeEnum)]
enum Biome {
    #[default]
    Plains,
    #[mapcode(rename = "DEEP_FOREST")]
    Forest,
    Desert,
}

/// Not mappable at all; only allowed behind `ignore`.
#[derive(Debug, Default, Clone, PartialEq)]
struct RenderCache(Vec<f32>);

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct LevelState {
    #[mapcode(order = 10)]
    name: String,
    id: u32,
    biome: Biome,
    #[mapcode(ignore)]
    cache: RenderCache,
    indices: Vec<u64>,
}

#[test]
fn test_macro_ergonomics() {
    let level = LevelState {
        name: "Dungeon_01".into(),
        id: 42,
        biome: Biome::Forest,
        cache: RenderCache(vec![1.0]),
        indices: (0..10_000).map(|i| i * 2).collect(),
    };

    let file = NamedTempFile::new().expect("Failed to create temp file");
    Mapcode::save(file.path(), &level).expect("Failed to save mapcode data");
    let loaded: LevelState = Mapcode::load(file.path()).expect("Failed to read mapcode data");

    assert_eq!(loaded.cache, RenderCache::default());
    assert_eq!(
        loaded,
        LevelState {
            cache: RenderCache::default(),
            ..level
        }
    );
}

#[test]
fn explicit_order_and_ignore_shape_the_mapping() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<LevelState>())?;
    // Discovery positions 1.. for unordered members; `cache` still takes a slot.
    assert_eq!(list.paths(), vec!["id", "biome", "indices", "name"]);
    let orders: Vec<i64> = list.iter().map(|m| m.member().order()).collect();
    assert_eq!(orders, vec![2, 3, 5, 10]);
    Ok(())
}

#[test]
fn enums_travel_by_wire_name() -> mapcode::Result<()> {
    let bytes = Mapcode::serialize(&Biome::Forest)?;
    assert_eq!(&bytes[5..9], &[11, 0, 0, 0]);
    assert_eq!(&bytes[9..], b"DEEP_FOREST");
    assert_eq!(Mapcode::deserialize::<Biome>(&bytes)?, Biome::Forest);
    Ok(())
}

#[test]
fn unknown_enum_name_is_a_data_error() {
    let mut bytes = b"MCVH\0".to_vec();
    bytes.extend_from_slice(&[6, 0, 0, 0]);
    bytes.extend_from_slice(b"Tundra");
    let err = Mapcode::deserialize::<Biome>(&bytes).unwrap_err();
    assert!(matches!(
        err,
        mapcode::MapcodeError::Data(mapcode::DataError::UnknownEnumName { ref name, .. }) if name == "Tundra"
    ));
}

/// Writes a `u16` as its big-endian bytes, to tell it apart from the default.
#[derive(Debug, Default)]
struct BigEndianU16;

impl Converter for BigEndianU16 {
    fn target(&self) -> Type {
        Type::of::<u16>()
    }

    fn name(&self) -> Option<&str> {
        Some("be16")
    }

    fn write_core(
        &self,
        writer: &mut BinaryWriter<'_>,
        ty: &Type,
        value: &dyn Any,
        _ctx: &MemberContext<'_>,
    ) -> mapcode::Result<()> {
        let value = value
            .downcast_ref::<u16>()
            .ok_or_else(|| mapcode::MapcodeError::Internal(format!("not a {ty}")))?;
        writer.write_raw(&value.to_be_bytes())
    }

    fn read_core(
        &self,
        reader: &mut BinaryReader<'_>,
        _ty: &Type,
        _ctx: &MemberContext<'_>,
    ) -> mapcode::Result<BoxedValue> {
        let raw = reader.read_raw(2)?;
        Ok(Box::new(u16::from_be_bytes([raw[0], raw[1]])))
    }
}

#[derive(Debug, Default, PartialEq, MapcodeObject)]
struct Ports {
    plain: u16,
    #[mapcode(with = BigEndianU16)]
    inline: u16,
    #[mapcode(converter = "be16")]
    registered: u16,
}

#[test]
fn converter_overrides() -> mapcode::Result<()> {
    let serializer = Mapcode::builder()
        .converter(std::sync::Arc::new(BigEndianU16))
        .build();
    let ports = Ports {
        plain: 0x0102,
        inline: 0x0304,
        registered: 0x0506,
    };
    let bytes = serializer.serialize(&ports)?;
    assert_eq!(&bytes[5..], &[0x02, 0x01, 0x03, 0x04, 0x05, 0x06]);
    assert_eq!(serializer.deserialize::<Ports>(&bytes)?, ports);
    Ok(())
}

#[test]
fn unregistered_converter_name_is_a_configuration_error() {
    // The default serializer has no "be16" registered.
    let err = Mapcode::serialize(&Ports::default()).unwrap_err();
    assert!(matches!(
        err,
        mapcode::MapcodeError::Configuration(mapcode::ConfigError::UnknownConverter { ref name, .. }) if name == "be16"
    ));
}

#[derive(Debug, Default, PartialEq, MapcodeObject)]
struct Packet {
    #[mapcode(segment(offset = 2, len = 3))]
    payload: Vec<u8>,
    tail: u8,
}

#[test]
fn segments_write_a_fixed_run() -> mapcode::Result<()> {
    let packet = Packet {
        payload: vec![9, 9, 1, 2, 3, 9],
        tail: 7,
    };
    let bytes = Mapcode::serialize(&packet)?;
    // null flag, the three segment bytes, then `tail`
    assert_eq!(&bytes[5..], &[0, 1, 2, 3, 7]);

    let back: Packet = Mapcode::deserialize(&bytes)?;
    assert_eq!(back.payload, vec![0, 0, 1, 2, 3]);
    assert_eq!(back.tail, 7);
    Ok(())
}

#[test]
fn short_array_does_not_fit_its_segment() {
    let packet = Packet {
        payload: vec![1, 2],
        tail: 0,
    };
    let err = Mapcode::serialize(&packet).unwrap_err();
    assert!(matches!(
        err,
        mapcode::MapcodeError::Data(mapcode::DataError::SegmentOutOfRange { actual: 2, .. })
    ));
}

#[derive(Debug, Default, PartialEq, MapcodeObject)]
#[mapcode(property(name = "celsius", ty = "i32", get = "celsius", set = "set_celsius", order = 1))]
#[mapcode(property(name = "label", ty = "String", get = "label", order = 2))]
struct Thermometer {
    kelvin: i32,
}

impl Thermometer {
    fn celsius(&self) -> i32 {
        self.kelvin - 273
    }

    fn set_celsius(&mut self, value: i32) {
        self.kelvin = value + 273;
    }

    fn label(&self) -> String {
        format!("{}C", self.celsius())
    }
}

#[test]
fn properties_are_mapped_when_selected() -> mapcode::Result<()> {
    let serializer = Mapcode::builder().member_kind(MemberKind::Property).build();
    let list = serializer.mapping_list(Type::of::<Thermometer>())?;
    assert_eq!(list.paths(), vec!["celsius", "label"]);

    let bytes = serializer.serialize(&Thermometer { kelvin: 300 })?;
    let mut expected = 27i32.to_le_bytes().to_vec();
    expected.extend_from_slice(&[0, 3, 0, 0, 0, b'2', b'7', b'C']);
    assert_eq!(&bytes[5..], expected.as_slice());

    // `label` has no setter: read and discarded.
    let back: Thermometer = serializer.deserialize(&bytes)?;
    assert_eq!(back, Thermometer { kelvin: 300 });
    Ok(())
}

#[test]
fn fields_are_the_default_member_kind() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Thermometer>())?;
    assert_eq!(list.paths(), vec!["kelvin"]);
    Ok(())
}

#[test]
fn selecting_both_member_kinds_is_rejected() {
    let serializer = Mapcode::builder()
        .add_member_kind(MemberKind::Property)
        .build();
    let err = serializer
        .serialize(&Thermometer { kelvin: 1 })
        .unwrap_err();
    assert!(matches!(
        err,
        mapcode::MapcodeError::Configuration(mapcode::ConfigError::ConflictingMemberKinds { .. })
    ));
}
