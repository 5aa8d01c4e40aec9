#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, VecDeque};

use mapcode::{ConfigError, Mapcode, MapcodeError, MapcodeObject, Type};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct UserProfile {
    level: u32,
    score: u64,
}

#[derive(Debug, Default, PartialEq, MapcodeObject)]
struct UserDatabase {
    id: u32,
    #[mapcode(values = "compiled")]
    users: HashMap<String, UserProfile>,
    #[mapcode(keys = "dynamic")]
    by_profile: Vec<(UserProfile, bool)>,
}

#[test]
fn test_map_of_objects() {
    let mut users = HashMap::new();
    for i in 0..5000u32 {
        users.insert(
            format!("user_{i}"),
            UserProfile {
                level: i % 100,
                score: u64::from(i) * 10,
            },
        );
    }
    let db = UserDatabase {
        id: 1,
        users,
        by_profile: vec![(
            UserProfile {
                level: 1,
                score: 2,
            },
            true,
        )],
    };

    let file = NamedTempFile::new().expect("Failed to create temp file");
    Mapcode::save(file.path(), &db).expect("Failed to save");
    let loaded: UserDatabase = Mapcode::load(file.path()).expect("Failed to load");

    assert_eq!(loaded.users.len(), 5000);
    assert_eq!(
        loaded.users.get("user_4999"),
        Some(&UserProfile {
            level: 99,
            score: 49_990
        })
    );
    assert_eq!(loaded, db);
}

#[test]
fn btree_maps_are_written_in_key_order() -> mapcode::Result<()> {
    let map = BTreeMap::from([(2u8, "b".to_string()), (1u8, "a".to_string())]);
    let bytes = Mapcode::serialize(&map)?;
    #[rustfmt::skip]
    assert_eq!(
        &bytes[5..],
        &[
            0, 2, 0, 0, 0,
            1, 0, 1, 0, 0, 0, b'a',
            2, 0, 1, 0, 0, 0, b'b',
        ]
    );
    assert_eq!(Mapcode::deserialize::<BTreeMap<u8, String>>(&bytes)?, map);
    Ok(())
}

#[test]
fn pairs_have_no_flag_of_their_own() -> mapcode::Result<()> {
    let pair = (7u16, true);
    let bytes = Mapcode::serialize(&pair)?;
    assert_eq!(&bytes[5..], &[7, 0, 1]);
    assert_eq!(Mapcode::deserialize::<(u16, bool)>(&bytes)?, pair);
    Ok(())
}

#[test]
fn root_collections_of_objects_are_mapped() -> mapcode::Result<()> {
    let profiles: VecDeque<UserProfile> = (0..3)
        .map(|i| UserProfile {
            level: i,
            score: 1,
        })
        .collect();
    let bytes = Mapcode::serialize(&profiles)?;
    assert_eq!(Mapcode::deserialize::<VecDeque<UserProfile>>(&bytes)?, profiles);

    let dynamic = Mapcode::default_serializer()
        .serialize_dyn(&profiles, Type::of::<VecDeque<UserProfile>>())?;
    assert_eq!(dynamic, bytes);
    Ok(())
}

#[test]
fn empty_and_nested_collections() -> mapcode::Result<()> {
    let nested: Vec<Vec<Option<i8>>> = vec![vec![], vec![Some(-1), None]];
    let bytes = Mapcode::serialize(&nested)?;
    assert_eq!(Mapcode::deserialize::<Vec<Vec<Option<i8>>>>(&bytes)?, nested);

    let empty: HashMap<String, Vec<u8>> = HashMap::new();
    let bytes = Mapcode::serialize(&empty)?;
    assert_eq!(&bytes[5..], &[0, 0, 0, 0, 0]);
    assert!(Mapcode::deserialize::<HashMap<String, Vec<u8>>>(&bytes)?.is_empty());
    Ok(())
}

#[derive(Debug, Default, MapcodeObject)]
struct Unannotated {
    users: HashMap<String, UserProfile>,
}

#[test]
fn map_values_need_a_strategy() {
    let err = Mapcode::serialize(&Unannotated::default()).unwrap_err();
    match err {
        MapcodeError::Configuration(ConfigError::MissingElementStrategy { member, element }) => {
            assert_eq!(member, "Unannotated.users");
            assert!(element.ends_with("UserProfile"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Scores {
    by_name: HashMap<String, i32>,
}

#[test]
fn equal_hash_maps_encode_identically() -> mapcode::Result<()> {
    let mut forward = Scores::default();
    let mut backward = Scores::default();
    for i in 0..32 {
        forward.by_name.insert(format!("player_{i}"), i);
    }
    for i in (0..32).rev() {
        backward.by_name.insert(format!("player_{i}"), i);
    }
    assert_eq!(forward, backward);

    let bytes = Mapcode::serialize(&forward)?;
    assert_eq!(Mapcode::serialize(&backward)?, bytes);

    let back: Scores = Mapcode::deserialize(&bytes)?;
    assert_eq!(back, forward);
    assert_eq!(Mapcode::serialize(&back)?, bytes);
    Ok(())
}

#[test]
fn hash_map_entries_are_written_in_byte_order() -> mapcode::Result<()> {
    let mut data = HashMap::new();
    data.insert(2u16, 20u8);
    data.insert(1u16, 10u8);
    data.insert(258u16, 30u8);
    let bytes = Mapcode::serialize(&data)?;
    assert_eq!(
        &bytes[5..],
        // flag, count, then (key, value) pairs sorted by their encoded bytes
        &[0, 3, 0, 0, 0, 1, 0, 10, 2, 0, 20, 2, 1, 30]
    );
    Ok(())
}
