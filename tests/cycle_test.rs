#![allow(missing_docs)]

use mapcode::{ConfigError, CyclePolicy, Mapcode, MapcodeError, MapcodeObject, Type};

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Node {
    value: i32,
    next: Option<Box<Node>>,
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Parent {
    name: String,
    child: Child,
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Child {
    age: u8,
    parent: Option<Box<Parent>>,
}

#[test]
fn self_reference_is_skipped() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Node>())?;
    assert_eq!(list.paths(), vec!["value"]);

    let node = Node {
        value: 5,
        next: Some(Box::new(Node::default())),
    };
    let bytes = Mapcode::serialize(&node)?;
    assert_eq!(&bytes[5..], &[5, 0, 0, 0]);
    let back: Node = Mapcode::deserialize(&bytes)?;
    assert_eq!(back, Node { value: 5, next: None });
    Ok(())
}

#[test]
fn indirect_back_reference_is_skipped_through_a_cascade() -> mapcode::Result<()> {
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Parent>())?;
    assert_eq!(list.paths(), vec!["name", "child.age"]);

    // Seen from the child, the parent is the back-reference.
    let list = Mapcode::default_serializer().mapping_list(Type::of::<Child>())?;
    assert_eq!(list.paths(), vec!["age", "parent"]);
    Ok(())
}

#[test]
fn strict_policy_rejects_cycles() {
    let serializer = Mapcode::builder().cycle_policy(CyclePolicy::Error).build();
    let err = serializer.serialize(&Node::default()).unwrap_err();
    match err {
        MapcodeError::Configuration(ConfigError::CyclicMember { member, ty }) => {
            assert_eq!(member, "Node.next");
            assert!(ty.ends_with("Node"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(serializer.mapping_list(Type::of::<Parent>()).is_err());
}

#[derive(Debug, Default, Clone, PartialEq, MapcodeObject)]
struct Tree {
    label: String,
    #[mapcode(elements = "compiled")]
    children: Vec<Tree>,
}

#[test]
fn recursive_collections_follow_the_data() -> mapcode::Result<()> {
    let tree = Tree {
        label: "root".into(),
        children: vec![
            Tree {
                label: "a".into(),
                children: vec![Tree {
                    label: "a1".into(),
                    children: Vec::new(),
                }],
            },
            Tree {
                label: "b".into(),
                children: Vec::new(),
            },
        ],
    };
    let bytes = Mapcode::serialize(&tree)?;
    assert_eq!(Mapcode::deserialize::<Tree>(&bytes)?, tree);

    let dynamic = Mapcode::default_serializer().serialize_dyn(&tree, Type::of::<Tree>())?;
    assert_eq!(dynamic, bytes);
    Ok(())
}
