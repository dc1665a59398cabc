//! Tests for the top-level encode and decode entry points.

use std::collections::BTreeMap;

use proptest::{
    arbitrary::Arbitrary,
    prop_assert, prop_assert_eq, proptest,
    strategy::{BoxedStrategy, Strategy},
    test_runner::TestCaseResult,
};

use crate::{Config, Error, Record, Shape};

fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct Inventory {
    owner: String,
    counts: BTreeMap<String, u32>,
    tags: Vec<(i16, char)>,
    weights: [i64; 3],
    enabled: bool,
    #[gensenc(skip)]
    dirty: bool,
}

impl Arbitrary for Inventory {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
        (
            ".*",
            proptest::collection::btree_map(
                ".{0,8}",
                proptest::num::u32::ANY,
                0..8,
            ),
            proptest::collection::vec(
                (proptest::num::i16::ANY, proptest::char::any()),
                0..8,
            ),
            proptest::array::uniform3(proptest::num::i64::ANY),
            proptest::bool::ANY,
        )
            .prop_map(|(owner, counts, tags, weights, enabled)| Self {
                owner,
                counts,
                tags,
                weights,
                enabled,
                dirty: false,
            })
            .boxed()
    }
}

fn check_round_trip_impl(inventory: &Inventory) -> TestCaseResult {
    let bytes = crate::encode(inventory).unwrap();

    let mut target = Inventory { dirty: true, ..Inventory::default() };
    crate::decode(&bytes, &mut target).unwrap();

    prop_assert_eq!(&target, &Inventory { dirty: true, ..inventory.clone() });

    Ok(())
}

fn check_determinism_impl(inventory: &Inventory) -> TestCaseResult {
    prop_assert_eq!(
        crate::encode(inventory).unwrap(),
        crate::encode(inventory).unwrap()
    );

    Ok(())
}

proptest! {
    #[test]
    fn round_trip(
        inventory in Inventory::arbitrary()
    ) {
        check_round_trip_impl(&inventory)?;
    }

    #[test]
    fn encoding_is_deterministic(
        inventory in Inventory::arbitrary()
    ) {
        check_determinism_impl(&inventory)?;
    }

    #[test]
    fn truncated_input_never_panics(
        inventory in Inventory::arbitrary(),
        cut in proptest::num::usize::ANY,
    ) {
        let bytes = crate::encode(&inventory).unwrap();
        let cut = cut % bytes.len().max(1);

        let result = crate::decode_default::<Inventory>(&bytes[..cut]);
        prop_assert!(
            result.is_err(),
            "decoding {} of {} bytes succeeded",
            cut,
            bytes.len()
        );
    }
}

#[test]
fn trailing_bytes() {
    init_logger();

    let mut bytes = crate::encode(&5u8).unwrap();
    bytes.push(0xAA);

    // tolerated unless the configuration says otherwise
    assert_eq!(crate::decode_default::<u8>(&bytes).unwrap(), 5);

    let config = Config::builder().reject_trailing_bytes(true).build();
    let mut target = 0u8;

    assert!(matches!(
        crate::decode_with(&bytes, &mut target, config),
        Err(Error::TrailingBytes { remaining: 1 })
    ));
}

#[test]
fn decode_default() {
    init_logger();

    let bytes = crate::encode(&vec!["a".to_string(), "b".to_string()]).unwrap();

    assert_eq!(crate::decode_default::<Vec<String>>(&bytes).unwrap(), [
        "a", "b"
    ]);
    assert!(matches!(
        crate::decode_default::<Vec<String>>(&bytes[..bytes.len() - 1]),
        Err(Error::EndOfStream)
    ));
}

#[test]
fn shape_of() {
    assert_eq!(crate::shape_of("x"), Shape::String);
    assert_eq!(crate::shape_of(&String::new()), Shape::String);
    assert_eq!(crate::shape_of(&Inventory::default()), Shape::Record);
    assert_eq!(crate::shape_of(&[1u8, 2]), Shape::FixedSequence);
    assert_eq!(crate::shape_of(&[1u8, 2][..]), Shape::VariableSequence);
    assert_eq!(crate::shape_of(&Box::new(1u8)), Shape::Indirection);
    assert_eq!(crate::shape_of(&1.0f32), Shape::Other);
}

#[test]
fn depth_limit_applies_to_entry_points() {
    init_logger();

    let config = Config::builder().max_depth(Some(1)).build();

    assert!(crate::encode_with(&1u8, config).is_ok());
    assert!(matches!(
        crate::encode_with(&(1u8,), config),
        Err(Error::TooDeeplyNested { limit: 1 })
    ));

    let bytes = crate::encode(&(1u8,)).unwrap();
    let mut target = (0u8,);

    assert!(matches!(
        crate::decode_with(&bytes, &mut target, config),
        Err(Error::TooDeeplyNested { limit: 1 })
    ));
}
