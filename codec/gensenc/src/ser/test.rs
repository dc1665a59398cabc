//! Tests for the encoder.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
    sync::Arc,
};

use super::{Encode, Encoder};
use crate::{config::Config, error::Error};

/// Encodes the value with the given configuration and returns the bytes.
fn encode_with_config<T: Encode + ?Sized>(
    value: &T,
    config: Config,
) -> Result<Vec<u8>, Error> {
    let mut encoder = Encoder::with_config(Vec::new(), config);
    encoder.encode(value)?;

    Ok(encoder.into_inner())
}

fn encode<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    encode_with_config(value, Config::default()).unwrap()
}

fn string_frame(value: &str) -> Vec<u8> {
    let mut bytes = (value.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

#[test]
fn string() {
    assert_eq!(encode("ab"), [2, 0, 0, 0, 0, 0, 0, 0, 0x61, 0x62]);
    assert_eq!(encode(&String::from("ab")), encode("ab"));
    assert_eq!(encode(""), [0; 8]);
}

#[test]
fn integers_are_widened_to_eight_bytes() {
    assert_eq!(encode(&5u8), [5, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(encode(&5u16), encode(&5u8));
    assert_eq!(encode(&5usize), encode(&5u64));

    assert_eq!(encode(&-1i8), [0xFF; 8]);
    assert_eq!(encode(&-1i32), (-1i64).to_le_bytes());
    assert_eq!(encode(&i16::MIN), i64::from(i16::MIN).to_le_bytes());
}

#[test]
fn other_scalars_keep_native_width() {
    assert_eq!(encode(&true), [1]);
    assert_eq!(encode(&false), [0]);
    assert_eq!(encode(&'a'), 97u32.to_le_bytes());
    assert_eq!(encode(&1.5f32), 1.5f32.to_le_bytes());
    assert_eq!(encode(&-2.25f64), (-2.25f64).to_le_bytes());
    assert_eq!(encode(&u128::MAX), [0xFF; 16]);
    assert_eq!(encode(&-2i128), (-2i128).to_le_bytes());
}

#[test]
fn variable_sequence() {
    let bytes = encode(&vec![1i32, -1, 1000]);

    let mut expected = 3u64.to_le_bytes().to_vec();
    expected.extend_from_slice(&1i64.to_le_bytes());
    expected.extend_from_slice(&(-1i64).to_le_bytes());
    expected.extend_from_slice(&1000i64.to_le_bytes());

    assert_eq!(bytes, expected);
    assert_eq!(encode(&[1i32, -1, 1000][..]), expected);
    assert_eq!(encode(&Vec::<u8>::new()), [0; 8]);
}

#[test]
fn sets_are_variable_sequences() {
    let set = [3u8, 1, 2].into_iter().collect::<BTreeSet<_>>();

    assert_eq!(encode(&set), encode(&vec![1u8, 2, 3]));
}

#[test]
fn fixed_sequence_has_no_count() {
    let bytes = encode(&[7u8, 8]);

    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..8], 7u64.to_le_bytes());
    assert_eq!(&bytes[8..], 8u64.to_le_bytes());
    assert!(encode(&[0u8; 0]).is_empty());
}

#[test]
fn tuple_is_record() {
    let bytes = encode(&(1u8, "x".to_string(), true));

    let mut expected = 1u64.to_le_bytes().to_vec();
    expected.extend(string_frame("x"));
    expected.push(1);

    assert_eq!(bytes, expected);
    assert!(encode(&()).is_empty());
}

#[test]
fn mapping_with_one_pair() {
    let map = HashMap::from([("k".to_string(), 1i32)]);

    let mut expected = 1u64.to_le_bytes().to_vec();
    expected.extend(string_frame("k"));
    expected.extend_from_slice(&1i64.to_le_bytes());

    assert_eq!(encode(&map), expected);
}

#[test]
fn mapping_pairs_in_any_order() {
    let map = HashMap::from([(1u8, 10u8), (2u8, 20u8)]);
    let bytes = encode(&map);

    assert_eq!(&bytes[..8], 2u64.to_le_bytes());

    let first = [encode(&1u8), encode(&10u8)].concat();
    let second = [encode(&2u8), encode(&20u8)].concat();

    let pairs = &bytes[8..];
    assert!(
        pairs == [first.clone(), second.clone()].concat()
            || pairs == [second, first].concat()
    );
}

#[test]
fn sorted_mapping_is_deterministic() {
    let config = Config::builder().sort_map_keys(true).build();
    let map = HashMap::from([
        ("b".to_string(), 2u8),
        ("c".to_string(), 3u8),
        ("a".to_string(), 1u8),
    ]);

    let sorted = map.iter().collect::<BTreeMap<_, _>>();

    let bytes = encode_with_config(&map, config).unwrap();
    assert_eq!(bytes, encode(&sorted));
    assert_eq!(bytes, encode_with_config(&map, config).unwrap());
}

#[test]
fn indirections_are_transparent() {
    let value = "hi".to_string();
    let expected = encode(&value);

    assert_eq!(encode(&&value), expected);
    assert_eq!(encode(&Box::new(value.clone())), expected);
    assert_eq!(encode(&Rc::new(value.clone())), expected);
    assert_eq!(encode(&Arc::new(value.clone())), expected);
    assert_eq!(encode(&Some(value.clone())), expected);
    assert_eq!(encode(&Some(Box::new(&value))), expected);
}

#[test]
fn absent_indirection() {
    let result = encode_with_config(&None::<u8>, Config::default());
    assert!(matches!(result, Err(Error::AbsentIndirection)));

    let result =
        encode_with_config(&vec![Some(1u8), None], Config::default());
    assert!(matches!(result, Err(Error::AbsentIndirection)));
}

#[test]
fn depth_limit() {
    let value = vec![vec![vec![1u8]]];

    // three sequences and the integer occupy four levels
    let config = Config::builder().max_depth(Some(4)).build();
    assert!(encode_with_config(&value, config).is_ok());

    let config = Config::builder().max_depth(Some(3)).build();
    assert!(matches!(
        encode_with_config(&value, config),
        Err(Error::TooDeeplyNested { limit: 3 })
    ));

    let config = Config::builder().max_depth(None).build();
    assert!(encode_with_config(&value, config).is_ok());
}

#[test]
fn depth_is_restored_after_each_value() {
    let config = Config::builder().max_depth(Some(2)).build();
    let mut encoder = Encoder::with_config(Vec::new(), config);

    for _ in 0..10 {
        encoder.encode(&vec![1u8]).unwrap();
    }

    assert_eq!(encoder.writer().len(), 10 * 16);
}

#[test]
fn writer_failure_passes_through() {
    let mut buffer = [0u8; 4];
    let mut encoder = Encoder::new(&mut buffer[..]);

    assert!(matches!(encoder.encode(&1u64), Err(Error::Io(_))));
}

#[test]
fn counts_come_from_the_iterator() {
    let mut encoder = Encoder::new(Vec::new());
    encoder.emit_variable_sequence([1u8, 2, 3].iter().skip(1)).unwrap();

    let bytes = encoder.into_inner();
    assert_eq!(bytes, encode(&vec![2u8, 3]));

    let map = BTreeMap::from([(1u8, 10u8), (2, 20), (3, 30)]);

    let mut encoder = Encoder::new(Vec::new());
    encoder.emit_mapping(map.iter().take(2)).unwrap();

    let bytes = encoder.into_inner();
    assert_eq!(bytes, encode(&BTreeMap::from([(1u8, 10u8), (2, 20)])));
}

struct Celsius {
    degrees: i16,
    label: &'static str,
}

impl crate::shape::Reflect for Celsius {
    const SHAPE: crate::Shape = crate::Shape::Record;
}

impl crate::shape::Record for Celsius {
    const FIELDS: &'static [crate::Field] = &[
        crate::Field::new("degrees", crate::Visibility::Introspectable),
        crate::Field::new("label", crate::Visibility::Hidden),
    ];
}

impl Encode for Celsius {
    fn encode<W: std::io::Write>(
        &self,
        encoder: &mut Encoder<W>,
    ) -> Result<(), Error> {
        encoder.emit_record::<Self>(|mut record| {
            record.field("degrees", &self.degrees)?;
            record.skip("label");
            Ok(())
        })
    }
}

#[test]
fn hand_written_record() {
    let value = Celsius { degrees: -40, label: "cold" };

    assert_eq!(value.label, "cold");
    assert_eq!(encode(&value), (-40i64).to_le_bytes());
}
