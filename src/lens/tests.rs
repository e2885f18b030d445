//! End-to-end tests over a realistic packet layout.
//!
//! Layout (byte offsets):
//!
//! ```text
//! 0   version    u16            major in the high byte, minor in the low
//! 2   type       [u8; 4]
//! 6   item_count u64            stored opposite to the host byte order
//! 14  items      u32 × N        trailing flexible region
//! ```

use super::*;
use crate::scalar::Endian;

const VERSION_OFF: usize = 0;
const TYPE_OFF: usize = 2;
const COUNT_OFF: usize = 6;
const ITEMS_OFF: usize = 14;
const MAX_ITEMS: usize = 10;

fn version() -> Field<u16> {
    Field::new("The version", VERSION_OFF)
}

fn type_tag() -> Field<[u8; 4]> {
    Field::new("The type", TYPE_OFF)
        .with_formatter(|_rec, tag: &[u8; 4]| String::from_utf8_lossy(tag).into_owned())
}

fn item_count() -> Field<u64> {
    Field::new("The number of items", COUNT_OFF).with_endian(Endian::NATIVE.opposite())
}

fn major_version() -> BitField<Field<u16>, u8> {
    BitField::new("The major version", version(), 8, 8)
}

fn minor_version() -> BitField<Field<u16>, u8> {
    BitField::new("The minor version", version(), 0, 8)
}

fn first_version_bit() -> BoolField<Field<u16>> {
    BoolField::new("Whether the first version bit is set", version(), 0)
}

fn items() -> FlexArrayField<u32, Field<u64>> {
    FlexArrayField::new("Items", ITEMS_OFF, item_count())
}

/// A fully initialized packet: version 0x1234, type `b"type"`, ten items
/// counting up from 100.
fn packet() -> Vec<u8> {
    let mut rec = vec![0u8; ITEMS_OFF + MAX_ITEMS * 4];
    version().set(&mut rec, 0x1234);
    type_tag().set(&mut rec, *b"type");
    let values: Vec<u32> = (0..MAX_ITEMS as u32).map(|i| 100 + i).collect();
    items().set_all(&mut rec, &values, true);
    rec
}

#[test]
fn test_get_every_field() {
    let rec = packet();
    assert_eq!(version().get(&rec), 0x1234);
    assert_eq!(type_tag().get(&rec), *b"type");
    assert_eq!(item_count().get(&rec), MAX_ITEMS as u64);
    assert_eq!(major_version().get(&rec), 0x12);
    assert_eq!(minor_version().get(&rec), 0x34);
    assert!(!first_version_bit().get(&rec));
    assert_eq!(items().get_at(&rec, 0), 100);
    assert_eq!(items().get_all(&rec).len(), MAX_ITEMS);
}

#[test]
fn test_opposite_endian_count_raw_bytes() {
    let rec = packet();
    let raw: [u8; 8] = rec[COUNT_OFF..COUNT_OFF + 8].try_into().unwrap();
    let expected = match Endian::NATIVE {
        Endian::Little => (MAX_ITEMS as u64).to_be_bytes(),
        Endian::Big => (MAX_ITEMS as u64).to_le_bytes(),
    };
    assert_eq!(raw, expected);
}

#[test]
fn test_set_minor_version_produces_0x12aa() {
    let mut rec = packet();
    minor_version().set(&mut rec, 0xAA);
    assert_eq!(version().get(&rec), 0x12AA);
    assert_eq!(major_version().get(&rec), 0x12);
    // Neighbouring fields are untouched.
    assert_eq!(type_tag().get(&rec), *b"type");
    assert_eq!(item_count().get(&rec), MAX_ITEMS as u64);
}

#[test]
fn test_major_then_minor_combine() {
    let mut rec = packet();
    version().set(&mut rec, 0);
    major_version().set(&mut rec, 0xFF);
    minor_version().set(&mut rec, 0xAA);
    assert_eq!(version().get(&rec), 0xFFAA);
}

#[test]
fn test_staged_item_update() {
    let mut rec = packet();
    let fresh = [7u32, 8, 9];

    // Elements first, count untouched: the record is transiently stale.
    items().set_all(&mut rec, &fresh, false);
    assert_eq!(item_count().get(&rec), MAX_ITEMS as u64);

    // Count second: the record is consistent again.
    items().set_all(&mut rec, &fresh, true);
    assert_eq!(item_count().get(&rec), 3);
    assert_eq!(items().get_all(&rec), vec![7, 8, 9]);
}

#[test]
fn test_fixed_count_variant() {
    // Same region viewed with a compile-time-known length.
    let fixed = FlexArrayField::<u32, _>::new("Items", ITEMS_OFF, Constant::new(MAX_ITEMS));
    let rec = packet();
    assert_eq!(fixed.get_all(&rec), items().get_all(&rec));
}

#[test]
fn test_round_trip_through_count_accessor() {
    let mut rec = packet();
    item_count().set(&mut rec, 4);
    assert_eq!(items().len(&rec), 4);
    assert_eq!(items().get_all(&rec), vec![100, 101, 102, 103]);
}

#[test]
fn test_formatting() {
    let rec = packet();
    assert_eq!(
        item_count().format(&rec),
        format!("The number of items: {MAX_ITEMS}")
    );
    assert_eq!(type_tag().format(&rec), "type");
    assert_eq!(minor_version().format(&rec), "The minor version: 52");
}

#[test]
fn test_formatter_can_combine_sibling_fields() {
    let rec = packet();
    let styled = BitField::<_, u8>::new("The minor version", version(), 0, 8)
        .with_formatter(|rec, value| {
            let tag = type_tag().get(rec);
            format!("{}: v{value}", String::from_utf8_lossy(&tag))
        });
    assert_eq!(styled.format(&rec), "type: v52");
}

#[test]
fn test_print_fields_preserves_order() {
    let rec = packet();
    let count = item_count();
    let minor = minor_version();
    let flex = items();
    let fields: [&dyn Render; 3] = [&count, &minor, &flex];

    let mut out = Vec::new();
    print_fields(&mut out, &rec, &fields).unwrap();

    let expected = format!(
        "{}\n{}\n{}\n",
        count.format(&rec),
        minor.format(&rec),
        flex.format(&rec)
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_accessors_are_reusable_across_records() {
    let field = version();
    let mut a = packet();
    let mut b = packet();
    field.set(&mut a, 1);
    field.set(&mut b, 2);
    assert_eq!(field.get(&a), 1);
    assert_eq!(field.get(&b), 2);
}

#[test]
fn test_accessors_are_shareable_across_threads() {
    let field = std::sync::Arc::new(version());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let field = field.clone();
            std::thread::spawn(move || {
                let mut rec = vec![0u8; 2];
                field.set(&mut rec, i);
                field.get(&rec)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i as u16);
    }
}
