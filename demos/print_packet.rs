//! Builds a small packet in memory and prints it through a layout compiled
//! from JSON.

use rawlens::{Endian, Field, FieldGroup, FlexArrayField, Lens};

const LAYOUT: &str = r#"{
    "fields": [
        {"name": "version", "kind": {"type": "Scalar", "offset": 0, "value": "U16"}},
        {"name": "major", "kind": {"type": "Bits", "parent": "version", "bit_offset": 8, "bit_width": 8}},
        {"name": "minor", "kind": {"type": "Bits", "parent": "version", "bit_offset": 0, "bit_width": 8}},
        {"name": "urgent", "kind": {"type": "Flag", "parent": "version", "bit_pos": 15}},
        {"name": "count", "kind": {"type": "Scalar", "offset": 2, "value": "U16", "endian": "Big"}},
        {"name": "items", "kind": {"type": "Array", "offset": 4, "element": "U32", "endian": "Big", "count": {"Field": "count"}}}
    ]
}"#;

fn main() {
    let group = FieldGroup::from_json(LAYOUT).expect("layout is well-formed");

    let mut rec = vec![0u8; 4 + 3 * 4];
    Field::<u16>::new("version", 0).set(&mut rec, 0x0207);
    FlexArrayField::<u32, _>::new(
        "items",
        4,
        Field::<u16>::new("count", 2).with_endian(Endian::Big),
    )
    .with_endian(Endian::Big)
    .set_all(&mut rec, &[100, 200, 300], true);

    let mut stdout = std::io::stdout();
    group.print(&mut stdout, &rec).expect("stdout is writable");
}
