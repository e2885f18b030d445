//! JSON-deserializable layout descriptions.
//!
//! These types describe the shape of a packed record — scalar fields, bit
//! sub-fields, flags, and a trailing flexible array — and compile into a
//! [`FieldGroup`] of ready-to-use accessors. They are intended to be loaded
//! from a layout file shipped with an application, so every problem is
//! reported as a [`SchemaError`] rather than a panic.
//!
//! Bit sub-fields and count references name a previously declared unsigned
//! scalar field; nesting bit fields inside bit fields is only available
//! through the typed API.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::group::FieldGroup;
use crate::lens::{BitField, BoolField, Constant, Field, FlexArrayField, Lens, Render};
use crate::scalar::{Count, Endian, Scalar};

// ─── Definitions ────────────────────────────────────────────────────────────

/// Top-level layout: an ordered list of field definitions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayoutDef {
    pub fields: Vec<FieldDef>,
}

/// One field of the layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldDef {
    /// Display name; must be unique within the layout.
    pub name: SmolStr,
    pub kind: FieldKindDef,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum FieldKindDef {
    /// Plain value at a byte offset.
    Scalar {
        offset: usize,
        value: WireTypeDef,
        #[serde(default)]
        endian: EndianDef,
    },
    /// Sub-range of bits within a declared unsigned scalar field.
    Bits {
        parent: SmolStr,
        bit_offset: u32,
        bit_width: u32,
    },
    /// Single bit within a declared unsigned scalar field.
    Flag { parent: SmolStr, bit_pos: u32 },
    /// Variable-length trailing array.
    Array {
        offset: usize,
        element: WireTypeDef,
        #[serde(default)]
        endian: EndianDef,
        count: CountDef,
        /// Baseline subtracted from the stored count.
        #[serde(default)]
        min_count: usize,
    },
}

/// Wire type of a scalar field or array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum WireTypeDef {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl WireTypeDef {
    /// Bit width for types usable as bit-field parents or counts.
    fn unsigned_bits(self) -> Option<u32> {
        match self {
            WireTypeDef::U8 => Some(8),
            WireTypeDef::U16 => Some(16),
            WireTypeDef::U32 => Some(32),
            WireTypeDef::U64 => Some(64),
            _ => None,
        }
    }
}

/// Byte order of a field; defaults to the host order.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub enum EndianDef {
    #[default]
    Native,
    Little,
    Big,
}

impl EndianDef {
    fn resolve(self) -> Endian {
        match self {
            EndianDef::Native => Endian::NATIVE,
            EndianDef::Little => Endian::Little,
            EndianDef::Big => Endian::Big,
        }
    }
}

/// Where an array's element count comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum CountDef {
    /// A declared unsigned scalar field.
    Field(SmolStr),
    /// A fixed count not stored in the record.
    Fixed(usize),
}

// ─── Compilation ────────────────────────────────────────────────────────────

type Thunk = Box<dyn Render + Send + Sync>;

/// A resolved reference to a declared scalar field.
#[derive(Clone, Copy)]
struct ScalarRef {
    offset: usize,
    value: WireTypeDef,
    endian: Endian,
}

enum RefErr {
    Unknown,
    NotScalar,
}

impl LayoutDef {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(|err| SchemaError::Json(err.to_string()))
    }

    /// Resolves references, validates every definition, and materializes the
    /// accessors.
    pub fn compile(&self) -> Result<FieldGroup, SchemaError> {
        let mut by_name: FxHashMap<&str, &FieldDef> = FxHashMap::default();
        for def in &self.fields {
            if def.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if by_name.insert(def.name.as_str(), def).is_some() {
                return Err(SchemaError::DuplicateField(def.name.to_string()));
            }
        }

        let mut builder = FieldGroup::builder();
        for def in &self.fields {
            builder = builder.push_boxed(def.name.clone(), compile_field(def, &by_name)?);
        }
        builder.build()
    }
}

impl FieldGroup {
    /// Parses a JSON layout description and compiles it in one step.
    pub fn from_json(json: &str) -> Result<FieldGroup, SchemaError> {
        LayoutDef::from_json(json)?.compile()
    }
}

fn scalar_ref(name: &str, by_name: &FxHashMap<&str, &FieldDef>) -> Result<ScalarRef, RefErr> {
    let def = by_name.get(name).ok_or(RefErr::Unknown)?;
    match &def.kind {
        FieldKindDef::Scalar {
            offset,
            value,
            endian,
        } => Ok(ScalarRef {
            offset: *offset,
            value: *value,
            endian: endian.resolve(),
        }),
        _ => Err(RefErr::NotScalar),
    }
}

fn compile_field(def: &FieldDef, by_name: &FxHashMap<&str, &FieldDef>) -> Result<Thunk, SchemaError> {
    match &def.kind {
        FieldKindDef::Scalar {
            offset,
            value,
            endian,
        } => Ok(scalar_thunk(&def.name, *offset, *value, endian.resolve())),

        FieldKindDef::Bits {
            parent,
            bit_offset,
            bit_width,
        } => {
            let parent_ref = scalar_ref(parent, by_name).map_err(|err| match err {
                RefErr::Unknown => SchemaError::UnknownParent(parent.to_string()),
                RefErr::NotScalar => SchemaError::BadParentField(parent.to_string()),
            })?;
            bits_thunk(&def.name, parent, parent_ref, *bit_offset, *bit_width)
        }

        FieldKindDef::Flag { parent, bit_pos } => {
            let parent_ref = scalar_ref(parent, by_name).map_err(|err| match err {
                RefErr::Unknown => SchemaError::UnknownParent(parent.to_string()),
                RefErr::NotScalar => SchemaError::BadParentField(parent.to_string()),
            })?;
            flag_thunk(&def.name, parent, parent_ref, *bit_pos)
        }

        FieldKindDef::Array {
            offset,
            element,
            endian,
            count,
            min_count,
        } => match count {
            CountDef::Fixed(n) => Ok(array_thunk(
                &def.name,
                *offset,
                *element,
                endian.resolve(),
                Constant::new(*n),
                *min_count,
            )),
            CountDef::Field(count_name) => {
                let count_ref = scalar_ref(count_name, by_name).map_err(|err| match err {
                    RefErr::Unknown => SchemaError::UnknownCountField(count_name.to_string()),
                    RefErr::NotScalar => SchemaError::BadCountField(count_name.to_string()),
                })?;
                if count_ref.value.unsigned_bits().is_none() {
                    return Err(SchemaError::BadCountField(count_name.to_string()));
                }
                Ok(match count_ref.value {
                    WireTypeDef::U8 => array_thunk(
                        &def.name,
                        *offset,
                        *element,
                        endian.resolve(),
                        Field::<u8>::new(count_name.clone(), count_ref.offset)
                            .with_endian(count_ref.endian),
                        *min_count,
                    ),
                    WireTypeDef::U16 => array_thunk(
                        &def.name,
                        *offset,
                        *element,
                        endian.resolve(),
                        Field::<u16>::new(count_name.clone(), count_ref.offset)
                            .with_endian(count_ref.endian),
                        *min_count,
                    ),
                    WireTypeDef::U32 => array_thunk(
                        &def.name,
                        *offset,
                        *element,
                        endian.resolve(),
                        Field::<u32>::new(count_name.clone(), count_ref.offset)
                            .with_endian(count_ref.endian),
                        *min_count,
                    ),
                    WireTypeDef::U64 => array_thunk(
                        &def.name,
                        *offset,
                        *element,
                        endian.resolve(),
                        Field::<u64>::new(count_name.clone(), count_ref.offset)
                            .with_endian(count_ref.endian),
                        *min_count,
                    ),
                    _ => unreachable!(),
                })
            }
        },
    }
}

fn scalar_thunk(name: &SmolStr, offset: usize, value: WireTypeDef, endian: Endian) -> Thunk {
    fn make<T: Scalar>(name: &SmolStr, offset: usize, endian: Endian) -> Thunk {
        Box::new(Field::<T>::new(name.clone(), offset).with_endian(endian))
    }
    match value {
        WireTypeDef::U8 => make::<u8>(name, offset, endian),
        WireTypeDef::U16 => make::<u16>(name, offset, endian),
        WireTypeDef::U32 => make::<u32>(name, offset, endian),
        WireTypeDef::U64 => make::<u64>(name, offset, endian),
        WireTypeDef::I8 => make::<i8>(name, offset, endian),
        WireTypeDef::I16 => make::<i16>(name, offset, endian),
        WireTypeDef::I32 => make::<i32>(name, offset, endian),
        WireTypeDef::I64 => make::<i64>(name, offset, endian),
        WireTypeDef::F32 => make::<f32>(name, offset, endian),
        WireTypeDef::F64 => make::<f64>(name, offset, endian),
    }
}

fn bits_thunk(
    name: &SmolStr,
    parent_name: &SmolStr,
    parent: ScalarRef,
    bit_offset: u32,
    bit_width: u32,
) -> Result<Thunk, SchemaError> {
    let parent_bits = parent
        .value
        .unsigned_bits()
        .ok_or_else(|| SchemaError::BadParentField(parent_name.to_string()))?;
    if bit_width == 0 {
        return Err(SchemaError::ZeroBitWidth);
    }
    if bit_offset as u64 + bit_width as u64 > parent_bits as u64 {
        return Err(SchemaError::BitRangeOverflow {
            offset: bit_offset,
            width: bit_width,
            bits: parent_bits,
        });
    }
    Ok(match parent.value {
        WireTypeDef::U8 => Box::new(BitField::<Field<u8>, u8>::new(
            name.clone(),
            Field::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_offset,
            bit_width,
        )),
        WireTypeDef::U16 => Box::new(BitField::<Field<u16>, u16>::new(
            name.clone(),
            Field::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_offset,
            bit_width,
        )),
        WireTypeDef::U32 => Box::new(BitField::<Field<u32>, u32>::new(
            name.clone(),
            Field::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_offset,
            bit_width,
        )),
        WireTypeDef::U64 => Box::new(BitField::<Field<u64>, u64>::new(
            name.clone(),
            Field::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_offset,
            bit_width,
        )),
        _ => unreachable!(),
    })
}

fn flag_thunk(
    name: &SmolStr,
    parent_name: &SmolStr,
    parent: ScalarRef,
    bit_pos: u32,
) -> Result<Thunk, SchemaError> {
    let parent_bits = parent
        .value
        .unsigned_bits()
        .ok_or_else(|| SchemaError::BadParentField(parent_name.to_string()))?;
    if bit_pos >= parent_bits {
        return Err(SchemaError::BitRangeOverflow {
            offset: bit_pos,
            width: 1,
            bits: parent_bits,
        });
    }
    Ok(match parent.value {
        WireTypeDef::U8 => Box::new(BoolField::new(
            name.clone(),
            Field::<u8>::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_pos,
        )),
        WireTypeDef::U16 => Box::new(BoolField::new(
            name.clone(),
            Field::<u16>::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_pos,
        )),
        WireTypeDef::U32 => Box::new(BoolField::new(
            name.clone(),
            Field::<u32>::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_pos,
        )),
        WireTypeDef::U64 => Box::new(BoolField::new(
            name.clone(),
            Field::<u64>::new(parent_name.clone(), parent.offset).with_endian(parent.endian),
            bit_pos,
        )),
        _ => unreachable!(),
    })
}

fn array_thunk<C>(
    name: &SmolStr,
    offset: usize,
    element: WireTypeDef,
    endian: Endian,
    count: C,
    min_count: usize,
) -> Thunk
where
    C: Lens + Send + Sync + 'static,
    C::Value: Count,
{
    fn make<E: Scalar, C>(
        name: &SmolStr,
        offset: usize,
        endian: Endian,
        count: C,
        min_count: usize,
    ) -> Thunk
    where
        C: Lens + Send + Sync + 'static,
        C::Value: Count,
    {
        Box::new(
            FlexArrayField::<E, C>::new(name.clone(), offset, count)
                .with_endian(endian)
                .with_min_count(min_count),
        )
    }
    match element {
        WireTypeDef::U8 => make::<u8, C>(name, offset, endian, count, min_count),
        WireTypeDef::U16 => make::<u16, C>(name, offset, endian, count, min_count),
        WireTypeDef::U32 => make::<u32, C>(name, offset, endian, count, min_count),
        WireTypeDef::U64 => make::<u64, C>(name, offset, endian, count, min_count),
        WireTypeDef::I8 => make::<i8, C>(name, offset, endian, count, min_count),
        WireTypeDef::I16 => make::<i16, C>(name, offset, endian, count, min_count),
        WireTypeDef::I32 => make::<i32, C>(name, offset, endian, count, min_count),
        WireTypeDef::I64 => make::<i64, C>(name, offset, endian, count, min_count),
        WireTypeDef::F32 => make::<f32, C>(name, offset, endian, count, min_count),
        WireTypeDef::F64 => make::<f64, C>(name, offset, endian, count, min_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::{Field, FlexArrayField, Lens};
    use crate::scalar::Endian;

    const PACKET_LAYOUT: &str = r#"{
        "fields": [
            {"name": "version", "kind": {"type": "Scalar", "offset": 0, "value": "U16"}},
            {"name": "major", "kind": {"type": "Bits", "parent": "version", "bit_offset": 8, "bit_width": 8}},
            {"name": "minor", "kind": {"type": "Bits", "parent": "version", "bit_offset": 0, "bit_width": 8}},
            {"name": "ready", "kind": {"type": "Flag", "parent": "version", "bit_pos": 0}},
            {"name": "count", "kind": {"type": "Scalar", "offset": 2, "value": "U8"}},
            {"name": "items", "kind": {"type": "Array", "offset": 3, "element": "U16", "endian": "Big", "count": {"Field": "count"}}}
        ]
    }"#;

    /// Matches PACKET_LAYOUT: version 0x1234, two big-endian u16 items.
    fn packet() -> Vec<u8> {
        let mut rec = vec![0u8; 3 + 2 * 4];
        Field::<u16>::new("version", 0).set(&mut rec, 0x1234);
        FlexArrayField::<u16, _>::new("items", 3, Field::<u8>::new("count", 2))
            .with_endian(Endian::Big)
            .set_all(&mut rec, &[10, 20], true);
        rec
    }

    #[test]
    fn test_compile_and_format() {
        let group = FieldGroup::from_json(PACKET_LAYOUT).unwrap();
        let rec = packet();
        assert_eq!(group.len(), 6);
        assert_eq!(group.format_field(&rec, "version").as_deref(), Some("version: 4660"));
        assert_eq!(group.format_field(&rec, "major").as_deref(), Some("major: 18"));
        assert_eq!(group.format_field(&rec, "minor").as_deref(), Some("minor: 52"));
        assert_eq!(group.format_field(&rec, "ready").as_deref(), Some("ready: false"));
        assert_eq!(group.format_field(&rec, "items").as_deref(), Some("items: [10, 20]"));
    }

    #[test]
    fn test_print_in_definition_order() {
        let group = FieldGroup::from_json(PACKET_LAYOUT).unwrap();
        let rec = packet();
        let mut out = Vec::new();
        group.print(&mut out, &rec).unwrap();
        let lines: Vec<_> = std::str::from_utf8(&out).unwrap().lines().collect();
        assert_eq!(
            lines,
            [
                "version: 4660",
                "major: 18",
                "minor: 52",
                "ready: false",
                "count: 2",
                "items: [10, 20]"
            ]
        );
    }

    #[test]
    fn test_fixed_count_array() {
        let layout = r#"{
            "fields": [
                {"name": "items", "kind": {"type": "Array", "offset": 0, "element": "U8", "count": {"Fixed": 3}}}
            ]
        }"#;
        let group = FieldGroup::from_json(layout).unwrap();
        assert_eq!(
            group.format_field(&[1u8, 2, 3, 4], "items").as_deref(),
            Some("items: [1, 2, 3]")
        );
    }

    #[test]
    fn test_array_with_baseline() {
        let layout = r#"{
            "fields": [
                {"name": "total", "kind": {"type": "Scalar", "offset": 0, "value": "U8"}},
                {"name": "extras", "kind": {"type": "Array", "offset": 1, "element": "U8", "count": {"Field": "total"}, "min_count": 2}}
            ]
        }"#;
        let group = FieldGroup::from_json(layout).unwrap();
        // Stored count 5, baseline 2: three addressable elements.
        let rec = [5u8, 11, 12, 13, 0xFF];
        assert_eq!(
            group.format_field(&rec, "extras").as_deref(),
            Some("extras: [11, 12, 13]")
        );
    }

    #[test]
    fn test_roundtrip_through_serde() {
        let layout = LayoutDef::from_json(PACKET_LAYOUT).unwrap();
        let json = serde_json::to_string(&layout).unwrap();
        let reparsed = LayoutDef::from_json(&json).unwrap();
        assert_eq!(reparsed.fields.len(), layout.fields.len());
        reparsed.compile().unwrap();
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let layout = r#"{
            "fields": [
                {"name": "major", "kind": {"type": "Bits", "parent": "version", "bit_offset": 8, "bit_width": 8}}
            ]
        }"#;
        let err = FieldGroup::from_json(layout).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent(name) if name == "version"));
    }

    #[test]
    fn test_signed_parent_rejected() {
        let layout = r#"{
            "fields": [
                {"name": "raw", "kind": {"type": "Scalar", "offset": 0, "value": "I16"}},
                {"name": "low", "kind": {"type": "Bits", "parent": "raw", "bit_offset": 0, "bit_width": 4}}
            ]
        }"#;
        let err = FieldGroup::from_json(layout).unwrap_err();
        assert!(matches!(err, SchemaError::BadParentField(name) if name == "raw"));
    }

    #[test]
    fn test_bit_range_overflow_rejected() {
        let layout = r#"{
            "fields": [
                {"name": "b", "kind": {"type": "Scalar", "offset": 0, "value": "U8"}},
                {"name": "wide", "kind": {"type": "Bits", "parent": "b", "bit_offset": 4, "bit_width": 8}}
            ]
        }"#;
        let err = FieldGroup::from_json(layout).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::BitRangeOverflow {
                offset: 4,
                width: 8,
                bits: 8
            }
        ));
    }

    #[test]
    fn test_float_count_field_rejected() {
        let layout = r#"{
            "fields": [
                {"name": "count", "kind": {"type": "Scalar", "offset": 0, "value": "F64"}},
                {"name": "items", "kind": {"type": "Array", "offset": 8, "element": "U8", "count": {"Field": "count"}}}
            ]
        }"#;
        let err = FieldGroup::from_json(layout).unwrap_err();
        assert!(matches!(err, SchemaError::BadCountField(name) if name == "count"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let layout = r#"{
            "fields": [
                {"name": "x", "kind": {"type": "Scalar", "offset": 0, "value": "U8"}},
                {"name": "x", "kind": {"type": "Scalar", "offset": 1, "value": "U8"}}
            ]
        }"#;
        let err = FieldGroup::from_json(layout).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(name) if name == "x"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            FieldGroup::from_json("not json").unwrap_err(),
            SchemaError::Json(_)
        ));
    }
}
