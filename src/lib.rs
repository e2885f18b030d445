//! Field accessors for packed binary records.
//!
//! A record is a byte buffer with a fixed layout: plain values, bit-packed
//! sub-fields, byte-order-sensitive integers, and optionally one trailing
//! variable-length array whose element count is stored elsewhere in the same
//! record. This crate provides composable accessors ("lenses") over such
//! buffers so the offset/width/endian/count arithmetic lives in one
//! descriptor instead of at every call site.
//!
//! ```
//! use rawlens::{BitField, Field, FlexArrayField, Lens};
//!
//! // version u16 @ 0, count u8 @ 2, items u16 × N @ 3
//! let version = Field::<u16>::new("version", 0);
//! let minor = BitField::<_, u8>::new("minor", version.clone(), 0, 8);
//! let items = FlexArrayField::<u16, _>::new("items", 3, Field::<u8>::new("count", 2));
//!
//! let mut rec = vec![0u8; 3 + 2 * 4];
//! version.set(&mut rec, 0x1234);
//! items.set_all(&mut rec, &[10, 20], true);
//!
//! assert_eq!(minor.get(&rec), 0x34);
//! assert_eq!(items.get_all(&rec), vec![10, 20]);
//! assert_eq!(version.format(&rec), "version: 4660");
//! ```
//!
//! Accessors are immutable after construction and safe to share across
//! threads; records are never synchronized by the crate. Contract
//! violations — short buffers, out-of-range bit ranges or positions, a
//! stored count below its baseline — panic with a diagnosable message.
//! The only fallible surfaces are [`FieldGroup`] construction and
//! [`LayoutDef`] compilation, which consume external descriptions and
//! report [`SchemaError`]s.

pub mod bits;
pub mod error;
pub mod group;
pub mod layout;
pub mod lens;
pub mod scalar;

pub use error::SchemaError;
pub use group::{FieldGroup, GroupBuilder, MAX_FIELDS};
pub use layout::{CountDef, EndianDef, FieldDef, FieldKindDef, LayoutDef, WireTypeDef};
pub use lens::{
    BitField, BoolField, Constant, Field, FlexArrayField, FormatFn, Lens, Named, Render,
    print_fields,
};
pub use scalar::{BitStore, Count, Endian, Scalar};
