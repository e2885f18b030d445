//! Field accessors: composable descriptors that read, write, and stringify
//! fields of packed binary records.
//!
//! An accessor is built once, is immutable afterwards, and can be applied to
//! any number of records. Records are plain byte buffers owned by the caller;
//! the engine never retains them past a single call.

mod bit_field;
mod constant;
mod field;
mod flex_array;

#[cfg(test)]
mod tests;

pub use bit_field::{BitField, BoolField};
pub use constant::Constant;
pub use field::Field;
pub use flex_array::FlexArrayField;

use std::io;
use std::sync::Arc;

// ─── Accessor contract ──────────────────────────────────────────────────────

/// Read/write access to one field of a record.
///
/// `set` returns the accessor handle so calls can be chained. Accessors do
/// not synchronize the record: concurrent `get`/`set` on the same buffer
/// must be serialized by the caller.
pub trait Lens {
    type Value;

    fn get(&self, rec: &[u8]) -> Self::Value;

    fn set(&self, rec: &mut [u8], value: Self::Value) -> &Self;
}

/// An accessor with an immutable, non-empty display name.
pub trait Named {
    fn name(&self) -> &str;
}

// ─── Formatting ─────────────────────────────────────────────────────────────

/// Custom formatter: receives the whole record plus the extracted value and
/// returns the final string, replacing the default `"<name>: <value>"`.
pub type FormatFn<V> = Arc<dyn Fn(&[u8], &V) -> String + Send + Sync>;

/// A type-erased format thunk: anything that can render itself against a
/// record. Every named accessor implements this, so heterogeneous accessors
/// can be collected into one ordered list.
pub trait Render {
    fn render(&self, rec: &[u8]) -> String;
}

/// Writes each accessor's rendering to `out`, one per line, preserving the
/// caller-supplied order exactly.
pub fn print_fields<W: io::Write + ?Sized>(
    out: &mut W,
    rec: &[u8],
    fields: &[&dyn Render],
) -> io::Result<()> {
    for field in fields {
        writeln!(out, "{}", field.render(rec))?;
    }
    Ok(())
}
