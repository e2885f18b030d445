use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{FormatFn, Lens, Named, Render};
use crate::bits;
use crate::scalar::BitStore;

// ─── BitField ───────────────────────────────────────────────────────────────

/// A sub-range of bits within a parent accessor's integral value.
///
/// `bit_offset` is measured from the least significant bit of the parent's
/// value after byte-order normalization, so the same bit numbering applies
/// regardless of how the parent is stored. The parent may be a [`Field`],
/// another `BitField`, or a [`Constant`].
///
/// `set` reads the parent, overwrites only the target range, and writes the
/// whole parent value back. Interleaved writes to sibling bit fields sharing
/// one parent are therefore not atomic with respect to each other.
///
/// [`Field`]: super::Field
/// [`Constant`]: super::Constant
pub struct BitField<P, T> {
    name: SmolStr,
    parent: P,
    bit_offset: u32,
    bit_width: u32,
    formatter: Option<FormatFn<T>>,
    _target: PhantomData<fn() -> T>,
}

impl<P, T> BitField<P, T>
where
    P: Lens,
    P::Value: BitStore,
    T: BitStore,
{
    /// Creates a bit field covering `bit_width` bits starting at `bit_offset`
    /// of `parent`'s value. The range must fit both the parent's and the
    /// target type's width.
    pub fn new(name: impl Into<SmolStr>, parent: P, bit_offset: u32, bit_width: u32) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "field name must not be empty");
        assert!(bit_width >= 1, "bit field `{name}` must be at least one bit wide");
        assert!(
            bit_offset as u64 + bit_width as u64 <= P::Value::BITS as u64,
            "bit range {bit_offset}+{bit_width} of `{name}` exceeds the {}-bit parent",
            P::Value::BITS
        );
        assert!(
            bit_width <= T::BITS,
            "bit field `{name}` is wider than its {}-bit target type",
            T::BITS
        );
        BitField {
            name,
            parent,
            bit_offset,
            bit_width,
            formatter: None,
            _target: PhantomData,
        }
    }

    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&[u8], &T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn format(&self, rec: &[u8]) -> String {
        let value = self.get(rec);
        match &self.formatter {
            Some(formatter) => formatter(rec, &value),
            None => format!("{}: {value}", self.name),
        }
    }
}

impl<P, T> Lens for BitField<P, T>
where
    P: Lens,
    P::Value: BitStore,
    T: BitStore,
{
    type Value = T;

    #[inline]
    fn get(&self, rec: &[u8]) -> T {
        let parent = self.parent.get(rec).widen();
        T::narrow(bits::get_bits(parent, self.bit_offset, self.bit_width))
    }

    #[inline]
    fn set(&self, rec: &mut [u8], value: T) -> &Self {
        let parent = self.parent.get(rec).widen();
        let updated = bits::set_bits(parent, value.widen(), self.bit_offset, self.bit_width);
        self.parent.set(rec, P::Value::narrow(updated));
        self
    }
}

impl<P, T> Named for BitField<P, T> {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl<P, T> Render for BitField<P, T>
where
    P: Lens,
    P::Value: BitStore,
    T: BitStore,
{
    fn render(&self, rec: &[u8]) -> String {
        self.format(rec)
    }
}

impl<P: Clone, T> Clone for BitField<P, T> {
    fn clone(&self) -> Self {
        BitField {
            name: self.name.clone(),
            parent: self.parent.clone(),
            bit_offset: self.bit_offset,
            bit_width: self.bit_width,
            formatter: self.formatter.clone(),
            _target: PhantomData,
        }
    }
}

impl<P: fmt::Debug, T> fmt::Debug for BitField<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitField")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("bit_offset", &self.bit_offset)
            .field("bit_width", &self.bit_width)
            .finish()
    }
}

// ─── BoolField ──────────────────────────────────────────────────────────────

/// The single-bit specialization: one bit of a parent's value, read and
/// written as `bool`.
pub struct BoolField<P> {
    name: SmolStr,
    parent: P,
    bit_pos: u32,
    formatter: Option<FormatFn<bool>>,
}

impl<P> BoolField<P>
where
    P: Lens,
    P::Value: BitStore,
{
    pub fn new(name: impl Into<SmolStr>, parent: P, bit_pos: u32) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "field name must not be empty");
        assert!(
            bit_pos < P::Value::BITS,
            "bit position {bit_pos} of `{name}` exceeds the {}-bit parent",
            P::Value::BITS
        );
        BoolField {
            name,
            parent,
            bit_pos,
            formatter: None,
        }
    }

    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&[u8], &bool) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn format(&self, rec: &[u8]) -> String {
        let value = self.get(rec);
        match &self.formatter {
            Some(formatter) => formatter(rec, &value),
            None => format!("{}: {value}", self.name),
        }
    }
}

impl<P> Lens for BoolField<P>
where
    P: Lens,
    P::Value: BitStore,
{
    type Value = bool;

    #[inline]
    fn get(&self, rec: &[u8]) -> bool {
        bits::is_bit_set(self.parent.get(rec).widen(), self.bit_pos)
    }

    #[inline]
    fn set(&self, rec: &mut [u8], value: bool) -> &Self {
        let parent = self.parent.get(rec).widen();
        let updated = if value {
            bits::set_bit(parent, self.bit_pos)
        } else {
            bits::clear_bit(parent, self.bit_pos)
        };
        self.parent.set(rec, P::Value::narrow(updated));
        self
    }
}

impl<P> Named for BoolField<P> {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl<P> Render for BoolField<P>
where
    P: Lens,
    P::Value: BitStore,
{
    fn render(&self, rec: &[u8]) -> String {
        self.format(rec)
    }
}

impl<P: Clone> Clone for BoolField<P> {
    fn clone(&self) -> Self {
        BoolField {
            name: self.name.clone(),
            parent: self.parent.clone(),
            bit_pos: self.bit_pos,
            formatter: self.formatter.clone(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for BoolField<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoolField")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("bit_pos", &self.bit_pos)
            .finish()
    }
}
