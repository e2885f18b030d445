use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{FormatFn, Lens, Named, Render};
use crate::scalar::{Count, Endian, Scalar};

/// A variable-length trailing sequence whose element count lives elsewhere
/// in the record.
///
/// The count accessor yields the *stored* count; the number of addressable
/// elements is `stored - min_count`, where `min_count` is a fixed baseline
/// for formats whose count field measures more than the trailing region
/// alone (say, a fixed header block plus the variable part). A stored count
/// below the baseline is a contract violation and panics.
///
/// The accessor never owns element storage: it is a view over the record
/// bytes starting at `offset`. Writes do not resize the record — the caller
/// must supply a buffer with enough trailing capacity.
///
/// `set_all` copies the elements first and only then updates the stored
/// count (when asked to); a concurrent reader can observe the intermediate
/// state, so shared records need external serialization.
pub struct FlexArrayField<E, C> {
    name: SmolStr,
    offset: usize,
    count: C,
    min_count: usize,
    endian: Endian,
    formatter: Option<FormatFn<Vec<E>>>,
    _elem: PhantomData<fn() -> E>,
}

impl<E, C> FlexArrayField<E, C>
where
    E: Scalar,
    C: Lens,
    C::Value: Count,
{
    /// Creates a flexible array whose first element lives at `offset` and
    /// whose stored count is read through `count`.
    pub fn new(name: impl Into<SmolStr>, offset: usize, count: C) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "field name must not be empty");
        FlexArrayField {
            name,
            offset,
            count,
            min_count: 0,
            endian: Endian::NATIVE,
            formatter: None,
            _elem: PhantomData,
        }
    }

    /// Sets the baseline subtracted from the stored count.
    pub fn with_min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }

    /// Sets the byte order applied to each element.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&[u8], &Vec<E>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Number of addressable elements: stored count minus the baseline.
    pub fn len(&self, rec: &[u8]) -> usize {
        let stored = self.count.get(rec).to_count();
        assert!(
            stored >= self.min_count,
            "stored count {stored} for `{}` is below the fixed baseline {}",
            self.name,
            self.min_count
        );
        stored - self.min_count
    }

    pub fn is_empty(&self, rec: &[u8]) -> bool {
        self.len(rec) == 0
    }

    #[inline]
    fn elem_span(&self, rec_len: usize, pos: usize) -> Range<usize> {
        let start = self.offset + pos * E::SIZE;
        let end = start + E::SIZE;
        assert!(
            end <= rec_len,
            "record too short for element {pos} of `{}`: need {end} bytes, have {rec_len}",
            self.name
        );
        start..end
    }

    /// Copies all addressable elements out of the record.
    pub fn get_all(&self, rec: &[u8]) -> Vec<E> {
        (0..self.len(rec))
            .map(|pos| E::read(&rec[self.elem_span(rec.len(), pos)], self.endian))
            .collect()
    }

    /// Reads the element at `pos`. `pos` must be below [`len`](Self::len).
    pub fn get_at(&self, rec: &[u8], pos: usize) -> E {
        let len = self.len(rec);
        assert!(
            pos < len,
            "element {pos} out of range for `{}` with {len} elements",
            self.name
        );
        E::read(&rec[self.elem_span(rec.len(), pos)], self.endian)
    }

    /// Copies `values` into the record starting at the first element.
    ///
    /// With `update_count`, the stored count becomes
    /// `values.len() + min_count`; without it the stored count is left
    /// untouched, deliberately allowing a staged update where elements and
    /// count are written at different times.
    pub fn set_all(&self, rec: &mut [u8], values: &[E], update_count: bool) -> &Self {
        for (pos, value) in values.iter().enumerate() {
            let span = self.elem_span(rec.len(), pos);
            value.write(&mut rec[span], self.endian);
        }
        if update_count {
            self.count
                .set(rec, C::Value::from_count(values.len() + self.min_count));
        }
        self
    }

    /// Overwrites one existing element in place; the stored count does not
    /// change. `pos` must be below [`len`](Self::len).
    pub fn set_at(&self, rec: &mut [u8], pos: usize, value: E) -> &Self {
        let len = self.len(rec);
        assert!(
            pos < len,
            "element {pos} out of range for `{}` with {len} elements",
            self.name
        );
        let span = self.elem_span(rec.len(), pos);
        value.write(&mut rec[span], self.endian);
        self
    }

    pub fn format(&self, rec: &[u8]) -> String {
        let values = self.get_all(rec);
        match &self.formatter {
            Some(formatter) => formatter(rec, &values),
            None => {
                let rendered: Vec<String> = values.iter().map(Scalar::display).collect();
                format!("{}: [{}]", self.name, rendered.join(", "))
            }
        }
    }
}

impl<E, C> Lens for FlexArrayField<E, C>
where
    E: Scalar,
    C: Lens,
    C::Value: Count,
{
    type Value = Vec<E>;

    fn get(&self, rec: &[u8]) -> Vec<E> {
        self.get_all(rec)
    }

    fn set(&self, rec: &mut [u8], values: Vec<E>) -> &Self {
        self.set_all(rec, &values, true)
    }
}

impl<E, C> Named for FlexArrayField<E, C> {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl<E, C> Render for FlexArrayField<E, C>
where
    E: Scalar,
    C: Lens,
    C::Value: Count,
{
    fn render(&self, rec: &[u8]) -> String {
        self.format(rec)
    }
}

impl<E, C: Clone> Clone for FlexArrayField<E, C> {
    fn clone(&self) -> Self {
        FlexArrayField {
            name: self.name.clone(),
            offset: self.offset,
            count: self.count.clone(),
            min_count: self.min_count,
            endian: self.endian,
            formatter: self.formatter.clone(),
            _elem: PhantomData,
        }
    }
}

impl<E, C: fmt::Debug> fmt::Debug for FlexArrayField<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlexArrayField")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("count", &self.count)
            .field("min_count", &self.min_count)
            .field("endian", &self.endian)
            .finish()
    }
}
