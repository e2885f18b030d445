use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{FormatFn, Lens, Named, Render};
use crate::scalar::{Endian, Scalar};

/// A plain field: a value of type `T` at a fixed byte offset.
///
/// The byte order defaults to native; a non-native order swaps bytes on
/// every read and write. A record shorter than `offset + T::SIZE` is a
/// contract violation and panics.
pub struct Field<T> {
    name: SmolStr,
    offset: usize,
    endian: Endian,
    formatter: Option<FormatFn<T>>,
    _value: PhantomData<fn() -> T>,
}

impl<T: Scalar> Field<T> {
    /// Creates a field at `offset` with native byte order.
    pub fn new(name: impl Into<SmolStr>, offset: usize) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "field name must not be empty");
        Field {
            name,
            offset,
            endian: Endian::NATIVE,
            formatter: None,
            _value: PhantomData,
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&[u8], &T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Renders the field against `rec`, through the custom formatter when
    /// one was supplied.
    pub fn format(&self, rec: &[u8]) -> String {
        let value = self.get(rec);
        match &self.formatter {
            Some(formatter) => formatter(rec, &value),
            None => format!("{}: {}", self.name, value.display()),
        }
    }

    #[inline]
    fn end(&self, rec_len: usize) -> usize {
        let end = self.offset + T::SIZE;
        assert!(
            end <= rec_len,
            "record too short for field `{}`: need {end} bytes, have {rec_len}",
            self.name
        );
        end
    }
}

impl<T: Scalar> Lens for Field<T> {
    type Value = T;

    #[inline]
    fn get(&self, rec: &[u8]) -> T {
        let end = self.end(rec.len());
        T::read(&rec[self.offset..end], self.endian)
    }

    #[inline]
    fn set(&self, rec: &mut [u8], value: T) -> &Self {
        let end = self.end(rec.len());
        value.write(&mut rec[self.offset..end], self.endian);
        self
    }
}

impl<T> Named for Field<T> {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Scalar> Render for Field<T> {
    fn render(&self, rec: &[u8]) -> String {
        self.format(rec)
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Field {
            name: self.name.clone(),
            offset: self.offset,
            endian: self.endian,
            formatter: self.formatter.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("endian", &self.endian)
            .finish()
    }
}
