//! Ordered groups of heterogeneous accessors with by-name lookup.

use std::io;

use arrayvec::ArrayVec;
use smol_str::SmolStr;
use xxhash_rust::xxh64::xxh64;

use crate::error::SchemaError;
use crate::lens::{Named, Render};

/// Upper bound on the number of fields in one group.
pub const MAX_FIELDS: usize = 64;

/// Groups this small are scanned linearly instead of binary-searched.
const LINEAR_SEARCH_MAX: usize = 4;

struct Entry {
    name: SmolStr,
    thunk: Box<dyn Render + Send + Sync>,
}

/// An ordered, heterogeneous collection of type-erased accessors.
///
/// Built once via [`GroupBuilder`]; printing walks the fields in definition
/// order, lookup goes through xxh64 name hashes kept in a sorted index.
pub struct FieldGroup {
    /// Fields in definition order.
    entries: Vec<Entry>,
    /// `(name_hash, entry index)`, sorted by hash.
    index: ArrayVec<(u64, u32), MAX_FIELDS>,
}

impl FieldGroup {
    pub fn builder() -> GroupBuilder {
        GroupBuilder {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Renders the named field against `rec`, or `None` if the group has no
    /// such field.
    pub fn format_field(&self, rec: &[u8], name: &str) -> Option<String> {
        self.find(name).map(|entry| entry.thunk.render(rec))
    }

    /// Writes every field's rendering to `out`, one per line, in definition
    /// order.
    pub fn print<W: io::Write + ?Sized>(&self, out: &mut W, rec: &[u8]) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(out, "{}", entry.thunk.render(rec))?;
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        let hash = xxh64(name.as_bytes(), 0);
        let n = self.index.len();
        if n == 0 {
            return None;
        }
        if n <= LINEAR_SEARCH_MAX {
            return self
                .index
                .iter()
                .find(|(h, _)| *h == hash)
                .map(|(_, i)| &self.entries[*i as usize]);
        }
        self.index
            .binary_search_by_key(&hash, |(h, _)| *h)
            .ok()
            .map(|pos| &self.entries[self.index[pos].1 as usize])
    }
}

impl std::fmt::Debug for FieldGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldGroup")
            .field("fields", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Accumulates accessors for a [`FieldGroup`]. Order of `push` calls is the
/// print order.
pub struct GroupBuilder {
    entries: Vec<Entry>,
}

impl GroupBuilder {
    /// Adds a named accessor.
    pub fn push<F>(mut self, field: F) -> Self
    where
        F: Render + Named + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: field.name().into(),
            thunk: Box::new(field),
        });
        self
    }

    /// Adds an already type-erased accessor under an explicit name.
    pub fn push_boxed(
        mut self,
        name: impl Into<SmolStr>,
        thunk: Box<dyn Render + Send + Sync>,
    ) -> Self {
        self.entries.push(Entry {
            name: name.into(),
            thunk,
        });
        self
    }

    /// Validates names and builds the sorted hash index.
    pub fn build(self) -> Result<FieldGroup, SchemaError> {
        if self.entries.len() > MAX_FIELDS {
            return Err(SchemaError::TooManyFields(self.entries.len()));
        }
        let mut index: ArrayVec<(u64, u32), MAX_FIELDS> = ArrayVec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            index.push((xxh64(entry.name.as_bytes(), 0), i as u32));
        }
        index.sort_unstable_by_key(|(hash, _)| *hash);
        for pair in index.windows(2) {
            if pair[0].0 == pair[1].0 {
                let name = &self.entries[pair[1].1 as usize].name;
                return Err(SchemaError::DuplicateField(name.to_string()));
            }
        }
        Ok(FieldGroup {
            entries: self.entries,
            index,
        })
    }
}
