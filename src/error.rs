// ─── Error ──────────────────────────────────────────────────────────────────
use thiserror::Error;

use crate::group::MAX_FIELDS;

/// Errors from building field groups and compiling layout definitions.
///
/// Only these construction boundaries are fallible: they consume external
/// descriptions. Accessor operations on records panic on contract
/// violations instead (see the crate docs).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyName,
    #[error("duplicate field name `{0}`")]
    DuplicateField(String),
    #[error("group holds {0} fields, more than the supported {}", MAX_FIELDS)]
    TooManyFields(usize),
    #[error("unknown parent field `{0}`")]
    UnknownParent(String),
    #[error("field `{0}` cannot contain bit fields")]
    BadParentField(String),
    #[error("unknown count field `{0}`")]
    UnknownCountField(String),
    #[error("count field `{0}` must be an unsigned integer scalar")]
    BadCountField(String),
    #[error("bit range {offset}+{width} exceeds the {bits}-bit parent field")]
    BitRangeOverflow { offset: u32, width: u32, bits: u32 },
    #[error("bit field must be at least one bit wide")]
    ZeroBitWidth,
    #[error("JSON error: {0}")]
    Json(String),
}
