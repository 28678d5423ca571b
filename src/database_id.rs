//! Database ID type definition.

/// Alias for the integer type used for mapping to record IDs.
pub type RecordId = i64;
