//! Repository layer: entity-scoped database operations.
//!
//! List and tree columns are written as JSON text and read back through
//! the [`crate::normalize`] adapters, so rows written by older builds
//! (comma-separated lists, escaped JSON) still load.

mod formula;
mod herb;
mod patient;
mod preference;
mod prescription;

pub use formula::*;
pub use herb::*;
pub use patient::*;
pub use preference::*;
pub use prescription::*;

use super::DatabaseError;

/// Serialize a list or tree column.
pub(crate) fn json_column<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(value)?)
}

/// `%term%` for LIKE searches, with LIKE wildcards escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" gan "), "%gan%");
        assert_eq!(like_pattern("50%_x"), "%50\\%\\_x%");
    }
}
