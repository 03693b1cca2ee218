//! Bulk formula import from a JSON file: a single formula object or an
//! array of them. Each record goes through the formula adapter, so
//! snake_case keys and composition given as JSON text are accepted.
//! Records without a name are skipped, not fatal.

use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::db::{insert_formula, DatabaseError};
use crate::normalize::{decode_embedded, formula_from_value};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Cannot read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import file must hold a formula object or an array of formulas, found {0}")]
    UnexpectedShape(&'static str),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// Row ids of the inserted formulas, in file order.
    pub ids: Vec<i64>,
}

pub fn import_formulas_from_path(
    conn: &Connection,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let bytes = std::fs::read(path)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Importing formulas");
    import_formulas_from_bytes(conn, &bytes)
}

/// Insert every usable record inside one transaction.
pub fn import_formulas_from_bytes(
    conn: &Connection,
    bytes: &[u8],
) -> Result<ImportSummary, ImportError> {
    let parsed: Value = serde_json::from_slice(bytes)?;
    // A file holding the JSON as a string literal is unwrapped once.
    let root = if parsed.is_string() {
        decode_embedded(&parsed).unwrap_or(Value::Null)
    } else {
        parsed
    };

    let records = match root {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        Value::Null => return Err(ImportError::UnexpectedShape("null")),
        Value::Bool(_) => return Err(ImportError::UnexpectedShape("a boolean")),
        Value::Number(_) => return Err(ImportError::UnexpectedShape("a number")),
        Value::String(_) => return Err(ImportError::UnexpectedShape("a string")),
    };

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let mut summary = ImportSummary::default();

    for (index, record) in records.iter().enumerate() {
        let mut formula = formula_from_value(record);
        formula.id = None;
        if let Err(e) = formula.validate() {
            tracing::warn!(index, error = %e, "Skipping formula record");
            summary.skipped += 1;
            continue;
        }
        let id = insert_formula(&tx, &formula)?;
        summary.ids.push(id);
        summary.imported += 1;
    }

    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Formula import complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::{get_formula, list_formulas};
    use std::io::Write;

    #[test]
    fn imports_array_and_skips_nameless() {
        let conn = open_memory_database().unwrap();
        let body = br#"[
            {"pinyin_name": "Liu Wei Di Huang Wan", "composition": "[{\"name\":\"Shu Di Huang\",\"dosage\":\"32%\"}]"},
            {"category": "no name here"},
            {"pinyinName": "Ba Zhen Tang", "composition": [{"name": "Ren Shen", "percentage": 12.5}]}
        ]"#;
        let summary = import_formulas_from_bytes(&conn, body).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);

        let first = get_formula(&conn, summary.ids[0]).unwrap().unwrap();
        assert_eq!(first.pinyin_name, "Liu Wei Di Huang Wan");
        assert_eq!(first.composition[0].dosage.as_deref(), Some("32%"));
    }

    #[test]
    fn single_object_accepted() {
        let conn = open_memory_database().unwrap();
        let summary = import_formulas_from_bytes(&conn, br#"{"pinyinName": "Yu Ping Feng San"}"#).unwrap();
        assert_eq!(summary.imported, 1);
        assert!(list_formulas(&conn).unwrap()[0].composition.is_empty());
    }

    #[test]
    fn scalar_root_rejected() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            import_formulas_from_bytes(&conn, b"42"),
            Err(ImportError::UnexpectedShape(_))
        ));
        assert!(matches!(
            import_formulas_from_bytes(&conn, b"{broken"),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn imports_from_file() {
        let conn = open_memory_database().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"pinyinName": "Gui Zhi Tang"}, {"pinyinName": "Ma Huang Tang"}]"#)
            .unwrap();
        let summary = import_formulas_from_path(&conn, file.path()).unwrap();
        assert_eq!(summary.ids.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let conn = open_memory_database().unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            import_formulas_from_path(&conn, &dir.path().join("absent.json")),
            Err(ImportError::Io(_))
        ));
    }
}
