use rusqlite::{params, Connection, Row};
use serde_json::Value;

use super::{json_column, like_pattern};
use crate::db::DatabaseError;
use crate::models::Formula;
use crate::normalize::{composition_from_value, list_column};

const FORMULA_COLUMNS: &str = "id, pinyin_name, chinese_name, english_name, category,
     composition, actions, indications, clinical_applications, contraindications,
     cautions, pharmacological_effects, research, herb_drug_interactions";

fn formula_from_row(row: &Row<'_>) -> rusqlite::Result<Formula> {
    Ok(Formula {
        id: row.get(0)?,
        pinyin_name: row.get(1)?,
        chinese_name: row.get(2)?,
        english_name: row.get(3)?,
        category: row.get(4)?,
        composition: row
            .get::<_, Option<String>>(5)?
            .map(|raw| composition_from_value(&Value::String(raw)))
            .unwrap_or_default(),
        actions: list_column(row.get(6)?),
        indications: row.get(7)?,
        clinical_applications: row.get(8)?,
        contraindications: row.get(9)?,
        cautions: row.get(10)?,
        pharmacological_effects: row.get(11)?,
        research: row.get(12)?,
        herb_drug_interactions: row.get(13)?,
    })
}

pub fn insert_formula(conn: &Connection, formula: &Formula) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO formulas (pinyin_name, chinese_name, english_name, category,
         composition, actions, indications, clinical_applications, contraindications,
         cautions, pharmacological_effects, research, herb_drug_interactions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            formula.pinyin_name,
            formula.chinese_name,
            formula.english_name,
            formula.category,
            json_column(&formula.composition)?,
            json_column(&formula.actions)?,
            formula.indications,
            formula.clinical_applications,
            formula.contraindications,
            formula.cautions,
            formula.pharmacological_effects,
            formula.research,
            formula.herb_drug_interactions,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_formula(conn: &Connection, id: i64) -> Result<Option<Formula>, DatabaseError> {
    let sql = format!("SELECT {FORMULA_COLUMNS} FROM formulas WHERE id = ?1");
    match conn.query_row(&sql, params![id], formula_from_row) {
        Ok(formula) => Ok(Some(formula)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_formula(conn: &Connection, id: i64, formula: &Formula) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE formulas SET pinyin_name = ?1, chinese_name = ?2, english_name = ?3,
         category = ?4, composition = ?5, actions = ?6, indications = ?7,
         clinical_applications = ?8, contraindications = ?9, cautions = ?10,
         pharmacological_effects = ?11, research = ?12, herb_drug_interactions = ?13
         WHERE id = ?14",
        params![
            formula.pinyin_name,
            formula.chinese_name,
            formula.english_name,
            formula.category,
            json_column(&formula.composition)?,
            json_column(&formula.actions)?,
            formula.indications,
            formula.clinical_applications,
            formula.contraindications,
            formula.cautions,
            formula.pharmacological_effects,
            formula.research,
            formula.herb_drug_interactions,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("formula", id));
    }
    Ok(())
}

pub fn delete_formula(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM formulas WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("formula", id));
    }
    Ok(())
}

pub fn list_formulas(conn: &Connection) -> Result<Vec<Formula>, DatabaseError> {
    let sql = format!("SELECT {FORMULA_COLUMNS} FROM formulas ORDER BY pinyin_name COLLATE NOCASE");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], formula_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn search_formulas(conn: &Connection, term: &str) -> Result<Vec<Formula>, DatabaseError> {
    let sql = format!(
        "SELECT {FORMULA_COLUMNS} FROM formulas
         WHERE pinyin_name LIKE ?1 ESCAPE '\\' OR chinese_name LIKE ?1 ESCAPE '\\'
            OR english_name LIKE ?1 ESCAPE '\\' OR category LIKE ?1 ESCAPE '\\'
         ORDER BY pinyin_name COLLATE NOCASE"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(term)], formula_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Look up a formula by exact pinyin name (case-insensitive).
pub fn find_formula_by_name(conn: &Connection, name: &str) -> Result<Option<Formula>, DatabaseError> {
    let sql = format!(
        "SELECT {FORMULA_COLUMNS} FROM formulas WHERE pinyin_name = ?1 COLLATE NOCASE LIMIT 1"
    );
    match conn.query_row(&sql, params![name.trim()], formula_from_row) {
        Ok(formula) => Ok(Some(formula)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
