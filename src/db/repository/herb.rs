use rusqlite::{params, Connection, Row};
use serde_json::Value;

use super::{json_column, like_pattern};
use crate::db::DatabaseError;
use crate::models::Herb;
use crate::normalize::{list_column, tcm_actions_from_value};

const HERB_COLUMNS: &str = "id, pinyin_name, chinese_name, latin_name, english_name, category,
     nature, flavor, meridians, dosage_range, contraindications, cautions,
     herb_drug_interactions, tcm_actions";

fn herb_from_row(row: &Row<'_>) -> rusqlite::Result<Herb> {
    Ok(Herb {
        id: row.get(0)?,
        pinyin_name: row.get(1)?,
        chinese_name: row.get(2)?,
        latin_name: row.get(3)?,
        english_name: row.get(4)?,
        category: row.get(5)?,
        nature: row.get(6)?,
        flavor: row.get(7)?,
        meridians: list_column(row.get(8)?),
        dosage_range: row.get(9)?,
        contraindications: row.get(10)?,
        cautions: row.get(11)?,
        herb_drug_interactions: row.get(12)?,
        tcm_actions: row
            .get::<_, Option<String>>(13)?
            .map(|raw| tcm_actions_from_value(&Value::String(raw)))
            .unwrap_or_default(),
    })
}

pub fn insert_herb(conn: &Connection, herb: &Herb) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO herbs (pinyin_name, chinese_name, latin_name, english_name, category,
         nature, flavor, meridians, dosage_range, contraindications, cautions,
         herb_drug_interactions, tcm_actions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            herb.pinyin_name,
            herb.chinese_name,
            herb.latin_name,
            herb.english_name,
            herb.category,
            herb.nature,
            herb.flavor,
            json_column(&herb.meridians)?,
            herb.dosage_range,
            herb.contraindications,
            herb.cautions,
            herb.herb_drug_interactions,
            json_column(&herb.tcm_actions)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_herb(conn: &Connection, id: i64) -> Result<Option<Herb>, DatabaseError> {
    let sql = format!("SELECT {HERB_COLUMNS} FROM herbs WHERE id = ?1");
    match conn.query_row(&sql, params![id], herb_from_row) {
        Ok(herb) => Ok(Some(herb)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_herb(conn: &Connection, id: i64, herb: &Herb) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE herbs SET pinyin_name = ?1, chinese_name = ?2, latin_name = ?3,
         english_name = ?4, category = ?5, nature = ?6, flavor = ?7, meridians = ?8,
         dosage_range = ?9, contraindications = ?10, cautions = ?11,
         herb_drug_interactions = ?12, tcm_actions = ?13
         WHERE id = ?14",
        params![
            herb.pinyin_name,
            herb.chinese_name,
            herb.latin_name,
            herb.english_name,
            herb.category,
            herb.nature,
            herb.flavor,
            json_column(&herb.meridians)?,
            herb.dosage_range,
            herb.contraindications,
            herb.cautions,
            herb.herb_drug_interactions,
            json_column(&herb.tcm_actions)?,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("herb", id));
    }
    Ok(())
}

pub fn delete_herb(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM herbs WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("herb", id));
    }
    Ok(())
}

pub fn list_herbs(conn: &Connection) -> Result<Vec<Herb>, DatabaseError> {
    let sql = format!("SELECT {HERB_COLUMNS} FROM herbs ORDER BY pinyin_name COLLATE NOCASE");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], herb_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Case-insensitive match on pinyin, chinese, english or latin name.
pub fn search_herbs(conn: &Connection, term: &str) -> Result<Vec<Herb>, DatabaseError> {
    let sql = format!(
        "SELECT {HERB_COLUMNS} FROM herbs
         WHERE pinyin_name LIKE ?1 ESCAPE '\\' OR chinese_name LIKE ?1 ESCAPE '\\'
            OR english_name LIKE ?1 ESCAPE '\\' OR latin_name LIKE ?1 ESCAPE '\\'
         ORDER BY pinyin_name COLLATE NOCASE"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(term)], herb_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
