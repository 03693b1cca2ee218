use rusqlite::{params, Connection, Row};

use super::{json_column, like_pattern};
use crate::db::DatabaseError;
use crate::models::Patient;
use crate::normalize::list_column;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        identifier: row.get(2)?,
        contact_info: row.get(3)?,
        medical_history: row.get(4)?,
        medications: list_column(row.get(5)?),
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, identifier, contact_info, medical_history, medications)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient.name,
            patient.identifier,
            patient.contact_info,
            patient.medical_history,
            json_column(&patient.medications)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    match conn.query_row(
        "SELECT id, name, identifier, contact_info, medical_history, medications
         FROM patients WHERE id = ?1",
        params![id],
        patient_from_row,
    ) {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_patient(conn: &Connection, id: i64, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET name = ?1, identifier = ?2, contact_info = ?3,
         medical_history = ?4, medications = ?5 WHERE id = ?6",
        params![
            patient.name,
            patient.identifier,
            patient.contact_info,
            patient.medical_history,
            json_column(&patient.medications)?,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    Ok(())
}

/// Deleting a patient also deletes their prescriptions.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    Ok(())
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, identifier, contact_info, medical_history, medications
         FROM patients ORDER BY name COLLATE NOCASE",
    )?;
    let rows = stmt.query_map([], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn search_patients(conn: &Connection, term: &str) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, identifier, contact_info, medical_history, medications
         FROM patients
         WHERE name LIKE ?1 ESCAPE '\\' OR identifier LIKE ?1 ESCAPE '\\'
            OR contact_info LIKE ?1 ESCAPE '\\'
         ORDER BY name COLLATE NOCASE",
    )?;
    let rows = stmt.query_map(params![like_pattern(term)], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
