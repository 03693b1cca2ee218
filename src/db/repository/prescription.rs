use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::json_column;
use crate::db::DatabaseError;
use crate::models::enums::PrescriptionStatus;
use crate::models::Prescription;
use crate::normalize::list_column;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PRESCRIPTION_COLUMNS: &str = "id, patient_id, formula_id, custom_formula, quantity, notes,
     instructions, duration, status, active_conditions, active_medications, created_at";

type PrescriptionRow = (
    i64,
    i64,
    Option<i64>,
    Option<String>,
    Option<f64>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn read_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    let (
        id,
        patient_id,
        formula_id,
        custom_formula,
        quantity,
        notes,
        instructions,
        duration,
        status,
        active_conditions,
        active_medications,
        created_at,
    ) = row;

    Ok(Prescription {
        id: Some(id),
        patient_id,
        formula_id,
        custom_formula,
        quantity,
        notes,
        instructions,
        duration,
        status: status.parse::<PrescriptionStatus>()?,
        active_conditions: list_column(active_conditions),
        active_medications: list_column(active_medications),
        created_at: NaiveDateTime::parse_from_str(&created_at, DATETIME_FORMAT).map_err(|_| {
            DatabaseError::ConstraintViolation(format!(
                "prescription {id} has malformed created_at: {created_at}"
            ))
        })?,
    })
}

fn collect(rows: Vec<PrescriptionRow>) -> Result<Vec<Prescription>, DatabaseError> {
    rows.into_iter().map(prescription_from_row).collect()
}

/// Insert a prescription. The patient must exist.
pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<i64, DatabaseError> {
    let result = conn.execute(
        "INSERT INTO prescriptions (patient_id, formula_id, custom_formula, quantity, notes,
         instructions, duration, status, active_conditions, active_medications, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            rx.patient_id,
            rx.formula_id,
            rx.custom_formula,
            rx.quantity,
            rx.notes,
            rx.instructions,
            rx.duration,
            rx.status.as_str(),
            json_column(&rx.active_conditions)?,
            json_column(&rx.active_medications)?,
            rx.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    );
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DatabaseError::ConstraintViolation(msg.unwrap_or_else(|| {
                format!("patient {} or formula does not exist", rx.patient_id)
            })))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    let sql = format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1");
    match conn.query_row(&sql, params![id], read_row) {
        Ok(row) => prescription_from_row(row).map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Newest first.
pub fn list_prescriptions(conn: &Connection) -> Result<Vec<Prescription>, DatabaseError> {
    let sql = format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    collect(rows)
}

pub fn list_prescriptions_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<Prescription>, DatabaseError> {
    let sql = format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE patient_id = ?1
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![patient_id], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    collect(rows)
}

pub fn update_prescription_status(
    conn: &Connection,
    id: i64,
    status: PrescriptionStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE prescriptions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("prescription", id));
    }
    Ok(())
}

pub fn delete_prescription(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("prescription", id));
    }
    Ok(())
}
