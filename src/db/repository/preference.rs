use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Get a user preference by key. Returns None if not set.
pub fn get_user_preference(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT value FROM user_preferences WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Set a user preference (upsert).
pub fn set_user_preference(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO user_preferences (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete_user_preference(conn: &Connection, key: &str) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM user_preferences WHERE key = ?1", params![key])?;
    Ok(())
}

/// All stored preferences, ordered by key.
pub fn list_user_preferences(conn: &Connection) -> Result<Vec<(String, String)>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT key, value FROM user_preferences ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn set_get_overwrite_delete() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_user_preference(&conn, "clinic.name").unwrap(), None);

        set_user_preference(&conn, "clinic.name", "Jade Spring").unwrap();
        set_user_preference(&conn, "clinic.name", "Jade Spring Clinic").unwrap();
        assert_eq!(
            get_user_preference(&conn, "clinic.name").unwrap().as_deref(),
            Some("Jade Spring Clinic")
        );
        assert_eq!(list_user_preferences(&conn).unwrap().len(), 1);

        delete_user_preference(&conn, "clinic.name").unwrap();
        assert!(list_user_preferences(&conn).unwrap().is_empty());
    }
}
