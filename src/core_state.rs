//! Shared application state for the HTTP layer.
//!
//! `CoreState` owns the database location and an in-memory access log.
//! Handlers open a short-lived connection per request through
//! [`CoreState::open_db`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::db;
use crate::settings::ClinicSettings;

/// Entries kept by the access log before the oldest are dropped.
const AUDIT_BUFFER_CAPACITY: usize = 500;

pub struct CoreState {
    db_path: PathBuf,
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            audit: AuditLogger::new(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection, running pending migrations.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// Clinic settings from the preferences table.
    pub fn settings(&self) -> Result<ClinicSettings, CoreError> {
        let conn = self.open_db()?;
        Ok(ClinicSettings::load(&conn)?)
    }

    pub fn log_access(&self, request_id: &str, action: &str, entity: &str) {
        self.audit.log(request_id, action, entity);
    }

    /// Most recent entries, oldest first.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Access log
// ═══════════════════════════════════════════════════════════

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request_id: String,
    pub action: String,
    pub entity: String,
}

pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    pub fn log(&self, request_id: &str, action: &str, entity: &str) {
        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() >= AUDIT_BUFFER_CAPACITY {
                buf.remove(0);
            }
            buf.push(AuditEntry {
                timestamp: chrono::Utc::now(),
                request_id: request_id.to_string(),
                action: action.to_string(),
                entity: entity.to_string(),
            });
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_db_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(dir.path().join("clinic.db"));
        let conn = core.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 6);
        assert_eq!(core.settings().unwrap(), ClinicSettings::default());
    }

    #[test]
    fn audit_buffer_is_bounded() {
        let logger = AuditLogger::new();
        for i in 0..AUDIT_BUFFER_CAPACITY + 5 {
            logger.log(&i.to_string(), "GET", "/api/herbs");
        }
        let entries = logger.entries();
        assert_eq!(entries.len(), AUDIT_BUFFER_CAPACITY);
        assert_eq!(entries[0].request_id, "5");
    }
}
