//! Database layer for the clinic desk.

mod patients;
mod schedules;
mod schema;
mod snapshot;
mod transactions;

#[allow(unused_imports)]
pub use patients::*;
pub use schema::*;
#[allow(unused_imports)]
pub use schedules::*;
pub use snapshot::*;
#[allow(unused_imports)]
pub use transactions::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

// Stored time formats are fixed-width so that text comparison in SQL
// orders the same way as the values themselves.
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn encode_local(at: &NaiveDateTime) -> String {
    at.format(LOCAL_FORMAT).to_string()
}

pub(crate) fn decode_local(s: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, LOCAL_FORMAT)
        .map_err(|e| DbError::InvalidData(format!("local date/time {:?}: {}", s, e)))
}

pub(crate) fn encode_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_instant(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData(format!("timestamp {:?}: {}", s, e)))
}

pub(crate) fn encode_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn decode_date(s: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DbError::InvalidData(format!("date {:?}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_patient(&crate::models::Patient::new("Maria".into()))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_patients().unwrap().len(), 1);
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"schedules".to_string()));
        assert!(tables.contains(&"transactions".to_string()));
    }

    #[test]
    fn test_instant_encoding_sorts_as_text() {
        let early = Utc.with_ymd_and_hms(2026, 1, 9, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        assert!(encode_instant(&early) < encode_instant(&late));
        assert_eq!(decode_instant(&encode_instant(&late)).unwrap(), late);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_local("soon"), Err(DbError::InvalidData(_))));
        assert!(matches!(decode_instant(""), Err(DbError::InvalidData(_))));
        assert!(matches!(decode_date("31/12/2000"), Err(DbError::InvalidData(_))));
    }
}
