//! Patient database operations.

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_date, encode_date, Database, DbError, DbResult};
use crate::models::{Address, Patient};

const PATIENT_COLUMNS: &str = r#"
    id, name, birth_date, profession, phone,
    postal_code, street, number, neighborhood, city, state,
    notes, created_at, updated_at
"#;

/// Rows removed by a cascading patient delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub schedules_removed: usize,
    pub transactions_removed: usize,
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        insert_patient_row(&self.conn, patient)
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                birth_date = ?3,
                profession = ?4,
                phone = ?5,
                postal_code = ?6,
                street = ?7,
                number = ?8,
                neighborhood = ?9,
                city = ?10,
                state = ?11,
                notes = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.name,
                patient.birth_date.as_ref().map(encode_date),
                patient.profession,
                patient.phone,
                patient.address.postal_code,
                patient.address.street,
                patient.address.number,
                patient.address.neighborhood,
                patient.address.city,
                patient.address.state,
                patient.notes,
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS);
        self.conn
            .query_row(&sql, [id], patient_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all patients in insertion order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let sql = format!(
            "SELECT {} FROM patients ORDER BY rowid",
            PATIENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], patient_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Count the schedules and transactions that reference a patient.
    pub fn count_patient_dependents(&self, id: &str) -> DbResult<CascadeReport> {
        let schedules: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM schedules WHERE patient_id = ?",
            [id],
            |row| row.get(0),
        )?;
        let transactions: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE patient_id = ?",
            [id],
            |row| row.get(0),
        )?;
        Ok(CascadeReport {
            schedules_removed: schedules as usize,
            transactions_removed: transactions as usize,
        })
    }

    /// Delete a patient together with all of their schedules and
    /// transactions, atomically.
    ///
    /// Returns `None` (and changes nothing) if the patient does not exist.
    pub fn delete_patient_cascade(&self, id: &str) -> DbResult<Option<CascadeReport>> {
        let tx = self.conn.unchecked_transaction()?;

        let transactions_removed =
            tx.execute("DELETE FROM transactions WHERE patient_id = ?", [id])?;
        let schedules_removed = tx.execute("DELETE FROM schedules WHERE patient_id = ?", [id])?;
        let patients_removed = tx.execute("DELETE FROM patients WHERE id = ?", [id])?;

        if patients_removed == 0 {
            // Dropping the transaction rolls back.
            return Ok(None);
        }

        tx.commit()?;
        debug!(
            "cascade delete of patient {} removed {} schedules, {} transactions",
            id, schedules_removed, transactions_removed
        );
        Ok(Some(CascadeReport {
            schedules_removed,
            transactions_removed,
        }))
    }
}

pub(crate) fn insert_patient_row(conn: &Connection, patient: &Patient) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO patients (
            id, name, birth_date, profession, phone,
            postal_code, street, number, neighborhood, city, state,
            notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            patient.id,
            patient.name,
            patient.birth_date.as_ref().map(encode_date),
            patient.profession,
            patient.phone,
            patient.address.postal_code,
            patient.address.street,
            patient.address.number,
            patient.address.neighborhood,
            patient.address.city,
            patient.address.state,
            patient.notes,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(())
}

fn patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: row.get(2)?,
        profession: row.get(3)?,
        phone: row.get(4)?,
        address: Address {
            postal_code: row.get(5)?,
            street: row.get(6)?,
            number: row.get(7)?,
            neighborhood: row.get(8)?,
            city: row.get(9)?,
            state: row.get(10)?,
        },
        notes: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    name: String,
    birth_date: Option<String>,
    profession: Option<String>,
    phone: Option<String>,
    address: Address,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let birth_date = row.birth_date.as_deref().map(decode_date).transpose()?;

        Ok(Patient {
            id: row.id,
            name: row.name,
            birth_date,
            profession: row.profession,
            phone: row.phone,
            address: row.address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
