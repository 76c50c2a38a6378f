//! Schedule database operations.

use chrono::{Duration, NaiveDateTime, Timelike};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_local, encode_local, Database, DbError, DbResult};
use crate::models::Schedule;

const SCHEDULE_COLUMNS: &str = "id, patient_id, patient_name, scheduled_at, created_at";

impl Database {
    /// Insert a new schedule.
    pub fn insert_schedule(&self, schedule: &Schedule) -> DbResult<()> {
        insert_schedule_row(&self.conn, schedule)
    }

    /// Get a schedule by ID.
    pub fn get_schedule(&self, id: &str) -> DbResult<Option<Schedule>> {
        let sql = format!("SELECT {} FROM schedules WHERE id = ?", SCHEDULE_COLUMNS);
        self.conn
            .query_row(&sql, [id], schedule_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all pending schedules, earliest first.
    pub fn list_schedules(&self) -> DbResult<Vec<Schedule>> {
        let sql = format!(
            "SELECT {} FROM schedules ORDER BY scheduled_at, rowid",
            SCHEDULE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], schedule_row)?;
        collect_schedules(rows)
    }

    /// List schedules at or after `now`, earliest first, at most `limit`.
    pub fn list_upcoming_schedules(
        &self,
        now: NaiveDateTime,
        limit: usize,
    ) -> DbResult<Vec<Schedule>> {
        let sql = format!(
            r#"
            SELECT {} FROM schedules
            WHERE scheduled_at >= ?
            ORDER BY scheduled_at, rowid
            LIMIT ?
            "#,
            SCHEDULE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![encode_local(&ceil_to_second(now)), limit as i64],
            schedule_row,
        )?;
        collect_schedules(rows)
    }

    /// Move a schedule to a new date/time. Only the date changes.
    pub fn update_schedule_date(&self, id: &str, scheduled_at: NaiveDateTime) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE schedules SET scheduled_at = ?2 WHERE id = ?1",
            params![id, encode_local(&scheduled_at)],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a schedule.
    pub fn delete_schedule(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM schedules WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Stored schedules have whole-second precision, so `>= ceil(now)` is the
/// same as `>= now`.
fn ceil_to_second(at: NaiveDateTime) -> NaiveDateTime {
    if at.nanosecond() == 0 {
        return at;
    }
    let floor = at.with_nanosecond(0).unwrap_or(at);
    floor + Duration::seconds(1)
}

pub(crate) fn insert_schedule_row(conn: &Connection, schedule: &Schedule) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO schedules (id, patient_id, patient_name, scheduled_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            schedule.id,
            schedule.patient_id,
            schedule.patient_name,
            encode_local(&schedule.scheduled_at),
            schedule.created_at,
        ],
    )?;
    Ok(())
}

fn schedule_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRow> {
    Ok(ScheduleRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        scheduled_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn collect_schedules(
    rows: impl Iterator<Item = rusqlite::Result<ScheduleRow>>,
) -> DbResult<Vec<Schedule>> {
    let mut schedules = Vec::new();
    for row in rows {
        schedules.push(row?.try_into()?);
    }
    Ok(schedules)
}

/// Intermediate row struct for database mapping.
struct ScheduleRow {
    id: String,
    patient_id: String,
    patient_name: String,
    scheduled_at: String,
    created_at: String,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = DbError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(Schedule {
            id: row.id,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
            scheduled_at: decode_local(&row.scheduled_at)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Maria".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, patient) = setup_db();
        let schedule = Schedule::new(&patient, at(3, 14, 30));
        db.insert_schedule(&schedule).unwrap();

        let retrieved = db.get_schedule(&schedule.id).unwrap().unwrap();
        assert_eq!(retrieved, schedule);
    }

    #[test]
    fn test_list_sorted_by_date() {
        let (db, patient) = setup_db();
        let late = Schedule::new(&patient, at(20, 9, 0));
        let early = Schedule::new(&patient, at(1, 9, 0));
        let middle = Schedule::new(&patient, at(10, 9, 0));
        for s in [&late, &early, &middle] {
            db.insert_schedule(s).unwrap();
        }

        let ids: Vec<_> = db
            .list_schedules()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![early.id, middle.id, late.id]);
    }

    #[test]
    fn test_upcoming_filters_and_caps() {
        let (db, patient) = setup_db();
        db.insert_schedule(&Schedule::new(&patient, at(1, 8, 0))).unwrap();
        for day in 5..12 {
            db.insert_schedule(&Schedule::new(&patient, at(day, 8, 0)))
                .unwrap();
        }

        let upcoming = db.list_upcoming_schedules(at(3, 0, 0), 5).unwrap();
        assert_eq!(upcoming.len(), 5);
        assert_eq!(upcoming[0].scheduled_at, at(5, 8, 0));
        assert!(upcoming.iter().all(|s| s.scheduled_at >= at(3, 0, 0)));
    }

    #[test]
    fn test_upcoming_boundary() {
        let (db, patient) = setup_db();
        db.insert_schedule(&Schedule::new(&patient, at(3, 14, 30)))
            .unwrap();

        // Exactly now is included
        assert_eq!(db.list_upcoming_schedules(at(3, 14, 30), 5).unwrap().len(), 1);

        // Half a second later it is in the past
        let later = at(3, 14, 30).with_nanosecond(500_000_000).unwrap();
        assert!(db.list_upcoming_schedules(later, 5).unwrap().is_empty());
    }

    #[test]
    fn test_update_date_only() {
        let (db, patient) = setup_db();
        let schedule = Schedule::new(&patient, at(3, 14, 30));
        db.insert_schedule(&schedule).unwrap();

        assert!(db.update_schedule_date(&schedule.id, at(4, 10, 0)).unwrap());
        let retrieved = db.get_schedule(&schedule.id).unwrap().unwrap();
        assert_eq!(retrieved.scheduled_at, at(4, 10, 0));
        assert_eq!(retrieved.patient_name, "Maria");
        assert_eq!(retrieved.patient_id, patient.id);

        assert!(!db.update_schedule_date("nope", at(4, 10, 0)).unwrap());
    }

    #[test]
    fn test_delete_schedule() {
        let (db, patient) = setup_db();
        let schedule = Schedule::new(&patient, at(3, 14, 30));
        db.insert_schedule(&schedule).unwrap();

        assert!(db.delete_schedule(&schedule.id).unwrap());
        assert!(!db.delete_schedule(&schedule.id).unwrap());
        assert!(db.get_schedule(&schedule.id).unwrap().is_none());
    }
}
