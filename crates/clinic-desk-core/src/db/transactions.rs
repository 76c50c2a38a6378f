//! Transaction (payment) database operations.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_instant, encode_instant, Database, DbError, DbResult};
use crate::models::{Money, PaymentMethod, Transaction};

const TRANSACTION_COLUMNS: &str =
    "id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method";

impl Database {
    /// Record a payment and remove the schedule it completes, atomically.
    ///
    /// Fails with `NotFound` (and changes nothing) if the schedule is no
    /// longer pending.
    pub fn complete_schedule_payment(&self, transaction: &Transaction) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let removed = tx.execute(
            "DELETE FROM schedules WHERE id = ?",
            [&transaction.schedule_id],
        )?;
        if removed == 0 {
            return Err(DbError::NotFound(format!(
                "schedule {}",
                transaction.schedule_id
            )));
        }
        insert_transaction_row(&tx, transaction)?;

        tx.commit()?;
        debug!(
            "schedule {} completed by transaction {}",
            transaction.schedule_id, transaction.id
        );
        Ok(())
    }

    /// Get a transaction by ID.
    pub fn get_transaction(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        );
        self.conn
            .query_row(&sql, [id], transaction_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all transactions, most recent payment first.
    pub fn list_transactions(&self) -> DbResult<Vec<Transaction>> {
        self.list_transactions_between(None, None)
    }

    /// List transactions paid in `[from, until)`, most recent first.
    /// Either bound may be open.
    pub fn list_transactions_between(
        &self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            r#"
            SELECT {} FROM transactions
            WHERE (?1 IS NULL OR paid_at >= ?1)
              AND (?2 IS NULL OR paid_at < ?2)
            ORDER BY paid_at DESC, rowid DESC
            "#,
            TRANSACTION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                from.as_ref().map(encode_instant),
                until.as_ref().map(encode_instant)
            ],
            transaction_row,
        )?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?.try_into()?);
        }
        Ok(transactions)
    }

    /// Sum of amounts paid in `[from, until)`.
    ///
    /// Rows outside the accepted amount range are left out with a warning.
    pub fn sum_transactions_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Money> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, amount_cents FROM transactions
            WHERE paid_at >= ?1 AND paid_at < ?2
            "#,
        )?;
        let rows = stmt.query_map(
            params![encode_instant(&from), encode_instant(&until)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut total = Money::ZERO;
        for row in rows {
            let (id, cents) = row?;
            let amount = Money::from_cents(cents);
            if !amount.in_range() {
                warn!("transaction {} has out-of-range amount {}, not summed", id, cents);
                continue;
            }
            total = total
                .checked_add(amount)
                .ok_or_else(|| DbError::InvalidData("transaction total overflows".to_string()))?;
        }
        Ok(total)
    }
}

pub(crate) fn insert_transaction_row(conn: &Connection, transaction: &Transaction) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO transactions (
            id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            transaction.id,
            transaction.schedule_id,
            transaction.patient_id,
            transaction.patient_name,
            encode_instant(&transaction.paid_at),
            transaction.amount.cents(),
            transaction.method.label(),
        ],
    )?;
    Ok(())
}

fn transaction_row(row: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        schedule_id: row.get(1)?,
        patient_id: row.get(2)?,
        patient_name: row.get(3)?,
        paid_at: row.get(4)?,
        amount_cents: row.get(5)?,
        method: row.get(6)?,
    })
}

/// Intermediate row struct for database mapping.
struct TransactionRow {
    id: String,
    schedule_id: String,
    patient_id: String,
    patient_name: String,
    paid_at: String,
    amount_cents: i64,
    method: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let method = PaymentMethod::parse(&row.method).ok_or_else(|| {
            DbError::InvalidData(format!("blank payment method on transaction {}", row.id))
        })?;

        Ok(Transaction {
            paid_at: decode_instant(&row.paid_at)?,
            amount: Money::from_cents(row.amount_cents),
            method,
            id: row.id,
            schedule_id: row.schedule_id,
            patient_id: row.patient_id,
            patient_name: row.patient_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, Schedule};
    use chrono::{NaiveDate, TimeZone};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Maria".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn pending(db: &Database, patient: &Patient) -> Schedule {
        let when = NaiveDate::from_ymd_opt(2026, 10, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let schedule = Schedule::new(patient, when);
        db.insert_schedule(&schedule).unwrap();
        schedule
    }

    fn paid(db: &Database, patient: &Patient, day: u32, cents: i64) -> Transaction {
        let schedule = pending(db, patient);
        let tx = Transaction::for_schedule(
            &schedule,
            Money::from_cents(cents),
            PaymentMethod::Pix,
            Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap(),
        );
        db.complete_schedule_payment(&tx).unwrap();
        tx
    }

    #[test]
    fn test_complete_moves_schedule_to_transaction() {
        let (db, patient) = setup_db();
        let tx = paid(&db, &patient, 5, 5000);

        assert!(db.get_schedule(&tx.schedule_id).unwrap().is_none());
        let stored = db.get_transaction(&tx.id).unwrap().unwrap();
        assert_eq!(stored, tx);
    }

    #[test]
    fn test_complete_missing_schedule_changes_nothing() {
        let (db, patient) = setup_db();
        let tx = paid(&db, &patient, 5, 5000);

        let mut again = tx.clone();
        again.id = crate::models::new_record_id();
        let result = db.complete_schedule_payment(&again);
        assert!(matches!(result, Err(DbError::NotFound(_))));
        assert_eq!(db.list_transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_list_most_recent_first() {
        let (db, patient) = setup_db();
        let a = paid(&db, &patient, 2, 100);
        let b = paid(&db, &patient, 9, 200);
        let c = paid(&db, &patient, 5, 300);

        let ids: Vec<_> = db
            .list_transactions()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![b.id, c.id, a.id]);
    }

    #[test]
    fn test_between_and_sum() {
        let (db, patient) = setup_db();
        paid(&db, &patient, 2, 100);
        paid(&db, &patient, 9, 200);
        paid(&db, &patient, 15, 300);

        let from = Utc.with_ymd_and_hms(2026, 10, 9, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();

        let listed = db.list_transactions_between(Some(from), Some(until)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount.cents(), 200);

        // Upper bound is exclusive
        assert_eq!(db.sum_transactions_between(from, until).unwrap().cents(), 200);
        let open_from = db.list_transactions_between(Some(from), None).unwrap();
        assert_eq!(open_from.len(), 2);
    }

    #[test]
    fn test_sum_skips_out_of_range_rows() {
        let (db, patient) = setup_db();
        paid(&db, &patient, 2, 100);
        paid(&db, &patient, 3, 200);

        // Written by an older build that did not bound amounts
        db.conn()
            .execute_batch(&format!(
                r#"
                PRAGMA ignore_check_constraints = ON;
                INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
                VALUES ('huge', 'gone', '{}', 'Maria', '2026-10-04T12:00:00.000Z', {}, 'Pix');
                PRAGMA ignore_check_constraints = OFF;
                "#,
                patient.id,
                i64::MAX
            ))
            .unwrap();

        let from = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(db.sum_transactions_between(from, until).unwrap().cents(), 300);
        assert_eq!(db.list_transactions_between(Some(from), Some(until)).unwrap().len(), 3);
    }

    #[test]
    fn test_sum_at_the_amount_cap() {
        let (db, patient) = setup_db();
        paid(&db, &patient, 2, Money::MAX.cents());
        paid(&db, &patient, 3, Money::MAX.cents());

        let from = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(
            db.sum_transactions_between(from, until).unwrap().cents(),
            2 * Money::MAX.cents()
        );
    }

    #[test]
    fn test_sum_empty_is_zero() {
        let (db, _) = setup_db();
        let from = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(db.sum_transactions_between(from, until).unwrap(), Money::ZERO);
    }
}
