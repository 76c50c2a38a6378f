//! Whole-database import and export in the browser-storage shape.

use std::collections::HashSet;

use log::{info, warn};

use super::patients::insert_patient_row;
use super::schedules::insert_schedule_row;
use super::transactions::insert_transaction_row;
use super::{Database, DbResult};
use crate::storage::Snapshot;

/// Counts from a snapshot import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub patients: usize,
    pub schedules: usize,
    pub transactions: usize,
    /// Duplicates, orphans and already-paid schedules that were dropped
    pub skipped: usize,
}

impl Database {
    /// Read every table out as a snapshot.
    pub fn export_snapshot(&self) -> DbResult<Snapshot> {
        let mut transactions = self.list_transactions()?;
        // Oldest first, the order the browser build appended them.
        transactions.reverse();

        Ok(Snapshot {
            patients: self.list_patients()?,
            schedules: self.list_schedules()?,
            transactions,
        })
    }

    /// Replace the contents of every table with a snapshot, atomically.
    ///
    /// Records that would break referential consistency are skipped:
    /// duplicate ids, schedules and transactions whose patient is missing,
    /// and pending schedules that already have a payment.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> DbResult<ImportReport> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM transactions", [])?;
        tx.execute("DELETE FROM schedules", [])?;
        tx.execute("DELETE FROM patients", [])?;

        let mut report = ImportReport::default();

        let mut patient_ids = HashSet::new();
        for patient in &snapshot.patients {
            if !patient_ids.insert(patient.id.as_str()) {
                warn!("skipping duplicate patient {}", patient.id);
                report.skipped += 1;
                continue;
            }
            insert_patient_row(&tx, patient)?;
            report.patients += 1;
        }

        let mut transaction_ids = HashSet::new();
        let mut paid_schedules = HashSet::new();
        for transaction in &snapshot.transactions {
            if !patient_ids.contains(transaction.patient_id.as_str()) {
                warn!(
                    "skipping transaction {} for missing patient {}",
                    transaction.id, transaction.patient_id
                );
                report.skipped += 1;
                continue;
            }
            if !transaction_ids.insert(transaction.id.as_str())
                || !paid_schedules.insert(transaction.schedule_id.as_str())
            {
                warn!("skipping duplicate transaction {}", transaction.id);
                report.skipped += 1;
                continue;
            }
            insert_transaction_row(&tx, transaction)?;
            report.transactions += 1;
        }

        let mut schedule_ids = HashSet::new();
        for schedule in &snapshot.schedules {
            if !patient_ids.contains(schedule.patient_id.as_str()) {
                warn!(
                    "skipping schedule {} for missing patient {}",
                    schedule.id, schedule.patient_id
                );
                report.skipped += 1;
                continue;
            }
            if paid_schedules.contains(schedule.id.as_str()) {
                warn!("skipping schedule {} that is already paid", schedule.id);
                report.skipped += 1;
                continue;
            }
            if !schedule_ids.insert(schedule.id.as_str()) {
                warn!("skipping duplicate schedule {}", schedule.id);
                report.skipped += 1;
                continue;
            }
            insert_schedule_row(&tx, schedule)?;
            report.schedules += 1;
        }

        tx.commit()?;
        info!(
            "imported {} patients, {} schedules, {} transactions ({} skipped)",
            report.patients, report.schedules, report.transactions, report.skipped
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, Patient, PaymentMethod, Schedule, Transaction};
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn sample() -> Snapshot {
        let ana = Patient::new("Ana".into());
        let bia = Patient::new("Bia".into());
        let pending = Schedule::new(&ana, at(3));
        let done = Schedule::new(&bia, at(1));
        let paid = Transaction::for_schedule(
            &done,
            Money::from_cents(12000),
            PaymentMethod::CreditCard,
            Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
        );
        Snapshot {
            patients: vec![ana, bia],
            schedules: vec![pending],
            transactions: vec![paid],
        }
    }

    #[test]
    fn test_import_then_export() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = sample();

        let report = db.import_snapshot(&snapshot).unwrap();
        assert_eq!(
            report,
            ImportReport {
                patients: 2,
                schedules: 1,
                transactions: 1,
                skipped: 0
            }
        );
        assert_eq!(db.export_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn test_import_replaces_existing_rows() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new("Old".into())).unwrap();

        db.import_snapshot(&sample()).unwrap();
        let names: Vec<_> = db
            .list_patients()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Bia"]);
    }

    #[test]
    fn test_import_skips_orphans_and_paid_schedules() {
        let db = Database::open_in_memory().unwrap();
        let mut snapshot = sample();

        let ghost = Patient::new("Ghost".into());
        snapshot.schedules.push(Schedule::new(&ghost, at(4)));

        // A schedule that is both pending and paid keeps only the payment
        let mut stale = snapshot.schedules[0].clone();
        stale.id = snapshot.transactions[0].schedule_id.clone();
        stale.patient_id = snapshot.transactions[0].patient_id.clone();
        snapshot.schedules.push(stale);

        snapshot.patients.push(snapshot.patients[0].clone());

        let report = db.import_snapshot(&snapshot).unwrap();
        assert_eq!(report.patients, 2);
        assert_eq!(report.schedules, 1);
        assert_eq!(report.transactions, 1);
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_import_empty_snapshot_clears() {
        let db = Database::open_in_memory().unwrap();
        db.import_snapshot(&sample()).unwrap();
        db.import_snapshot(&Snapshot::default()).unwrap();
        assert!(db.export_snapshot().unwrap().is_empty());
    }
}
