//! Payment completion.

use chrono::{DateTime, SubsecRound, Utc};
use log::info;

use super::{ClinicError, ClinicResult};
use crate::db::{Database, DbError};
use crate::models::{Money, PaymentMethod, Transaction};

/// Turns pending appointments into payments.
pub struct PaymentManager<'a> {
    db: &'a Database,
}

impl<'a> PaymentManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record payment for a pending appointment.
    ///
    /// The transaction is created and the appointment removed together;
    /// on any validation error nothing changes.
    pub fn complete(
        &self,
        schedule_id: &str,
        amount: &str,
        method: &str,
        paid_at: DateTime<Utc>,
    ) -> ClinicResult<Transaction> {
        let schedule = self
            .db
            .get_schedule(schedule_id)?
            .ok_or_else(|| ClinicError::ScheduleNotFound(schedule_id.to_string()))?;

        let amount = Money::parse(amount)
            .filter(Money::is_positive)
            .ok_or(ClinicError::InvalidAmount)?;
        let method = PaymentMethod::parse(method).ok_or(ClinicError::MissingMethod)?;

        // Stored timestamps keep millisecond precision.
        let transaction =
            Transaction::for_schedule(&schedule, amount, method, paid_at.trunc_subsecs(3));

        match self.db.complete_schedule_payment(&transaction) {
            Ok(()) => {}
            Err(DbError::NotFound(_)) => {
                return Err(ClinicError::ScheduleNotFound(schedule_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        info!(
            "schedule {} paid by transaction {}",
            schedule_id, transaction.id
        );
        Ok(transaction)
    }
}
