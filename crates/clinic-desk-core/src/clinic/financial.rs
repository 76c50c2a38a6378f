//! Financial ledger and monthly total.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{ClinicError, ClinicResult};
use crate::db::Database;
use crate::models::{Money, Transaction};

/// Ledger filter. Every part is optional; dates are inclusive calendar days
/// in the view's time zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Payment method label, matched exactly ignoring case
    pub method: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.method_query().is_none() && self.from.is_none() && self.to.is_none()
    }

    fn method_query(&self) -> Option<&str> {
        self.method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Everything the financial section shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Received in the current calendar month, ignoring the filter
    pub monthly_total: Money,
    /// Filtered ledger, most recent first
    pub transactions: Vec<Transaction>,
}

/// Read-only views over transactions, in a given time zone.
pub struct FinancialView<'a, Tz: TimeZone> {
    db: &'a Database,
    tz: Tz,
}

impl<'a, Tz: TimeZone> FinancialView<'a, Tz> {
    pub fn new(db: &'a Database, tz: Tz) -> Self {
        Self { db, tz }
    }

    /// Sum of payments made in the calendar month containing `now`.
    pub fn monthly_total(&self, now: DateTime<Utc>) -> ClinicResult<Money> {
        let today = now.with_timezone(&self.tz).date_naive();
        let (first, next_first) = month_bounds(today)?;

        let total = self
            .db
            .sum_transactions_between(self.start_of_day(first), self.start_of_day(next_first))?;
        debug!("monthly total for {}-{:02}: {}", today.year(), today.month(), total);
        Ok(total)
    }

    /// Transactions matching `filter`, most recent first.
    pub fn list(&self, filter: &TransactionFilter) -> ClinicResult<Vec<Transaction>> {
        let from = filter.from.map(|date| self.start_of_day(date));
        // The end date is inclusive: stop at the start of the next day.
        let until = filter
            .to
            .and_then(|date| date.succ_opt())
            .map(|date| self.start_of_day(date));

        let mut transactions = self.db.list_transactions_between(from, until)?;
        if let Some(query) = filter.method_query() {
            transactions.retain(|t| t.method.matches(query));
        }
        Ok(transactions)
    }

    pub fn summary(
        &self,
        filter: &TransactionFilter,
        now: DateTime<Utc>,
    ) -> ClinicResult<FinancialSummary> {
        Ok(FinancialSummary {
            monthly_total: self.monthly_total(now)?,
            transactions: self.list(filter)?,
        })
    }

    /// First instant of a local calendar day, in UTC.
    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // When midnight falls in a DST gap the day starts where the gap ends.
        (0..=3)
            .map(|hours| midnight + Duration::hours(hours))
            .find_map(|local| self.tz.from_local_datetime(&local).earliest())
            .unwrap_or_else(|| self.tz.from_utc_datetime(&midnight))
            .with_timezone(&Utc)
    }
}

/// First day of the month containing `date`, and of the month after.
fn month_bounds(date: NaiveDate) -> ClinicResult<(NaiveDate, NaiveDate)> {
    let (year, month) = (date.year(), date.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    first
        .zip(next_first)
        .ok_or_else(|| ClinicError::InvalidDate(date.to_string()))
}
