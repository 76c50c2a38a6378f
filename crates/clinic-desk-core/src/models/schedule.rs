//! Appointment schedule models.

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::patient::Patient;

/// Input formats accepted for an appointment date/time.
///
/// The first is what a `datetime-local` form field produces.
const SCHEDULE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// A pending appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// Unique record id
    pub id: String,
    /// Patient this appointment belongs to
    pub patient_id: String,
    /// Patient name at the time of booking (not refreshed on rename)
    pub patient_name: String,
    /// Local wall-clock date and time, second precision
    pub scheduled_at: NaiveDateTime,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl Schedule {
    /// Book a new appointment for a patient.
    pub fn new(patient: &Patient, scheduled_at: NaiveDateTime) -> Self {
        Self {
            id: super::new_record_id(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            scheduled_at: truncate_to_second(scheduled_at),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Move the appointment.
    pub fn reschedule(&mut self, scheduled_at: NaiveDateTime) {
        self.scheduled_at = truncate_to_second(scheduled_at);
    }
}

/// Drop sub-second precision.
pub fn truncate_to_second(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Parse an appointment date/time as typed in a form.
///
/// RFC 3339 instants are converted to local wall-clock time.
pub fn parse_schedule_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    SCHEDULE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}

/// Format an appointment date/time for a `datetime-local` form field.
pub fn format_schedule_input(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M").to_string()
}
