//! Appointment scheduling.

use chrono::NaiveDateTime;
use log::info;

use super::{ClinicError, ClinicResult, Confirmation};
use crate::db::Database;
use crate::models::{parse_schedule_datetime, sort_by_name, PatientOption, Schedule};

/// Default number of entries in the upcoming view.
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

/// Parse the date/time typed in the scheduling form.
///
/// Blank input is `Ok(None)` so the caller can report it together with a
/// missing patient.
pub fn parse_schedule_input(input: &str) -> ClinicResult<Option<NaiveDateTime>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_schedule_datetime(input)
        .map(Some)
        .ok_or_else(|| ClinicError::InvalidDate(input.trim().to_string()))
}

/// Books, moves and cancels appointments.
pub struct ScheduleManager<'a> {
    db: &'a Database,
    upcoming_limit: usize,
}

impl<'a> ScheduleManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_upcoming_limit(db, DEFAULT_UPCOMING_LIMIT)
    }

    pub fn with_upcoming_limit(db: &'a Database, upcoming_limit: usize) -> Self {
        Self { db, upcoming_limit }
    }

    /// Book an appointment. Both a patient and a date are required.
    pub fn create(
        &self,
        patient_id: Option<&str>,
        scheduled_at: Option<NaiveDateTime>,
    ) -> ClinicResult<Schedule> {
        let patient_id = patient_id.map(str::trim).filter(|id| !id.is_empty());
        let (Some(patient_id), Some(scheduled_at)) = (patient_id, scheduled_at) else {
            return Err(ClinicError::MissingPatientOrDate);
        };

        let patient = self
            .db
            .get_patient(patient_id)?
            .ok_or_else(|| ClinicError::PatientNotFound(patient_id.to_string()))?;

        let schedule = Schedule::new(&patient, scheduled_at);
        self.db.insert_schedule(&schedule)?;
        info!("schedule {} booked for patient {}", schedule.id, patient.id);
        Ok(schedule)
    }

    pub fn get(&self, id: &str) -> ClinicResult<Schedule> {
        self.db
            .get_schedule(id)?
            .ok_or_else(|| ClinicError::ScheduleNotFound(id.to_string()))
    }

    /// All pending appointments, earliest first.
    pub fn list(&self) -> ClinicResult<Vec<Schedule>> {
        Ok(self.db.list_schedules()?)
    }

    /// The next appointments from `now` on, capped at the upcoming limit.
    pub fn upcoming(&self, now: NaiveDateTime) -> ClinicResult<Vec<Schedule>> {
        Ok(self.db.list_upcoming_schedules(now, self.upcoming_limit)?)
    }

    /// Move an appointment. Patient and name are left as booked.
    pub fn reschedule(&self, id: &str, scheduled_at: NaiveDateTime) -> ClinicResult<Schedule> {
        let mut schedule = self.get(id)?;
        schedule.reschedule(scheduled_at);

        if !self.db.update_schedule_date(id, schedule.scheduled_at)? {
            return Err(ClinicError::ScheduleNotFound(id.to_string()));
        }
        info!("schedule {} moved", id);
        Ok(schedule)
    }

    /// Cancel an appointment. Returns `false` when the user declined.
    pub fn delete(&self, id: &str, confirmation: Confirmation) -> ClinicResult<bool> {
        if !confirmation.is_confirmed() {
            return Ok(false);
        }
        if !self.db.delete_schedule(id)? {
            return Err(ClinicError::ScheduleNotFound(id.to_string()));
        }
        info!("schedule {} cancelled", id);
        Ok(true)
    }

    /// Patients to offer in the scheduling form, by name.
    pub fn patient_options(&self) -> ClinicResult<Vec<PatientOption>> {
        let mut patients = self.db.list_patients()?;
        sort_by_name(&mut patients);
        Ok(patients.iter().map(PatientOption::from).collect())
    }
}
