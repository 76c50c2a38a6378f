//! Patient management.

use log::info;

use super::{ClinicError, ClinicResult, Confirmation};
use crate::db::{CascadeReport, Database};
use crate::models::{sort_by_name, Patient, PatientForm};

/// What deleting a patient will take with it, shown before confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    pub patient_id: String,
    pub patient_name: String,
    pub schedule_count: usize,
    pub transaction_count: usize,
}

impl DeletionPlan {
    /// Confirmation prompt text.
    pub fn warning(&self) -> String {
        format!(
            "ATENÇÃO: Excluir {} também removerá {} agendamento(s) e {} registro(s) financeiro(s). Deseja continuar?",
            self.patient_name, self.schedule_count, self.transaction_count
        )
    }
}

/// Creates, edits and removes patients.
pub struct PatientManager<'a> {
    db: &'a Database,
}

impl<'a> PatientManager<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a new patient. The name is required.
    pub fn create(&self, form: PatientForm) -> ClinicResult<Patient> {
        let form = form.normalized();
        if form.name.is_empty() {
            return Err(ClinicError::MissingName);
        }

        let patient = Patient::from_form(form);
        self.db.insert_patient(&patient)?;
        info!("patient {} created", patient.id);
        Ok(patient)
    }

    pub fn get(&self, id: &str) -> ClinicResult<Patient> {
        self.db
            .get_patient(id)?
            .ok_or_else(|| ClinicError::PatientNotFound(id.to_string()))
    }

    /// All patients, sorted by name.
    pub fn list(&self) -> ClinicResult<Vec<Patient>> {
        let mut patients = self.db.list_patients()?;
        sort_by_name(&mut patients);
        Ok(patients)
    }

    /// Replace a patient's details. Id and creation time are kept.
    ///
    /// Existing schedules and transactions keep the name they were booked
    /// under.
    pub fn update(&self, id: &str, form: PatientForm) -> ClinicResult<Patient> {
        let form = form.normalized();
        if form.name.is_empty() {
            return Err(ClinicError::MissingName);
        }

        let mut patient = self.get(id)?;
        patient.replace_details(form);
        patient.touch();

        if !self.db.update_patient(&patient)? {
            return Err(ClinicError::PatientNotFound(id.to_string()));
        }
        info!("patient {} updated", patient.id);
        Ok(patient)
    }

    /// Preview a cascading delete.
    pub fn plan_deletion(&self, id: &str) -> ClinicResult<DeletionPlan> {
        let patient = self.get(id)?;
        let dependents = self.db.count_patient_dependents(id)?;
        Ok(DeletionPlan {
            patient_id: patient.id,
            patient_name: patient.name,
            schedule_count: dependents.schedules_removed,
            transaction_count: dependents.transactions_removed,
        })
    }

    /// Delete a patient with all of their schedules and transactions.
    ///
    /// Returns `None` when the user declined.
    pub fn delete(
        &self,
        id: &str,
        confirmation: Confirmation,
    ) -> ClinicResult<Option<CascadeReport>> {
        if !confirmation.is_confirmed() {
            return Ok(None);
        }

        let report = self
            .db
            .delete_patient_cascade(id)?
            .ok_or_else(|| ClinicError::PatientNotFound(id.to_string()))?;
        info!(
            "patient {} deleted with {} schedules, {} transactions",
            id, report.schedules_removed, report.transactions_removed
        );
        Ok(Some(report))
    }
}
