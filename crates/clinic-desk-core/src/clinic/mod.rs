//! Clinic operations over the record database.
//!
//! Each manager borrows the [`Database`](crate::db::Database) and enforces
//! the validation rules the UI relies on. Validation failures are reported
//! as [`ClinicError`] before anything is written.

mod financial;
mod patients;
mod payments;
mod schedules;

pub use financial::*;
pub use patients::*;
pub use payments::*;
pub use schedules::*;

use thiserror::Error;

use crate::db::DbError;

/// Clinic operation errors.
///
/// Every variant except `Database` is a user mistake; its message is shown
/// to the user as-is.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("O nome é obrigatório")]
    MissingName,

    #[error("Selecione um paciente e uma data")]
    MissingPatientOrDate,

    #[error("Paciente não encontrado")]
    PatientNotFound(String),

    #[error("Agendamento não encontrado")]
    ScheduleNotFound(String),

    #[error("Por favor, insira um valor válido")]
    InvalidAmount,

    #[error("Selecione a forma de pagamento")]
    MissingMethod,

    #[error("Selecione uma data")]
    MissingDate,

    #[error("Data inválida: {0}")]
    InvalidDate(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ClinicError {
    /// Whether this error is a validation failure to show the user, as
    /// opposed to a storage failure.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ClinicError::Database(_))
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;

/// Answer to a "are you sure?" prompt before a destructive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}
