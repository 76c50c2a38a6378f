//! Clinic Desk Core Library
//!
//! Local-first clinic office manager: patients, appointments and payments.
//!
//! # Architecture
//!
//! ```text
//!   Host UI shell (forms, toasts, modals)
//!          │ Action                ▲ Outcome (notification + view)
//!          ▼                       │
//!   ┌──────────────────────────────┴──────┐
//!   │              ClinicApp              │
//!   │  active section · financial filter  │
//!   └──┬──────────┬───────────┬────────┬──┘
//!      ▼          ▼           ▼        ▼
//!   Patients  Schedules   Payments  Financial
//!      │          │           │        │
//!      └──────────┴─────┬─────┴────────┘
//!                       ▼
//!            SQLite (patients, schedules, transactions)
//!                       ▲
//!                       │ import / export
//!            Browser storage collections
//! ```
//!
//! # Core Principle
//!
//! **A schedule is either pending or paid, never both.** Completing a payment
//! removes the schedule and records the transaction in one database
//! transaction; deleting a patient removes everything that references them.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, Schedule, Transaction, Money)
//! - [`clinic`]: Patient, schedule, payment and financial operations
//! - [`app`]: Section state and action dispatch
//! - [`storage`]: Browser-storage compatible collections
//! - [`address`]: Postal-code lookup contract
//! - [`config`]: Runtime configuration

pub mod address;
pub mod app;
pub mod clinic;
pub mod config;
pub mod db;
pub mod models;
pub mod notification;
pub mod storage;

// Re-export commonly used types
pub use app::{Action, AppState, ClinicApp, Outcome, Section, SectionView};
pub use clinic::{
    ClinicError, ClinicResult, Confirmation, DeletionPlan, FinancialSummary, FinancialView,
    PatientManager, PaymentManager, ScheduleManager, TransactionFilter,
};
pub use config::ClinicConfig;
pub use db::Database;
pub use models::{
    Address, Money, Patient, PatientForm, PatientOption, PaymentMethod, Schedule, Transaction,
};
pub use notification::{Notification, NotificationKind};
pub use storage::Snapshot;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, SecondsFormat};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicDeskError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Lookup error: {0}")]
    LookupError(String),
}

impl From<db::DbError> for ClinicDeskError {
    fn from(e: db::DbError) -> Self {
        ClinicDeskError::DatabaseError(e.to_string())
    }
}

impl From<ClinicError> for ClinicDeskError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::Database(e) => e.into(),
            ClinicError::PatientNotFound(_) | ClinicError::ScheduleNotFound(_) => {
                ClinicDeskError::NotFound(e.to_string())
            }
            other => ClinicDeskError::InvalidInput(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClinicDeskError {
    fn from(e: serde_json::Error) -> Self {
        ClinicDeskError::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for ClinicDeskError {
    fn from(e: config::ConfigError) -> Self {
        ClinicDeskError::ConfigError(e.to_string())
    }
}

impl From<address::LookupError> for ClinicDeskError {
    fn from(e: address::LookupError) -> Self {
        ClinicDeskError::LookupError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicDeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicDeskError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a clinic database at the given path, with default settings.
#[uniffi::export]
pub fn open_clinic_desk(database_path: String) -> Result<Arc<ClinicDeskCore>, ClinicDeskError> {
    let config = ClinicConfig {
        database_path: database_path.into(),
        ..ClinicConfig::default()
    };
    ClinicDeskCore::open(config)
}

/// Open the clinic database described by a JSON config file.
#[uniffi::export]
pub fn open_clinic_desk_with_config(
    config_path: String,
) -> Result<Arc<ClinicDeskCore>, ClinicDeskError> {
    ClinicDeskCore::open(ClinicConfig::load(&config_path)?)
}

/// Create an in-memory clinic database (for testing).
#[uniffi::export]
pub fn open_clinic_desk_in_memory() -> Result<Arc<ClinicDeskCore>, ClinicDeskError> {
    let app = ClinicApp::open_in_memory(ClinicConfig::default())?;
    Ok(Arc::new(ClinicDeskCore {
        app: Mutex::new(app),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe application wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicDeskCore {
    app: Mutex<ClinicApp>,
}

impl ClinicDeskCore {
    fn open(config: ClinicConfig) -> Result<Arc<Self>, ClinicDeskError> {
        let app = ClinicApp::open(config)?;
        Ok(Arc::new(Self {
            app: Mutex::new(app),
        }))
    }

    fn dispatch(&self, action: Action) -> Result<FfiOutcome, ClinicDeskError> {
        let mut app = self.app.lock()?;
        let outcome = app.dispatch(action, &Local::now())?;
        Ok(outcome.into())
    }
}

#[uniffi::export]
impl ClinicDeskCore {
    // =========================================================================
    // Navigation
    // =========================================================================

    /// Switch to a section and return its view.
    pub fn show_section(&self, section: FfiSection) -> Result<FfiSectionView, ClinicDeskError> {
        let mut app = self.app.lock()?;
        let view = app.show_section(section.into(), &Local::now())?;
        Ok(view.into())
    }

    /// Current view of the active section.
    pub fn refresh(&self) -> Result<FfiSectionView, ClinicDeskError> {
        let app = self.app.lock()?;
        Ok(app.refresh(&Local::now())?.into())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn create_patient(&self, form: FfiPatientForm) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::CreatePatient(form.try_into()?))
    }

    /// Get a patient by ID, for the view/edit dialog.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, ClinicDeskError> {
        let app = self.app.lock()?;
        let patient = app.db().get_patient(&id)?;
        Ok(patient.map(|p| p.into()))
    }

    pub fn update_patient(
        &self,
        id: String,
        form: FfiPatientForm,
    ) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::UpdatePatient {
            id,
            form: form.try_into()?,
        })
    }

    /// What deleting a patient would remove, for the confirmation prompt.
    pub fn plan_patient_deletion(&self, id: String) -> Result<FfiDeletionPlan, ClinicDeskError> {
        let app = self.app.lock()?;
        let plan = app.patients().plan_deletion(&id)?;
        Ok(plan.into())
    }

    pub fn delete_patient(&self, id: String, confirmed: bool) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::DeletePatient {
            id,
            confirmation: confirmed.into(),
        })
    }

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    /// Book an appointment. `scheduled_at` is the form's date/time text.
    pub fn create_schedule(
        &self,
        patient_id: Option<String>,
        scheduled_at: String,
    ) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::CreateSchedule {
            patient_id,
            scheduled_at,
        })
    }

    pub fn reschedule(&self, id: String, scheduled_at: String) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::RescheduleSchedule { id, scheduled_at })
    }

    pub fn delete_schedule(&self, id: String, confirmed: bool) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::DeleteSchedule {
            id,
            confirmation: confirmed.into(),
        })
    }

    // =========================================================================
    // Payment / Financial Operations
    // =========================================================================

    pub fn complete_payment(
        &self,
        schedule_id: String,
        amount: String,
        method: String,
    ) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::CompletePayment {
            schedule_id,
            amount,
            method,
        })
    }

    pub fn set_financial_filter(
        &self,
        filter: FfiTransactionFilter,
    ) -> Result<FfiOutcome, ClinicDeskError> {
        self.dispatch(Action::SetFinancialFilter(filter.try_into()?))
    }

    // =========================================================================
    // Browser Storage
    // =========================================================================

    /// Replace all data with collections read from browser storage.
    pub fn import_browser_storage(
        &self,
        entries: Vec<FfiStorageEntry>,
    ) -> Result<FfiImportReport, ClinicDeskError> {
        let app = self.app.lock()?;
        let report =
            app.import_browser_storage(entries.into_iter().map(|e| (e.key, e.value)))?;
        Ok(report.into())
    }

    /// All data as browser-storage entries.
    pub fn export_browser_storage(&self) -> Result<Vec<FfiStorageEntry>, ClinicDeskError> {
        let app = self.app.lock()?;
        let entries = app.export_browser_storage()?;
        Ok(entries
            .into_iter()
            .map(|(key, value)| FfiStorageEntry { key, value })
            .collect())
    }

    // =========================================================================
    // Address Lookup
    // =========================================================================

    /// URL to fetch for a postal code, or `None` when it is not 8 digits.
    pub fn address_lookup_url(&self, postal_code: String) -> Result<Option<String>, ClinicDeskError> {
        let app = self.app.lock()?;
        let template = &app.config().address_lookup_url;
        Ok(address::PostalCode::parse(&postal_code).map(|code| address::lookup_url(template, &code)))
    }

    /// Fill an address from a lookup response body.
    pub fn apply_address_lookup(
        &self,
        address: FfiAddress,
        response_body: String,
    ) -> Result<FfiAddress, ClinicDeskError> {
        let prefill = address::parse_lookup_response(&response_body)?;
        let mut address: Address = address.into();
        address.apply_prefill(prefill);
        Ok(address.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiSection {
    Home,
    Patients,
    Agenda,
    Financial,
}

impl From<FfiSection> for Section {
    fn from(section: FfiSection) -> Self {
        match section {
            FfiSection::Home => Section::Home,
            FfiSection::Patients => Section::Patients,
            FfiSection::Agenda => Section::Agenda,
            FfiSection::Financial => Section::Financial,
        }
    }
}

/// FFI-safe address.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl From<Address> for FfiAddress {
    fn from(address: Address) -> Self {
        Self {
            postal_code: address.postal_code,
            street: address.street,
            number: address.number,
            neighborhood: address.neighborhood,
            city: address.city,
            state: address.state,
        }
    }
}

impl From<FfiAddress> for Address {
    fn from(address: FfiAddress) -> Self {
        Address {
            postal_code: address.postal_code,
            street: address.street,
            number: address.number,
            neighborhood: address.neighborhood,
            city: address.city,
            state: address.state,
        }
    }
}

/// FFI-safe patient form. `birth_date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientForm {
    pub name: String,
    pub birth_date: Option<String>,
    pub profession: Option<String>,
    pub phone: Option<String>,
    pub address: FfiAddress,
    pub notes: Option<String>,
}

impl TryFrom<FfiPatientForm> for PatientForm {
    type Error = ClinicDeskError;

    fn try_from(form: FfiPatientForm) -> Result<Self, Self::Error> {
        Ok(PatientForm {
            name: form.name,
            birth_date: parse_optional_date(form.birth_date.as_deref())?,
            profession: form.profession,
            phone: form.phone,
            address: form.address.into(),
            notes: form.notes,
        })
    }
}

fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>, ClinicDeskError> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| ClinicDeskError::InvalidInput(format!("date {:?}: {}", s, e))),
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub birth_date: Option<String>,
    pub profession: Option<String>,
    pub phone: Option<String>,
    pub address: FfiAddress,
    pub address_line: Option<String>,
    pub notes: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            address_line: patient.address.summary_line(),
            id: patient.id,
            name: patient.name,
            birth_date: patient.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            profession: patient.profession,
            phone: patient.phone,
            address: patient.address.into(),
            notes: patient.notes,
        }
    }
}

/// FFI-safe selector entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientOption {
    pub id: String,
    pub name: String,
}

impl From<PatientOption> for FfiPatientOption {
    fn from(option: PatientOption) -> Self {
        Self {
            id: option.id,
            name: option.name,
        }
    }
}

/// FFI-safe deletion preview.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeletionPlan {
    pub patient_id: String,
    pub patient_name: String,
    pub schedule_count: u32,
    pub transaction_count: u32,
    pub warning: String,
}

impl From<DeletionPlan> for FfiDeletionPlan {
    fn from(plan: DeletionPlan) -> Self {
        Self {
            warning: plan.warning(),
            patient_id: plan.patient_id,
            patient_name: plan.patient_name,
            schedule_count: plan.schedule_count as u32,
            transaction_count: plan.transaction_count as u32,
        }
    }
}

/// FFI-safe schedule. `scheduled_at` is local `YYYY-MM-DDTHH:MM`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSchedule {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub scheduled_at: String,
}

impl From<Schedule> for FfiSchedule {
    fn from(schedule: Schedule) -> Self {
        Self {
            scheduled_at: models::format_schedule_input(&schedule.scheduled_at),
            id: schedule.id,
            patient_id: schedule.patient_id,
            patient_name: schedule.patient_name,
        }
    }
}

/// FFI-safe transaction. `paid_at` is RFC 3339 UTC.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransaction {
    pub id: String,
    pub schedule_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub paid_at: String,
    pub amount: f64,
    pub amount_display: String,
    pub method: String,
}

impl From<Transaction> for FfiTransaction {
    fn from(tx: Transaction) -> Self {
        Self {
            paid_at: tx.paid_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            amount: tx.amount.as_f64(),
            amount_display: tx.amount.to_string(),
            method: tx.method.label().to_string(),
            id: tx.id,
            schedule_id: tx.schedule_id,
            patient_id: tx.patient_id,
            patient_name: tx.patient_name,
        }
    }
}

/// FFI-safe ledger filter. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiTransactionFilter {
    pub method: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TryFrom<FfiTransactionFilter> for TransactionFilter {
    type Error = ClinicDeskError;

    fn try_from(filter: FfiTransactionFilter) -> Result<Self, Self::Error> {
        Ok(TransactionFilter {
            method: filter.method,
            from: parse_optional_date(filter.from.as_deref())?,
            to: parse_optional_date(filter.to.as_deref())?,
        })
    }
}

/// FFI-safe section view.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSectionView {
    Home {
        upcoming: Vec<FfiSchedule>,
    },
    Patients {
        patients: Vec<FfiPatient>,
    },
    Agenda {
        schedules: Vec<FfiSchedule>,
        patient_options: Vec<FfiPatientOption>,
    },
    Financial {
        monthly_total: f64,
        monthly_total_display: String,
        transactions: Vec<FfiTransaction>,
    },
}

impl From<SectionView> for FfiSectionView {
    fn from(view: SectionView) -> Self {
        match view {
            SectionView::Home { upcoming } => FfiSectionView::Home {
                upcoming: upcoming.into_iter().map(|s| s.into()).collect(),
            },
            SectionView::Patients { patients } => FfiSectionView::Patients {
                patients: patients.into_iter().map(|p| p.into()).collect(),
            },
            SectionView::Agenda {
                schedules,
                patient_options,
            } => FfiSectionView::Agenda {
                schedules: schedules.into_iter().map(|s| s.into()).collect(),
                patient_options: patient_options.into_iter().map(|o| o.into()).collect(),
            },
            SectionView::Financial(summary) => FfiSectionView::Financial {
                monthly_total: summary.monthly_total.as_f64(),
                monthly_total_display: summary.monthly_total.to_string(),
                transactions: summary.transactions.into_iter().map(|t| t.into()).collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiNotificationKind {
    Success,
    Error,
}

/// FFI-safe notification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotification {
    pub kind: FfiNotificationKind,
    pub message: String,
}

impl From<Notification> for FfiNotification {
    fn from(notification: Notification) -> Self {
        Self {
            kind: match notification.kind {
                NotificationKind::Success => FfiNotificationKind::Success,
                NotificationKind::Error => FfiNotificationKind::Error,
            },
            message: notification.message,
        }
    }
}

/// FFI-safe dispatch result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOutcome {
    pub notification: Option<FfiNotification>,
    pub view: FfiSectionView,
}

impl From<Outcome> for FfiOutcome {
    fn from(outcome: Outcome) -> Self {
        Self {
            notification: outcome.notification.map(|n| n.into()),
            view: outcome.view.into(),
        }
    }
}

/// One browser-storage key/value pair.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStorageEntry {
    pub key: String,
    pub value: String,
}

/// FFI-safe import counts.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    pub patients: u32,
    pub schedules: u32,
    pub transactions: u32,
    pub skipped: u32,
}

impl From<db::ImportReport> for FfiImportReport {
    fn from(report: db::ImportReport) -> Self {
        Self {
            patients: report.patients as u32,
            schedules: report.schedules as u32,
            transactions: report.transactions as u32,
            skipped: report.skipped as u32,
        }
    }
}
