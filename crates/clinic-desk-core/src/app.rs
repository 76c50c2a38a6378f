//! Application state and action dispatch.
//!
//! The host UI shell sends one [`Action`] per user event and renders the
//! returned [`Outcome`]: an optional notification plus the refreshed view of
//! the active section.

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::clinic::{
    parse_schedule_input, ClinicError, ClinicResult, Confirmation, FinancialSummary,
    FinancialView, PatientManager, PaymentManager, ScheduleManager, TransactionFilter,
};
use crate::config::ClinicConfig;
use crate::db::{Database, DbError, ImportReport};
use crate::models::{Patient, PatientForm, PatientOption, Schedule};
use crate::notification::Notification;
use crate::storage::Snapshot;

/// Top-level screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    #[default]
    Home,
    Patients,
    Agenda,
    Financial,
}

/// What the UI is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub active_section: Section,
    pub financial_filter: TransactionFilter,
}

/// Data to render for a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionView {
    Home {
        upcoming: Vec<Schedule>,
    },
    Patients {
        patients: Vec<Patient>,
    },
    Agenda {
        schedules: Vec<Schedule>,
        patient_options: Vec<PatientOption>,
    },
    Financial(FinancialSummary),
}

/// A user-triggered operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ShowSection(Section),
    CreatePatient(PatientForm),
    UpdatePatient {
        id: String,
        form: PatientForm,
    },
    DeletePatient {
        id: String,
        confirmation: Confirmation,
    },
    /// Date/time as typed in the form
    CreateSchedule {
        patient_id: Option<String>,
        scheduled_at: String,
    },
    RescheduleSchedule {
        id: String,
        scheduled_at: String,
    },
    DeleteSchedule {
        id: String,
        confirmation: Confirmation,
    },
    CompletePayment {
        schedule_id: String,
        amount: String,
        method: String,
    },
    SetFinancialFilter(TransactionFilter),
}

/// Result of dispatching an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub notification: Option<Notification>,
    pub view: SectionView,
}

/// The clinic desk: database, settings and UI state.
pub struct ClinicApp {
    db: Database,
    config: ClinicConfig,
    state: AppState,
}

impl ClinicApp {
    /// Open the database named in the config.
    pub fn open(config: ClinicConfig) -> ClinicResult<Self> {
        let db = Database::open(&config.database_path)?;
        info!("opened clinic database {}", config.database_path.display());
        Ok(Self::with_database(db, config))
    }

    pub fn open_in_memory(config: ClinicConfig) -> ClinicResult<Self> {
        Ok(Self::with_database(Database::open_in_memory()?, config))
    }

    pub fn with_database(db: Database, config: ClinicConfig) -> Self {
        Self {
            db,
            config,
            state: AppState::default(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn patients(&self) -> PatientManager<'_> {
        PatientManager::new(&self.db)
    }

    pub fn schedules(&self) -> ScheduleManager<'_> {
        ScheduleManager::with_upcoming_limit(&self.db, self.config.upcoming_limit)
    }

    pub fn payments(&self) -> PaymentManager<'_> {
        PaymentManager::new(&self.db)
    }

    pub fn financial<Tz: TimeZone>(&self, tz: Tz) -> FinancialView<'_, Tz> {
        FinancialView::new(&self.db, tz)
    }

    /// Switch sections and return the new section's view.
    pub fn show_section<Tz: TimeZone>(
        &mut self,
        section: Section,
        now: &DateTime<Tz>,
    ) -> ClinicResult<SectionView> {
        self.state.active_section = section;
        self.refresh(now)
    }

    /// Rebuild the active section's view. `now` carries the user's time
    /// zone, used for the upcoming list and the financial month.
    pub fn refresh<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ClinicResult<SectionView> {
        let view = match self.state.active_section {
            Section::Home => SectionView::Home {
                upcoming: self.schedules().upcoming(now.naive_local())?,
            },
            Section::Patients => SectionView::Patients {
                patients: self.patients().list()?,
            },
            Section::Agenda => {
                let schedules = self.schedules();
                SectionView::Agenda {
                    schedules: schedules.list()?,
                    patient_options: schedules.patient_options()?,
                }
            }
            Section::Financial => SectionView::Financial(
                self.financial(now.timezone())
                    .summary(&self.state.financial_filter, now.with_timezone(&Utc))?,
            ),
        };
        Ok(view)
    }

    /// Run one action and refresh the active section.
    ///
    /// Validation failures become an error notification and change nothing.
    /// Storage failures are returned as errors.
    pub fn dispatch<Tz: TimeZone>(
        &mut self,
        action: Action,
        now: &DateTime<Tz>,
    ) -> ClinicResult<Outcome> {
        let notification = match self.apply(action, now) {
            Ok(notification) => notification,
            Err(err) if err.is_user_facing() => {
                debug!("action rejected: {:?}", err);
                Some(Notification::from(&err))
            }
            Err(err) => return Err(err),
        };

        Ok(Outcome {
            notification,
            view: self.refresh(now)?,
        })
    }

    fn apply<Tz: TimeZone>(
        &mut self,
        action: Action,
        now: &DateTime<Tz>,
    ) -> ClinicResult<Option<Notification>> {
        let notification = match action {
            Action::ShowSection(section) => {
                self.state.active_section = section;
                None
            }
            Action::CreatePatient(form) => {
                self.patients().create(form)?;
                Some(Notification::success("Paciente salvo com sucesso!"))
            }
            Action::UpdatePatient { id, form } => {
                self.patients().update(&id, form)?;
                Some(Notification::success("Paciente atualizado com sucesso!"))
            }
            Action::DeletePatient { id, confirmation } => self
                .patients()
                .delete(&id, confirmation)?
                .map(|_| Notification::success("Paciente e todos os seus dados foram excluídos.")),
            Action::CreateSchedule {
                patient_id,
                scheduled_at,
            } => {
                // A missing patient takes precedence over a malformed date.
                let scheduled_at = match parse_schedule_input(&scheduled_at) {
                    Err(_) if patient_id.as_deref().map_or(true, |id| id.trim().is_empty()) => {
                        None
                    }
                    parsed => parsed?,
                };
                self.schedules()
                    .create(patient_id.as_deref(), scheduled_at)?;
                Some(Notification::success("Agendamento salvo com sucesso!"))
            }
            Action::RescheduleSchedule { id, scheduled_at } => {
                let scheduled_at =
                    parse_schedule_input(&scheduled_at)?.ok_or(ClinicError::MissingDate)?;
                self.schedules().reschedule(&id, scheduled_at)?;
                Some(Notification::success("Agendamento atualizado com sucesso!"))
            }
            Action::DeleteSchedule { id, confirmation } => self
                .schedules()
                .delete(&id, confirmation)?
                .then(|| Notification::success("Agendamento cancelado.")),
            Action::CompletePayment {
                schedule_id,
                amount,
                method,
            } => {
                self.payments()
                    .complete(&schedule_id, &amount, &method, now.with_timezone(&Utc))?;
                Some(Notification::success("Pagamento registrado com sucesso!"))
            }
            Action::SetFinancialFilter(filter) => {
                self.state.financial_filter = filter;
                None
            }
        };
        Ok(notification)
    }

    /// Replace all data with the collections read from browser storage.
    pub fn import_browser_storage(
        &self,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> ClinicResult<ImportReport> {
        let snapshot = Snapshot::from_entries(entries);
        Ok(self.db.import_snapshot(&snapshot)?)
    }

    /// All data as browser-storage key/value pairs.
    pub fn export_browser_storage(&self) -> ClinicResult<Vec<(String, String)>> {
        let snapshot = self.db.export_snapshot()?;
        Ok(snapshot.to_entries().map_err(DbError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 11, 3, 10, 0, 0)
            .unwrap()
    }

    fn setup_app() -> ClinicApp {
        ClinicApp::open_in_memory(ClinicConfig::default()).unwrap()
    }

    #[test]
    fn test_starts_on_home() {
        let app = setup_app();
        assert_eq!(app.state().active_section, Section::Home);
        assert_eq!(
            app.refresh(&now()).unwrap(),
            SectionView::Home { upcoming: vec![] }
        );
    }

    #[test]
    fn test_create_patient_refreshes_active_section() {
        let mut app = setup_app();
        app.show_section(Section::Patients, &now()).unwrap();

        let outcome = app
            .dispatch(Action::CreatePatient(PatientForm::named("Maria")), &now())
            .unwrap();
        assert_eq!(
            outcome.notification.map(|n| n.kind),
            Some(NotificationKind::Success)
        );
        match outcome.view {
            SectionView::Patients { patients } => assert_eq!(patients.len(), 1),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_validation_error_becomes_notification() {
        let mut app = setup_app();
        app.show_section(Section::Patients, &now()).unwrap();

        let outcome = app
            .dispatch(Action::CreatePatient(PatientForm::named(" ")), &now())
            .unwrap();
        let notification = outcome.notification.unwrap();
        assert!(notification.is_error());
        assert_eq!(notification.message, "O nome é obrigatório");
        assert_eq!(outcome.view, SectionView::Patients { patients: vec![] });
    }

    #[test]
    fn test_missing_patient_reported_before_bad_date() {
        let mut app = setup_app();
        let outcome = app
            .dispatch(
                Action::CreateSchedule {
                    patient_id: None,
                    scheduled_at: "garbage".into(),
                },
                &now(),
            )
            .unwrap();
        assert_eq!(
            outcome.notification.unwrap().message,
            "Selecione um paciente e uma data"
        );
    }

    #[test]
    fn test_reschedule_with_blank_date() {
        let mut app = setup_app();
        let patient = app.patients().create(PatientForm::named("Maria")).unwrap();
        let at = parse_schedule_input("2026-11-04T09:00").unwrap();
        let schedule = app.schedules().create(Some(&patient.id), at).unwrap();

        let outcome = app
            .dispatch(
                Action::RescheduleSchedule {
                    id: schedule.id.clone(),
                    scheduled_at: "  ".into(),
                },
                &now(),
            )
            .unwrap();
        assert_eq!(outcome.notification.unwrap().message, "Selecione uma data");
        assert_eq!(
            app.schedules().get(&schedule.id).unwrap().scheduled_at,
            schedule.scheduled_at
        );
    }

    #[test]
    fn test_declined_delete_has_no_notification() {
        let mut app = setup_app();
        let patient = app.patients().create(PatientForm::named("Maria")).unwrap();

        let outcome = app
            .dispatch(
                Action::DeletePatient {
                    id: patient.id.clone(),
                    confirmation: Confirmation::Declined,
                },
                &now(),
            )
            .unwrap();
        assert_eq!(outcome.notification, None);
        assert!(app.patients().get(&patient.id).is_ok());
    }

    #[test]
    fn test_payment_flow_updates_financial_view() {
        let mut app = setup_app();
        let patient = app.patients().create(PatientForm::named("Maria")).unwrap();
        app.dispatch(
            Action::CreateSchedule {
                patient_id: Some(patient.id.clone()),
                scheduled_at: "2026-11-03T14:00".into(),
            },
            &now(),
        )
        .unwrap();
        let schedule = app.schedules().list().unwrap().remove(0);

        app.show_section(Section::Financial, &now()).unwrap();
        let outcome = app
            .dispatch(
                Action::CompletePayment {
                    schedule_id: schedule.id.clone(),
                    amount: "50,00".into(),
                    method: "pix".into(),
                },
                &now(),
            )
            .unwrap();

        match outcome.view {
            SectionView::Financial(summary) => {
                assert_eq!(summary.monthly_total.cents(), 5000);
                assert_eq!(summary.transactions.len(), 1);
                assert_eq!(summary.transactions[0].schedule_id, schedule.id);
            }
            other => panic!("unexpected view: {:?}", other),
        }
        assert!(app.schedules().list().unwrap().is_empty());
    }

    #[test]
    fn test_financial_filter_kept_in_state() {
        let mut app = setup_app();
        let filter = TransactionFilter {
            method: Some("Dinheiro".into()),
            ..TransactionFilter::default()
        };
        app.dispatch(Action::ShowSection(Section::Financial), &now())
            .unwrap();
        app.dispatch(Action::SetFinancialFilter(filter.clone()), &now())
            .unwrap();
        assert_eq!(app.state().financial_filter, filter);
    }

    #[test]
    fn test_browser_storage_round_trip() {
        let app = setup_app();
        app.patients().create(PatientForm::named("Maria")).unwrap();
        let entries = app.export_browser_storage().unwrap();

        let other = setup_app();
        let report = other.import_browser_storage(entries).unwrap();
        assert_eq!(report.patients, 1);
        assert_eq!(other.patients().list().unwrap()[0].name, "Maria");
    }
}
