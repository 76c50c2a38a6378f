//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::text::compare_names;

/// Postal address of a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// Brazilian postal code (CEP), as typed
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (UF)
    pub state: String,
}

impl Address {
    /// Trim every field.
    pub fn normalized(self) -> Self {
        Self {
            postal_code: self.postal_code.trim().to_string(),
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            neighborhood: self.neighborhood.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
        }
    }

    /// Single-line rendering, e.g. `Rua A, 10 - Centro, Recife-PE`.
    ///
    /// Returns `None` when no street is recorded.
    pub fn summary_line(&self) -> Option<String> {
        if self.street.is_empty() {
            return None;
        }
        Some(format!(
            "{}, {} - {}, {}-{}",
            self.street, self.number, self.neighborhood, self.city, self.state
        ))
    }
}

/// Patient data as entered in the create/edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientForm {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub profession: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
    pub notes: Option<String>,
}

impl PatientForm {
    /// Create a form with only a name filled in.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trim text fields and drop optional ones left blank.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            birth_date: self.birth_date,
            profession: non_blank(self.profession),
            phone: non_blank(self.phone),
            address: self.address.normalized(),
            notes: non_blank(self.notes),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Unique record id
    pub id: String,
    /// Full name (required)
    pub name: String,
    /// Date of birth
    pub birth_date: Option<NaiveDate>,
    /// Occupation
    pub profession: Option<String>,
    /// Contact phone, as typed
    pub phone: Option<String>,
    /// Postal address
    pub address: Address,
    /// Free-form clinical/administrative notes
    pub notes: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with only a name.
    pub fn new(name: String) -> Self {
        Self::from_form(PatientForm::named(name))
    }

    /// Create a new patient from form data, assigning a fresh id.
    pub fn from_form(form: PatientForm) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let mut patient = Self {
            id: super::new_record_id(),
            name: String::new(),
            birth_date: None,
            profession: None,
            phone: None,
            address: Address::default(),
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        };
        patient.replace_details(form);
        patient
    }

    /// Replace every editable field, keeping id and creation time.
    pub fn replace_details(&mut self, form: PatientForm) {
        let form = form.normalized();
        self.name = form.name;
        self.birth_date = form.birth_date;
        self.profession = form.profession;
        self.phone = form.phone;
        self.address = form.address;
        self.notes = form.notes;
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Sort patients by name, locale-aware.
pub fn sort_by_name(patients: &mut [Patient]) {
    patients.sort_by(|a, b| compare_names(&a.name, &b.name));
}

/// A patient entry for the scheduling form's selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientOption {
    pub id: String,
    pub name: String,
}

impl From<&Patient> for PatientOption {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient.name.clone(),
        }
    }
}
