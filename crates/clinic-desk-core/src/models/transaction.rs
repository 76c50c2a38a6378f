//! Payment transaction models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::schedule::Schedule;

/// How a payment was made.
///
/// The labels offered by the payment form map to named variants; any other
/// label is kept verbatim. Labels are never rewritten, so what was entered
/// is what gets stored and exported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMethod {
    Pix,
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    /// Any other label, e.g. `pix` typed in lower case or `TED`
    Other(String),
}

impl PaymentMethod {
    /// Labels offered by the payment form.
    pub const FORM_OPTIONS: [PaymentMethod; 5] = [
        PaymentMethod::Pix,
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::BankTransfer,
    ];

    /// Parse a method label. Surrounding whitespace is trimmed; blank is
    /// `None`.
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return None;
        }

        let method = Self::FORM_OPTIONS
            .into_iter()
            .find(|option| option.label() == trimmed)
            .unwrap_or_else(|| Self::Other(trimmed.to_string()));
        Some(method)
    }

    /// Stored/display label.
    pub fn label(&self) -> &str {
        match self {
            Self::Pix => "Pix",
            Self::Cash => "Dinheiro",
            Self::CreditCard => "Cartão de Crédito",
            Self::DebitCard => "Cartão de Débito",
            Self::BankTransfer => "Transferência",
            Self::Other(label) => label,
        }
    }

    /// Exact match against a filter label, ignoring case and surrounding
    /// whitespace.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        !query.is_empty() && self.label().trim().to_lowercase() == query.to_lowercase()
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.label().to_string()
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "payment method must not be blank".to_string())
    }
}

/// A recorded payment for a completed appointment. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Unique record id
    pub id: String,
    /// The appointment this payment completed
    pub schedule_id: String,
    /// Patient who paid
    pub patient_id: String,
    /// Patient name copied from the appointment
    pub patient_name: String,
    /// When the payment was recorded
    pub paid_at: DateTime<Utc>,
    /// Amount paid
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
}

impl Transaction {
    /// Record a payment against a pending appointment.
    pub fn for_schedule(
        schedule: &Schedule,
        amount: Money,
        method: PaymentMethod,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: super::new_record_id(),
            schedule_id: schedule.id.clone(),
            patient_id: schedule.patient_id.clone(),
            patient_name: schedule.patient_name.clone(),
            paid_at,
            amount,
            method,
        }
    }
}
