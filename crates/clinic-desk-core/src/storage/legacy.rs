//! Record shapes as the browser build serialized them.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, StoredRecord};
use crate::models::{
    parse_schedule_datetime, Address, Money, Patient, PaymentMethod, Schedule, Transaction,
};

/// Record id as written by the browser build: a millisecond timestamp
/// number, or a string for records created here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Number(i64),
    Text(String),
}

impl LegacyId {
    /// Convert to a record id. Blank ids are rejected.
    pub fn into_id(self) -> Result<String, String> {
        match self {
            LegacyId::Number(n) => Ok(n.to_string()),
            LegacyId::Text(s) if s.trim().is_empty() => Err("blank id".to_string()),
            LegacyId::Text(s) => Ok(s.trim().to_string()),
        }
    }

    /// Numeric ids go back out as numbers so the browser build reads them
    /// unchanged.
    pub fn from_id(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => LegacyId::Number(n),
            Err(_) => LegacyId::Text(id.to_string()),
        }
    }

    /// Creation time implied by a millisecond-timestamp id.
    fn created_at(&self) -> Option<String> {
        match self {
            LegacyId::Number(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .map(|dt| dt.to_rfc3339()),
            LegacyId::Text(_) => None,
        }
    }
}

/// Amounts were stored as numbers, but hand-edited data may carry strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyAmount {
    Number(f64),
    Text(String),
}

impl LegacyAmount {
    fn to_money(&self) -> Option<Money> {
        match self {
            LegacyAmount::Number(n) => Money::from_f64(*n),
            LegacyAmount::Text(s) => Money::parse(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyAddress {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPatient {
    pub id: LegacyId,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub nascimento: Option<String>,
    #[serde(default)]
    pub profissao: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub endereco: Option<LegacyAddress>,
    #[serde(default)]
    pub obs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySchedule {
    pub id: LegacyId,
    pub patient_id: LegacyId,
    #[serde(default)]
    pub patient_name: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTransaction {
    pub id: LegacyId,
    pub schedule_id: LegacyId,
    pub patient_id: LegacyId,
    #[serde(default)]
    pub patient_name: String,
    pub payment_date: String,
    pub amount: LegacyAmount,
    #[serde(default)]
    pub method: Option<String>,
}

// ============================================================================
// Patients
// ============================================================================

impl StoredRecord for Patient {
    const COLLECTION: Collection = Collection::Patients;
    type Wire = LegacyPatient;

    fn from_wire(wire: LegacyPatient) -> Result<Self, String> {
        let name = wire.nome.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return Err("patient without a name".to_string());
        }

        // The form's date input yields YYYY-MM-DD; anything else is dropped.
        let birth_date = wire
            .nascimento
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());

        let endereco = wire.endereco.unwrap_or_default();
        let address = Address {
            postal_code: endereco.cep.unwrap_or_default(),
            street: endereco.logradouro.unwrap_or_default(),
            number: endereco.numero.unwrap_or_default(),
            neighborhood: endereco.bairro.unwrap_or_default(),
            city: endereco.cidade.unwrap_or_default(),
            state: endereco.estado.unwrap_or_default(),
        }
        .normalized();

        let created_at = wire
            .id
            .created_at()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        Ok(Patient {
            id: wire.id.into_id()?,
            name,
            birth_date,
            profession: non_blank(wire.profissao),
            phone: non_blank(wire.telefone),
            address,
            notes: non_blank(wire.obs),
            updated_at: created_at.clone(),
            created_at,
        })
    }

    fn to_wire(&self) -> LegacyPatient {
        LegacyPatient {
            id: LegacyId::from_id(&self.id),
            nome: Some(self.name.clone()),
            nascimento: Some(
                self.birth_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            profissao: Some(self.profession.clone().unwrap_or_default()),
            telefone: Some(self.phone.clone().unwrap_or_default()),
            endereco: Some(LegacyAddress {
                cep: Some(self.address.postal_code.clone()),
                logradouro: Some(self.address.street.clone()),
                numero: Some(self.address.number.clone()),
                bairro: Some(self.address.neighborhood.clone()),
                cidade: Some(self.address.city.clone()),
                estado: Some(self.address.state.clone()),
            }),
            obs: Some(self.notes.clone().unwrap_or_default()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Schedules
// ============================================================================

impl StoredRecord for Schedule {
    const COLLECTION: Collection = Collection::Schedules;
    type Wire = LegacySchedule;

    fn from_wire(wire: LegacySchedule) -> Result<Self, String> {
        let scheduled_at = parse_schedule_datetime(&wire.date)
            .ok_or_else(|| format!("unreadable date {:?}", wire.date))?;
        let created_at = wire
            .id
            .created_at()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        Ok(Schedule {
            id: wire.id.into_id()?,
            patient_id: wire.patient_id.into_id()?,
            patient_name: wire.patient_name,
            scheduled_at: crate::models::truncate_to_second(scheduled_at),
            created_at,
        })
    }

    fn to_wire(&self) -> LegacySchedule {
        let format = if self.scheduled_at.second() == 0 {
            "%Y-%m-%dT%H:%M"
        } else {
            "%Y-%m-%dT%H:%M:%S"
        };
        LegacySchedule {
            id: LegacyId::from_id(&self.id),
            patient_id: LegacyId::from_id(&self.patient_id),
            patient_name: self.patient_name.clone(),
            date: self.scheduled_at.format(format).to_string(),
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

impl StoredRecord for Transaction {
    const COLLECTION: Collection = Collection::Transactions;
    type Wire = LegacyTransaction;

    fn from_wire(wire: LegacyTransaction) -> Result<Self, String> {
        let amount = wire
            .amount
            .to_money()
            .filter(Money::is_positive)
            .ok_or_else(|| format!("invalid amount {:?}", wire.amount))?;
        let method = wire
            .method
            .as_deref()
            .and_then(PaymentMethod::parse)
            .ok_or_else(|| "missing payment method".to_string())?;
        let paid_at = DateTime::parse_from_rfc3339(wire.payment_date.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("unreadable payment date {:?}: {}", wire.payment_date, e))?;

        Ok(Transaction {
            id: wire.id.into_id()?,
            schedule_id: wire.schedule_id.into_id()?,
            patient_id: wire.patient_id.into_id()?,
            patient_name: wire.patient_name,
            paid_at,
            amount,
            method,
        })
    }

    fn to_wire(&self) -> LegacyTransaction {
        LegacyTransaction {
            id: LegacyId::from_id(&self.id),
            schedule_id: LegacyId::from_id(&self.schedule_id),
            patient_id: LegacyId::from_id(&self.patient_id),
            patient_name: self.patient_name.clone(),
            payment_date: self.paid_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            amount: LegacyAmount::Number(self.amount.as_f64()),
            method: Some(self.method.label().to_string()),
        }
    }
}
