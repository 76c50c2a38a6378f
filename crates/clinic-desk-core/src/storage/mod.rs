//! Browser-storage compatible record store.
//!
//! The browser build kept each collection as one JSON array under a fixed
//! key. This module reads and writes that format so data can move between
//! browser storage and the embedded database:
//!
//! - [`load`] never fails: a missing or corrupt collection is empty, and
//!   records that cannot be converted are skipped with a warning.
//! - [`save`] replaces the whole collection with a single write.

mod legacy;

pub use legacy::*;

use std::collections::HashMap;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{Patient, Schedule, Transaction};

/// A named record collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Schedules,
    Transactions,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Patients,
        Collection::Schedules,
        Collection::Transactions,
    ];

    /// Storage key for this collection.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Schedules => "schedules",
            Collection::Transactions => "transactions",
        }
    }
}

/// A string key-value store, such as a browser's local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
}

impl KeyValueStore for HashMap<String, String> {
    fn get_item(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

/// A record that lives in one of the stored collections.
pub trait StoredRecord: Sized {
    const COLLECTION: Collection;

    /// Serialized shape of one record.
    type Wire: Serialize + DeserializeOwned;

    fn from_wire(wire: Self::Wire) -> Result<Self, String>;
    fn to_wire(&self) -> Self::Wire;
}

/// Load a whole collection. Absent or corrupt data yields an empty list.
pub fn load<T: StoredRecord>(store: &impl KeyValueStore) -> Vec<T> {
    decode_collection(store.get_item(T::COLLECTION.key()).as_deref())
}

/// Replace a whole collection.
pub fn save<T: StoredRecord>(
    store: &mut impl KeyValueStore,
    records: &[T],
) -> Result<(), serde_json::Error> {
    let encoded = encode_collection(records)?;
    store.set_item(T::COLLECTION.key(), encoded);
    Ok(())
}

/// Decode a serialized collection.
pub fn decode_collection<T: StoredRecord>(raw: Option<&str>) -> Vec<T> {
    let key = T::COLLECTION.key();
    let Some(raw) = raw else {
        return Vec::new();
    };

    let parsed = serde_json::from_str::<Option<Vec<serde_json::Value>>>(raw);
    let items = match parsed {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            warn!("stored collection {:?} is corrupt, treating as empty: {}", key, e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = serde_json::from_value::<T::Wire>(item)
                .map_err(|e| e.to_string())
                .and_then(T::from_wire);
            match record {
                Ok(record) => Some(record),
                Err(reason) => {
                    warn!("skipping {} record #{}: {}", key, index, reason);
                    None
                }
            }
        })
        .collect()
}

/// Serialize a collection to its stored form.
pub fn encode_collection<T: StoredRecord>(records: &[T]) -> Result<String, serde_json::Error> {
    let wire: Vec<T::Wire> = records.iter().map(StoredRecord::to_wire).collect();
    serde_json::to_string(&wire)
}

/// All three collections together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub patients: Vec<Patient>,
    pub schedules: Vec<Schedule>,
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    /// Load every collection from a store.
    pub fn load(store: &impl KeyValueStore) -> Self {
        Self {
            patients: load(store),
            schedules: load(store),
            transactions: load(store),
        }
    }

    /// Write every collection to a store.
    pub fn save(&self, store: &mut impl KeyValueStore) -> Result<(), serde_json::Error> {
        save(store, &self.patients)?;
        save(store, &self.schedules)?;
        save(store, &self.transactions)?;
        Ok(())
    }

    /// Key/value pairs as they would be written to browser storage.
    pub fn to_entries(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut store: HashMap<String, String> = HashMap::new();
        self.save(&mut store)?;
        Ok(Collection::ALL
            .iter()
            .filter_map(|c| store.remove_entry(c.key()))
            .collect())
    }

    /// Build a snapshot from key/value pairs read out of browser storage.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let store: HashMap<String, String> = entries.into_iter().collect();
        Self::load(&store)
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.schedules.is_empty() && self.transactions.is_empty()
    }
}
