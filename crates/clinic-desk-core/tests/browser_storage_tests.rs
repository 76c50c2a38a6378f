//! Importing and exporting the browser build's stored collections.

use chrono::{TimeZone, Utc};
use clinic_desk_core::app::ClinicApp;
use clinic_desk_core::config::ClinicConfig;
use clinic_desk_core::models::{Money, PaymentMethod};
use clinic_desk_core::storage::Snapshot;

const PATIENTS: &str = r#"[
    {"id": 1730000000000, "nome": "Ana Souza", "nascimento": "1990-02-28", "profissao": "Professora",
     "telefone": "(81) 98888-7777",
     "endereco": {"cep": "50050-000", "logradouro": "Rua da Aurora", "numero": "12",
                  "bairro": "Boa Vista", "cidade": "Recife", "estado": "PE"},
     "obs": ""},
    {"id": 1730000000001, "nome": "Bruno Lima", "nascimento": "", "profissao": "", "telefone": "",
     "endereco": {"cep": "", "logradouro": "", "numero": "", "bairro": "", "cidade": "", "estado": ""},
     "obs": "Retorno"}
]"#;

const SCHEDULES: &str = r#"[
    {"id": 1730000001000, "patientId": 1730000000000, "patientName": "Ana Souza", "date": "2026-11-04T09:00"},
    {"id": 1730000001001, "patientId": 1730000009999, "patientName": "Removida", "date": "2026-11-04T10:00"}
]"#;

const TRANSACTIONS: &str = r#"[
    {"id": 1730000002000, "scheduleId": 1730000001500, "patientId": 1730000000001,
     "patientName": "Bruno Lima", "paymentDate": "2026-10-05T13:00:00.000Z", "amount": 150, "method": "Cartão de Crédito"}
]"#;

fn entries(patients: &str, schedules: &str, transactions: &str) -> Vec<(String, String)> {
    vec![
        ("patients".to_string(), patients.to_string()),
        ("schedules".to_string(), schedules.to_string()),
        ("transactions".to_string(), transactions.to_string()),
    ]
}

fn setup_app() -> ClinicApp {
    ClinicApp::open_in_memory(ClinicConfig::default()).unwrap()
}

#[test]
fn test_import_browser_data() {
    let app = setup_app();
    let report = app
        .import_browser_storage(entries(PATIENTS, SCHEDULES, TRANSACTIONS))
        .unwrap();

    assert_eq!(report.patients, 2);
    assert_eq!(report.schedules, 1);
    assert_eq!(report.transactions, 1);
    // Schedule for a patient that no longer exists
    assert_eq!(report.skipped, 1);

    let ana = app.patients().get("1730000000000").unwrap();
    assert_eq!(ana.address.city, "Recife");
    assert_eq!(ana.notes, None);

    let transactions = app.db().list_transactions().unwrap();
    assert_eq!(transactions[0].amount, Money::from_cents(15000));
    assert_eq!(transactions[0].method, PaymentMethod::CreditCard);
    assert_eq!(
        transactions[0].paid_at,
        Utc.with_ymd_and_hms(2026, 10, 5, 13, 0, 0).unwrap()
    );
}

#[test]
fn test_corrupt_collection_imports_as_empty() {
    let app = setup_app();
    let report = app
        .import_browser_storage(entries(PATIENTS, "{{{ not json", TRANSACTIONS))
        .unwrap();

    assert_eq!(report.patients, 2);
    assert_eq!(report.schedules, 0);
    assert_eq!(report.transactions, 1);
    assert!(app.db().list_schedules().unwrap().is_empty());
}

#[test]
fn test_missing_keys_import_as_empty() {
    let app = setup_app();
    let report = app.import_browser_storage(Vec::new()).unwrap();
    assert_eq!(report.patients + report.schedules + report.transactions, 0);
}

#[test]
fn test_export_matches_browser_format() {
    let app = setup_app();
    app.import_browser_storage(entries(PATIENTS, SCHEDULES, TRANSACTIONS))
        .unwrap();

    let exported = app.export_browser_storage().unwrap();
    let keys: Vec<_> = exported.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["patients", "schedules", "transactions"]);

    let patients: serde_json::Value = serde_json::from_str(&exported[0].1).unwrap();
    assert_eq!(patients[0]["id"], 1730000000000_i64);
    assert_eq!(patients[0]["nome"], "Ana Souza");
    assert_eq!(patients[0]["endereco"]["bairro"], "Boa Vista");

    let schedules: serde_json::Value = serde_json::from_str(&exported[1].1).unwrap();
    assert_eq!(schedules[0]["patientId"], 1730000000000_i64);
    assert_eq!(schedules[0]["date"], "2026-11-04T09:00");

    let transactions: serde_json::Value = serde_json::from_str(&exported[2].1).unwrap();
    assert_eq!(transactions[0]["amount"], 150.0);
    assert_eq!(transactions[0]["paymentDate"], "2026-10-05T13:00:00.000Z");
    assert_eq!(transactions[0]["method"], "Cartão de Crédito");
}

#[test]
fn test_export_then_import_is_stable() {
    let app = setup_app();
    app.import_browser_storage(entries(PATIENTS, SCHEDULES, TRANSACTIONS))
        .unwrap();
    let first = app.db().export_snapshot().unwrap();

    let other = setup_app();
    other
        .import_browser_storage(app.export_browser_storage().unwrap())
        .unwrap();
    let second: Snapshot = other.db().export_snapshot().unwrap();

    assert_eq!(first.patients, second.patients);
    assert_eq!(first.schedules, second.schedules);
    assert_eq!(first.transactions, second.transactions);
}
