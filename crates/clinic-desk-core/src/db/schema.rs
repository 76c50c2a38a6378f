//! SQLite schema definition.

/// Complete database schema for the clinic desk.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    birth_date TEXT,                             -- YYYY-MM-DD
    profession TEXT,
    phone TEXT,
    postal_code TEXT NOT NULL DEFAULT '',
    street TEXT NOT NULL DEFAULT '',
    number TEXT NOT NULL DEFAULT '',
    neighborhood TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Schedules (pending appointments)
-- ============================================================================

CREATE TABLE IF NOT EXISTS schedules (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    patient_name TEXT NOT NULL,                  -- snapshot at booking time
    scheduled_at TEXT NOT NULL,                  -- local wall clock, YYYY-MM-DDTHH:MM:SS
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_schedules_patient ON schedules(patient_id);
CREATE INDEX IF NOT EXISTS idx_schedules_scheduled_at ON schedules(scheduled_at);

-- ============================================================================
-- Transactions (payments, immutable)
-- ============================================================================

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL UNIQUE,            -- completed schedule, no longer pending
    patient_id TEXT NOT NULL REFERENCES patients(id),
    patient_name TEXT NOT NULL,
    paid_at TEXT NOT NULL,                       -- UTC, RFC 3339 with milliseconds
    amount_cents INTEGER NOT NULL CHECK (amount_cents BETWEEN 1 AND 1000000000000),
    method TEXT NOT NULL CHECK (length(trim(method)) > 0)
);

CREATE INDEX IF NOT EXISTS idx_transactions_patient ON transactions(patient_id);
CREATE INDEX IF NOT EXISTS idx_transactions_paid_at ON transactions(paid_at);

-- A schedule is either pending or paid, never both
CREATE TRIGGER IF NOT EXISTS schedules_check_unpaid BEFORE INSERT ON schedules
WHEN EXISTS (SELECT 1 FROM transactions WHERE schedule_id = new.id)
BEGIN
    SELECT RAISE(ABORT, 'Schedule has already been paid');
END;

CREATE TRIGGER IF NOT EXISTS transactions_immutable BEFORE UPDATE ON transactions
BEGIN
    SELECT RAISE(ABORT, 'Transactions are immutable');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO patients (id, name, created_at, updated_at) VALUES ('p1', 'Maria', 'x', 'x')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_reentrant() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_blank_patient_name_rejected() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO patients (id, name, created_at, updated_at) VALUES ('p2', '  ', 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_schedule_requires_existing_patient() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO schedules (id, patient_id, patient_name, scheduled_at, created_at)
             VALUES ('s1', 'missing', 'Ghost', '2026-11-03T14:00:00', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_paid_schedule_cannot_be_pending() {
        let conn = setup();
        conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t1', 's1', 'p1', 'Maria', '2026-11-03T17:00:00.000Z', 5000, 'Pix')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO schedules (id, patient_id, patient_name, scheduled_at, created_at)
             VALUES ('s1', 'p1', 'Maria', '2026-11-03T14:00:00', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_transaction_constraints() {
        let conn = setup();

        // Non-positive amount
        let result = conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t1', 's1', 'p1', 'Maria', '2026-11-03T17:00:00.000Z', 0, 'Pix')",
            [],
        );
        assert!(result.is_err());

        // Above the amount cap
        let result = conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t1', 's1', 'p1', 'Maria', '2026-11-03T17:00:00.000Z', 1000000000001, 'Pix')",
            [],
        );
        assert!(result.is_err());

        // Blank method
        let result = conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t1', 's1', 'p1', 'Maria', '2026-11-03T17:00:00.000Z', 100, ' ')",
            [],
        );
        assert!(result.is_err());

        // Valid, then immutable
        conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t1', 's1', 'p1', 'Maria', '2026-11-03T17:00:00.000Z', 100, 'Pix')",
            [],
        )
        .unwrap();
        let result = conn.execute("UPDATE transactions SET amount_cents = 1 WHERE id = 't1'", []);
        assert!(result.is_err());

        // One payment per schedule
        let result = conn.execute(
            "INSERT INTO transactions (id, schedule_id, patient_id, patient_name, paid_at, amount_cents, method)
             VALUES ('t2', 's1', 'p1', 'Maria', '2026-11-03T18:00:00.000Z', 100, 'Pix')",
            [],
        );
        assert!(result.is_err());
    }
}
