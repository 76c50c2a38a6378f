//! Domain models for the clinic desk.

mod money;
mod patient;
mod schedule;
mod text;
mod transaction;

pub use money::*;
pub use patient::*;
pub use schedule::*;
pub use text::*;
pub use transaction::*;

/// Generate a new record id.
///
/// UUIDv7 keeps ids time-ordered, like the millisecond ids the browser
/// version produced, while staying unique within the same millisecond.
pub fn new_record_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
