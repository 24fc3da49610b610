//! Storage seams the clock engine depends on.
//!
//! The engine never talks to a pool directly: employees, shifts and the
//! attendance ledger are reached through these traits so the MySQL backing
//! can be swapped for in-memory doubles in tests.

use async_trait::async_trait;
use derive_more::Display;

use crate::model::attendance::{AttendanceRecord, ClockOutEntry, NewClockIn, RecordFilter};
use crate::model::employee::Employee;
use crate::model::shift::{NewShift, Shift};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Display)]
pub enum StoreError {
    /// A uniqueness rule rejected the write (open record, shift name).
    #[display(fmt = "unique constraint violated")]
    Conflict,
    /// The record to close is missing or already closed.
    #[display(fmt = "record is not open")]
    NotOpen,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// An enrolled face vector, as captured in the matching snapshot.
#[derive(Debug, Clone)]
pub struct FaceProfile {
    pub employee_id: u64,
    pub encoding: Vec<f64>,
}

/// Read-only employee lookups by credential.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>, StoreError>;

    /// Case-insensitive lookup on the business-facing employee code.
    async fn find_by_code(&self, employee_code: &str) -> Result<Option<Employee>, StoreError>;

    /// Case-insensitive card lookup; an active holder wins over inactive ones.
    async fn find_by_rfid(&self, rfid_card_id: &str) -> Result<Option<Employee>, StoreError>;

    async fn find_by_fingerprint(&self, template: &str) -> Result<Option<Employee>, StoreError>;

    /// Face vectors of every active employee that has one enrolled.
    async fn active_face_profiles(&self) -> Result<Vec<FaceProfile>, StoreError>;
}

#[async_trait]
pub trait ShiftCatalog: Send + Sync {
    async fn find_shift(&self, id: u64) -> Result<Option<Shift>, StoreError>;

    async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>, StoreError>;

    /// Inserts a validated shift. A duplicate name yields `StoreError::Conflict`.
    async fn create_shift(&self, shift: &NewShift) -> Result<Shift, StoreError>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn find_open_record(
        &self,
        employee_id: u64,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Fails with `StoreError::Conflict` when the employee already has an
    /// open record. The check and the insert are one atomic step.
    async fn insert_clock_in(&self, entry: NewClockIn) -> Result<AttendanceRecord, StoreError>;

    /// Closes an open record and stores the floored work duration.
    /// Fails with `StoreError::NotOpen` if the record was already closed.
    async fn close_record(
        &self,
        record_id: u64,
        entry: ClockOutEntry,
    ) -> Result<AttendanceRecord, StoreError>;

    async fn get_record(&self, record_id: u64) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Matching records, most recent clock-in first.
    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError>;
}
