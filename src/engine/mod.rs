//! Clock-in / clock-out decision engine.
//!
//! Per employee there are two states, inferred on every request from the
//! ledger: `NOT_CLOCKED_IN` (no open record) and `CLOCKED_IN`. A clock-in
//! opens a record classified ON_TIME or LATE against the governing shift; a
//! clock-out closes it and flags early departure, overtime and completion.

pub mod identity;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::ClockError;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, ClockOutEntry, ClockState, NewClockIn, RecordFilter,
    work_minutes,
};
use crate::model::credential::Credential;
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::shift::{NewShift, Shift};
use crate::store::{AttendanceLedger, ShiftCatalog, StoreError};
use identity::IdentityResolver;

/// Source of "now" for clock decisions, local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    /// Whole seconds, matching the `DATETIME` columns the ledger stores.
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }
}

/// Settable clock for tests.
#[cfg(test)]
pub struct FixedClock(std::sync::Mutex<NaiveDateTime>);

#[cfg(test)]
impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self(std::sync::Mutex::new(now)))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClockPolicy {
    /// Leaving up to this many minutes before the scheduled end is not early.
    pub early_departure_margin_minutes: u32,
    /// Share of the scheduled duration that counts as a completed shift.
    pub completion_ratio: f64,
}

impl Default for ClockPolicy {
    fn default() -> Self {
        Self {
            early_departure_margin_minutes: 0,
            completion_ratio: 0.9,
        }
    }
}

/// Kiosk clock-in / clock-out payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClockRequest {
    /// Employee code the kiosk believes it is serving; must agree with the credential.
    #[schema(example = "EMP-001", nullable = true)]
    pub employee_id: Option<String>,
    pub credential: Credential,
    #[schema(example = "Front desk kiosk", nullable = true)]
    pub location: Option<String>,
    #[schema(nullable = true)]
    pub photo_url: Option<String>,
    /// Only stored on clock-out.
    #[schema(nullable = true)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Verification {
    pub employee: EmployeeSummary,
    pub shift: Shift,
    /// Whether "now" falls inside the shift window.
    pub within_shift: bool,
    pub current_state: ClockState,
}

/// What a clock-out at a given instant means for an open record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub work_minutes: u32,
    pub early_departure: bool,
    pub overtime_minutes: u32,
    pub shift_completed: bool,
}

pub fn evaluate_departure(
    record: &AttendanceRecord,
    clock_out: NaiveDateTime,
    policy: &ClockPolicy,
) -> Departure {
    let worked = work_minutes(record.clock_in_time, clock_out);
    let expected = record.expected_minutes().max(0);
    let leave_from =
        record.scheduled_end - Duration::minutes(i64::from(policy.early_departure_margin_minutes));
    let overtime = (i64::from(worked) - expected).max(0);

    Departure {
        work_minutes: worked,
        early_departure: clock_out < leave_from,
        overtime_minutes: u32::try_from(overtime).unwrap_or(u32::MAX),
        shift_completed: f64::from(worked) >= policy.completion_ratio * expected as f64,
    }
}

pub struct ClockEngine {
    resolver: IdentityResolver,
    shifts: Arc<dyn ShiftCatalog>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    policy: ClockPolicy,
}

impl ClockEngine {
    pub fn new(
        resolver: IdentityResolver,
        shifts: Arc<dyn ShiftCatalog>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
        policy: ClockPolicy,
    ) -> Self {
        Self {
            resolver,
            shifts,
            ledger,
            clock,
            policy,
        }
    }

    /// Identity and shift check for the kiosk pre-flight; writes nothing.
    #[instrument(name = "attendance_verify", skip(self, credential), fields(method = %credential.method()))]
    pub async fn verify(&self, credential: &Credential) -> Result<Verification, ClockError> {
        let employee = self.resolver.resolve(credential).await?;
        let shift = self.shift_for(&employee).await?;
        let current_state = match self.ledger.find_open_record(employee.id).await? {
            Some(_) => ClockState::ClockedIn,
            None => ClockState::NotClockedIn,
        };

        Ok(Verification {
            employee: employee.summary(),
            within_shift: shift.is_within_shift(self.clock.now().time()),
            shift,
            current_state,
        })
    }

    #[instrument(name = "attendance_clock_in", skip(self, request), fields(method = %request.credential.method()))]
    pub async fn clock_in(&self, request: ClockRequest) -> Result<AttendanceRecord, ClockError> {
        let employee = self.identify(&request).await?;
        let shift = self.shift_for(&employee).await?;

        if self.ledger.find_open_record(employee.id).await?.is_some() {
            info!(employee_code = %employee.employee_code, "Clock-in refused: already clocked in");
            return Err(ClockError::AlreadyClockedIn);
        }

        let now = self.clock.now();
        let arrival = shift.check_arrival(now.time());
        let occurrence = shift.occurrence_for(now);
        let status = if arrival.on_time {
            AttendanceStatus::OnTime
        } else {
            AttendanceStatus::Late
        };

        let entry = NewClockIn {
            employee_id: employee.id,
            shift_id: shift.id,
            clock_in_time: now,
            method: request.credential.method(),
            status,
            minutes_late: arrival.minutes_late,
            scheduled_start: occurrence.start,
            scheduled_end: occurrence.end,
            location: request.location,
            photo_url: request.photo_url,
        };

        match self.ledger.insert_clock_in(entry).await {
            Ok(record) => {
                info!(
                    employee_code = %employee.employee_code,
                    record_id = record.id,
                    status = %record.status,
                    minutes_late = record.minutes_late,
                    "Clocked in"
                );
                Ok(record)
            }
            Err(StoreError::Conflict) => {
                warn!(employee_code = %employee.employee_code, "Concurrent clock-in lost the race");
                Err(ClockError::AlreadyClockedIn)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(name = "attendance_clock_out", skip(self, request), fields(method = %request.credential.method()))]
    pub async fn clock_out(&self, request: ClockRequest) -> Result<AttendanceRecord, ClockError> {
        let employee = self.identify(&request).await?;

        let open = self
            .ledger
            .find_open_record(employee.id)
            .await?
            .ok_or(ClockError::NotClockedIn)?;

        let now = self.clock.now();
        let departure = evaluate_departure(&open, now, &self.policy);

        let entry = ClockOutEntry {
            clock_out_time: now,
            method: request.credential.method(),
            location: request.location,
            photo_url: request.photo_url,
            notes: request.notes,
            early_departure: departure.early_departure,
            overtime_minutes: departure.overtime_minutes,
            shift_completed: departure.shift_completed,
        };

        let record = self.ledger.close_record(open.id, entry).await?;
        info!(
            employee_code = %employee.employee_code,
            record_id = record.id,
            work_minutes = departure.work_minutes,
            closing_status = %record.closing_status(),
            "Clocked out"
        );
        Ok(record)
    }

    pub async fn record(&self, record_id: u64) -> Result<AttendanceRecord, ClockError> {
        self.ledger
            .get_record(record_id)
            .await?
            .ok_or_else(|| ClockError::NotFound(format!("attendance record {}", record_id)))
    }

    /// Records clocked in on `day`, local time.
    pub async fn records_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, ClockError> {
        let from = day.and_time(chrono::NaiveTime::MIN);
        let filter = RecordFilter {
            from: Some(from),
            to: Some(from + Duration::days(1)),
            ..Default::default()
        };
        Ok(self.ledger.list_records(&filter).await?)
    }

    pub async fn today(&self) -> Result<Vec<AttendanceRecord>, ClockError> {
        self.records_on(self.clock.now().date()).await
    }

    /// Every open record, regardless of the day it was opened.
    pub async fn currently_present(&self) -> Result<Vec<AttendanceRecord>, ClockError> {
        let filter = RecordFilter {
            open_only: true,
            ..Default::default()
        };
        Ok(self.ledger.list_records(&filter).await?)
    }

    pub async fn history(
        &self,
        employee_code: &str,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<AttendanceRecord>, ClockError> {
        let employee = self
            .resolver
            .source()
            .find_by_code(employee_code)
            .await?
            .ok_or_else(|| ClockError::NotFound(format!("employee {:?}", employee_code)))?;

        let filter = RecordFilter {
            employee_id: Some(employee.id),
            from,
            to,
            open_only: false,
        };
        Ok(self.ledger.list_records(&filter).await?)
    }

    pub async fn shift(&self, shift_id: u64) -> Result<Shift, ClockError> {
        self.shifts
            .find_shift(shift_id)
            .await?
            .ok_or_else(|| ClockError::NotFound(format!("shift {}", shift_id)))
    }

    pub async fn list_shifts(&self, active_only: bool) -> Result<Vec<Shift>, ClockError> {
        Ok(self.shifts.list_shifts(active_only).await?)
    }

    pub async fn create_shift(&self, shift: NewShift) -> Result<Shift, ClockError> {
        shift.validate()?;
        match self.shifts.create_shift(&shift).await {
            Ok(created) => {
                info!(shift_id = created.id, name = %created.name, "Shift created");
                Ok(created)
            }
            Err(StoreError::Conflict) => Err(ClockError::Conflict(format!(
                "shift with name {:?} already exists",
                shift.name.trim()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn refresh_face_snapshot(&self) -> Result<usize, ClockError> {
        self.resolver.refresh_faces().await
    }

    async fn identify(&self, request: &ClockRequest) -> Result<Employee, ClockError> {
        let employee = self.resolver.resolve(&request.credential).await?;
        if let Some(claimed) = request.employee_id.as_deref() {
            if !claimed.trim().eq_ignore_ascii_case(&employee.employee_code) {
                warn!(
                    claimed = %claimed,
                    resolved = %employee.employee_code,
                    "Credential belongs to a different employee"
                );
                return Err(ClockError::InvalidCredential(
                    "credential does not belong to the requested employee".into(),
                ));
            }
        }
        Ok(employee)
    }

    async fn shift_for(&self, employee: &Employee) -> Result<Shift, ClockError> {
        self.shifts
            .find_shift(employee.shift_id)
            .await?
            .ok_or_else(|| ClockError::NotFound(format!("shift {}", employee.shift_id)))
    }
}
