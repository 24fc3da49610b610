use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMethod {
    Rfid,
    Pin,
    Facial,
    Fingerprint,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    OnTime,
    Late,
    EarlyDeparture,
    Absent,
}

/// Per-employee state, inferred from whether an open record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockState {
    NotClockedIn,
    ClockedIn,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "employee_id": 1,
        "shift_id": 2,
        "clock_in_time": "2026-01-05T09:04:00",
        "clock_in_method": "RFID",
        "clock_in_location": "Front desk kiosk",
        "clock_in_photo": null,
        "status": "ON_TIME",
        "minutes_late": 0,
        "scheduled_start": "2026-01-05T09:00:00",
        "scheduled_end": "2026-01-05T17:00:00",
        "clock_out_time": "2026-01-05T17:02:00",
        "clock_out_method": "PIN",
        "clock_out_location": "Front desk kiosk",
        "clock_out_photo": null,
        "notes": null,
        "early_departure": false,
        "work_duration_minutes": 478,
        "overtime_minutes": 0,
        "shift_completed": true
    })
)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub shift_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub clock_in_time: NaiveDateTime,
    pub clock_in_method: AuthMethod,
    pub clock_in_location: Option<String>,
    pub clock_in_photo: Option<String>,
    /// Arrival classification, fixed at clock-in.
    pub status: AttendanceStatus,
    pub minutes_late: u32,
    #[schema(value_type = String, format = "date-time")]
    pub scheduled_start: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub scheduled_end: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out_time: Option<NaiveDateTime>,
    pub clock_out_method: Option<AuthMethod>,
    pub clock_out_location: Option<String>,
    pub clock_out_photo: Option<String>,
    pub notes: Option<String>,
    pub early_departure: bool,
    pub work_duration_minutes: Option<u32>,
    pub overtime_minutes: Option<u32>,
    pub shift_completed: bool,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_out_time.is_none()
    }

    /// Status to report once the record is closed. Early departure takes
    /// precedence over the arrival classification, which stays in `status`.
    pub fn closing_status(&self) -> AttendanceStatus {
        if self.early_departure {
            AttendanceStatus::EarlyDeparture
        } else {
            self.status
        }
    }

    pub fn expected_minutes(&self) -> i64 {
        (self.scheduled_end - self.scheduled_start).num_minutes()
    }
}

/// Whole minutes between clock-in and clock-out, floored and never negative.
pub fn work_minutes(clock_in: NaiveDateTime, clock_out: NaiveDateTime) -> u32 {
    let minutes = (clock_out - clock_in).num_minutes().max(0);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone)]
pub struct NewClockIn {
    pub employee_id: u64,
    pub shift_id: u64,
    pub clock_in_time: NaiveDateTime,
    pub method: AuthMethod,
    pub status: AttendanceStatus,
    pub minutes_late: u32,
    pub scheduled_start: NaiveDateTime,
    pub scheduled_end: NaiveDateTime,
    pub location: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClockOutEntry {
    pub clock_out_time: NaiveDateTime,
    pub method: AuthMethod,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub early_departure: bool,
    pub overtime_minutes: u32,
    pub shift_completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub employee_id: Option<u64>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub open_only: bool,
}
