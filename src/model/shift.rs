use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ClockError;

pub const MINUTES_PER_DAY: i64 = 24 * 60;
const MIN_SHIFT_MINUTES: i64 = 4 * 60;
const MAX_SHIFT_MINUTES: i64 = 12 * 60;
const DEFAULT_GRACE_MINUTES: u32 = 15;

/// Minutes elapsed since midnight, seconds dropped.
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Morning Shift",
        "start_time": "09:00:00",
        "end_time": "17:00:00",
        "grace_period_minutes": 15,
        "is_active": true
    })
)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Morning Shift")]
    pub name: String,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 15)]
    pub grace_period_minutes: u32,
    #[schema(example = true)]
    pub is_active: bool,
}

/// Outcome of comparing a clock-in against the shift start plus grace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalCheck {
    pub on_time: bool,
    pub minutes_late: u32,
}

/// The concrete instance of a shift a clock-in belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftOccurrence {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Shift {
    pub fn wraps_midnight(&self) -> bool {
        self.end_time < self.start_time
    }

    pub fn duration_minutes(&self) -> i64 {
        window_minutes(self.start_time, self.end_time)
    }

    pub fn is_within_shift(&self, time: NaiveTime) -> bool {
        let (start, end, t) = self.minutes(time);
        if self.wraps_midnight() {
            t >= start || t <= end
        } else {
            t >= start && t <= end
        }
    }

    /// Minutes between the shift start and `time`. Negative for arrivals
    /// ahead of the start; the wrapped tail of an overnight shift counts
    /// from the previous evening's start.
    fn elapsed_since_start(&self, time: NaiveTime) -> i64 {
        let (start, _, t) = self.minutes(time);
        if self.in_wrapped_tail(time) {
            t + MINUTES_PER_DAY - start
        } else {
            t - start
        }
    }

    fn in_wrapped_tail(&self, time: NaiveTime) -> bool {
        let (start, end, t) = self.minutes(time);
        self.wraps_midnight() && t < start && t <= end
    }

    pub fn check_arrival(&self, time: NaiveTime) -> ArrivalCheck {
        let grace = i64::from(self.grace_period_minutes);
        let elapsed = self.elapsed_since_start(time);
        let late_by = (elapsed - grace).max(0);
        ArrivalCheck {
            on_time: elapsed <= grace,
            minutes_late: u32::try_from(late_by).unwrap_or(u32::MAX),
        }
    }

    pub fn occurrence_for(&self, clock_in: NaiveDateTime) -> ShiftOccurrence {
        let mut start = clock_in.date().and_time(self.start_time);
        if self.in_wrapped_tail(clock_in.time()) {
            start -= Duration::days(1);
        }
        ShiftOccurrence {
            start,
            end: start + Duration::minutes(self.duration_minutes()),
        }
    }

    fn minutes(&self, time: NaiveTime) -> (i64, i64, i64) {
        (
            minutes_of_day(self.start_time),
            minutes_of_day(self.end_time),
            minutes_of_day(time),
        )
    }
}

fn window_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    let (start, end) = (minutes_of_day(start), minutes_of_day(end));
    if end > start {
        end - start
    } else {
        end + MINUTES_PER_DAY - start
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewShift {
    #[schema(example = "Night Shift")]
    pub name: String,
    #[schema(example = "22:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "06:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 10, nullable = true)]
    pub grace_period_minutes: Option<u32>,
}

impl NewShift {
    pub fn grace(&self) -> u32 {
        self.grace_period_minutes.unwrap_or(DEFAULT_GRACE_MINUTES)
    }

    pub fn validate(&self) -> Result<(), ClockError> {
        if self.name.trim().is_empty() {
            return Err(ClockError::InvalidShift("shift name must not be empty".into()));
        }
        if minutes_of_day(self.start_time) == minutes_of_day(self.end_time) {
            return Err(ClockError::InvalidShift(
                "shift start and end times cannot be the same".into(),
            ));
        }

        let duration = window_minutes(self.start_time, self.end_time);
        if !(MIN_SHIFT_MINUTES..=MAX_SHIFT_MINUTES).contains(&duration) {
            return Err(ClockError::InvalidShift(format!(
                "shift must last between 4 and 12 hours, got {}h {}m",
                duration / 60,
                duration % 60
            )));
        }
        Ok(())
    }
}
