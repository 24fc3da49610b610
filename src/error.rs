use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::employee::EmploymentStatus;
use crate::store::StoreError;

/// Every failure the clock engine reports to a kiosk or dashboard. None of
/// them are retried server-side; the caller owns retry and re-arming.
#[derive(Debug, Display)]
pub enum ClockError {
    #[display(fmt = "{} not found", _0)]
    NotFound(String),
    #[display(fmt = "invalid credential: {}", _0)]
    InvalidCredential(String),
    #[display(fmt = "credential not recognized")]
    NoMatch,
    #[display(fmt = "credential matches more than one employee")]
    AmbiguousMatch,
    #[display(fmt = "employee account is {}, please contact HR", _0)]
    EmployeeInactive(EmploymentStatus),
    #[display(fmt = "already clocked in, please clock out first")]
    AlreadyClockedIn,
    #[display(fmt = "no open clock-in found, please clock in first")]
    NotClockedIn,
    #[display(fmt = "invalid shift: {}", _0)]
    InvalidShift(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "storage failure: {}", _0)]
    Storage(String),
}

impl std::error::Error for ClockError {}

impl ClockError {
    pub fn code(&self) -> &'static str {
        match self {
            ClockError::NotFound(_) => "NOT_FOUND",
            ClockError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            ClockError::NoMatch => "NO_MATCH",
            ClockError::AmbiguousMatch => "AMBIGUOUS_MATCH",
            ClockError::EmployeeInactive(_) => "EMPLOYEE_INACTIVE",
            ClockError::AlreadyClockedIn => "ALREADY_CLOCKED_IN",
            ClockError::NotClockedIn => "NOT_CLOCKED_IN",
            ClockError::InvalidShift(_) => "INVALID_SHIFT",
            ClockError::Conflict(_) => "CONFLICT",
            ClockError::Storage(_) => "STORAGE",
        }
    }
}

impl From<StoreError> for ClockError {
    fn from(err: StoreError) -> Self {
        match err {
            // A lost race on the open-record constraint is the same user-facing
            // outcome as a second clock-in.
            StoreError::Conflict => ClockError::AlreadyClockedIn,
            StoreError::NotOpen => ClockError::NotClockedIn,
            other => {
                tracing::error!(error = %other, "Attendance storage failure");
                ClockError::Storage(other.to_string())
            }
        }
    }
}

impl ResponseError for ClockError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClockError::NotFound(_) => StatusCode::NOT_FOUND,
            ClockError::InvalidCredential(_) | ClockError::NoMatch | ClockError::AmbiguousMatch => {
                StatusCode::UNAUTHORIZED
            }
            ClockError::EmployeeInactive(_) => StatusCode::FORBIDDEN,
            ClockError::AlreadyClockedIn | ClockError::NotClockedIn | ClockError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            ClockError::InvalidShift(_) => StatusCode::BAD_REQUEST,
            ClockError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ClockError::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.code(),
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_translates_to_already_clocked_in() {
        let err: ClockError = StoreError::Conflict.into();
        assert!(matches!(err, ClockError::AlreadyClockedIn));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_message_is_not_leaked() {
        let err: ClockError = StoreError::Corrupt("bad status column".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = err.error_response();
        let body = actix_web::body::to_bytes(resp.into_body());
        let bytes = futures::executor::block_on(body).unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("STORAGE"));
        assert!(!text.contains("bad status column"));
    }

    #[test]
    fn test_inactive_message_names_status() {
        let err = ClockError::EmployeeInactive(EmploymentStatus::Terminated);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.to_string().contains("TERMINATED"));
    }
}
