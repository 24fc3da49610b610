use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    Inactive,
    Suspended,
    Terminated,
}

/// An employee as the clock engine sees it: identity, governing shift and
/// enrolled credentials. Records are owned by the HR workflow; the engine
/// only reads them.
#[derive(Clone)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub full_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: EmploymentStatus,
    pub shift_id: u64,
    pub rfid_card_id: Option<String>,
    pub pin_code: Option<String>,
    pub face_encoding: Option<Vec<f64>>,
    pub fingerprint_template: Option<String>,
}

// Credentials stay out of logs.
impl std::fmt::Debug for Employee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Employee")
            .field("id", &self.id)
            .field("employee_code", &self.employee_code)
            .field("status", &self.status)
            .field("shift_id", &self.shift_id)
            .finish_non_exhaustive()
    }
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmploymentStatus::Active
    }

    pub fn summary(&self) -> EmployeeSummary {
        EmployeeSummary {
            id: self.id,
            employee_code: self.employee_code.clone(),
            full_name: self.full_name.clone(),
            department: self.department.clone(),
            position: self.position.clone(),
            shift_id: self.shift_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "full_name": "John Doe",
        "department": "Operations",
        "position": "Technician",
        "shift_id": 2
    })
)]
pub struct EmployeeSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "Operations", nullable = true)]
    pub department: Option<String>,
    #[schema(example = "Technician", nullable = true)]
    pub position: Option<String>,
    #[schema(example = 2)]
    pub shift_id: u64,
}
