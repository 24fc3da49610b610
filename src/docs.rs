use crate::api::attendance::{AttendanceResponse, FaceSnapshotResponse};
use crate::engine::{ClockRequest, Verification};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AuthMethod, ClockState};
use crate::model::credential::Credential;
use crate::model::employee::{EmployeeSummary, EmploymentStatus};
use crate::model::shift::{NewShift, Shift};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Clock API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Clock

Kiosk-facing API that decides whether an employee may clock in or out, and
classifies each clock event against the employee's shift.

### Identification
A kiosk sends one credential per request, tagged by `method`:
- **RFID**: card ID, matched case-insensitively
- **PIN**: employee code plus a 4 to 6 digit PIN
- **FACIAL**: face vector, nearest enrolled vector under the match threshold
- **FINGERPRINT**: exact template match

### Clock rules
- One open record per employee; a second clock-in is refused with `409`
- Arrivals up to the shift's grace period are `ON_TIME`, later ones `LATE`
- Overnight shifts are evaluated against the evening start
- Clock-out computes work minutes, early departure, overtime and completion

### Errors
Every error body is `{ "code": "...", "message": "..." }`.
"#,
    ),
    paths(
        crate::api::attendance::verify,
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::today,
        crate::api::attendance::present,
        crate::api::attendance::get_record,
        crate::api::attendance::employee_history,
        crate::api::attendance::refresh_face_snapshot,

        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::create_shift
    ),
    components(
        schemas(
            Credential,
            ClockRequest,
            Verification,
            ClockState,
            AttendanceRecord,
            AttendanceResponse,
            AttendanceStatus,
            AuthMethod,
            EmployeeSummary,
            EmploymentStatus,
            FaceSnapshotResponse,
            Shift,
            NewShift
        )
    ),
    tags(
        (name = "Attendance", description = "Clock-in, clock-out and attendance queries"),
        (name = "Shift", description = "Shift management APIs"),
    )
)]
pub struct ApiDoc;
