use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::engine::{ClockEngine, ClockRequest};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::credential::Credential;

/// Attendance record plus the status to show once it is closed.
#[derive(Serialize, ToSchema)]
pub struct AttendanceResponse {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    /// EARLY_DEPARTURE when the employee left before the scheduled end,
    /// otherwise the arrival status.
    #[schema(example = "ON_TIME")]
    pub closing_status: AttendanceStatus,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        let closing_status = record.closing_status();
        Self {
            record,
            closing_status,
        }
    }
}

fn to_responses(records: Vec<AttendanceRecord>) -> Vec<AttendanceResponse> {
    records.into_iter().map(AttendanceResponse::from).collect()
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only records clocked in at or after this local time
    #[param(value_type = Option<String>, example = "2026-01-01T00:00:00")]
    pub from: Option<NaiveDateTime>,
    /// Only records clocked in before this local time
    #[param(value_type = Option<String>, example = "2026-02-01T00:00:00")]
    pub to: Option<NaiveDateTime>,
}

#[derive(Serialize, ToSchema)]
pub struct FaceSnapshotResponse {
    #[schema(example = 42)]
    pub profiles: usize,
}

/// Verify a credential without recording anything
#[utoipa::path(
    post,
    path = "/api/attendance/verify",
    request_body = Credential,
    responses(
        (status = 200, description = "Credential belongs to an active employee", body = crate::engine::Verification),
        (status = 401, description = "Credential invalid, unknown or ambiguous", body = Object, example = json!({
            "code": "NO_MATCH",
            "message": "credential not recognized"
        })),
        (status = 403, description = "Employee is not active"),
        (status = 404, description = "Employee or shift not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn verify(
    engine: web::Data<ClockEngine>,
    body: web::Json<Credential>,
) -> actix_web::Result<impl Responder> {
    let verification = engine.verify(&body).await?;
    Ok(HttpResponse::Ok().json(verification))
}

/// Clock in
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body = ClockRequest,
    responses(
        (status = 201, description = "Clocked in", body = AttendanceResponse),
        (status = 401, description = "Credential invalid, unknown or ambiguous"),
        (status = 403, description = "Employee is not active"),
        (status = 404, description = "Employee or shift not found"),
        (status = 409, description = "Already clocked in", body = Object, example = json!({
            "code": "ALREADY_CLOCKED_IN",
            "message": "already clocked in, please clock out first"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    engine: web::Data<ClockEngine>,
    body: web::Json<ClockRequest>,
) -> actix_web::Result<impl Responder> {
    let record = engine.clock_in(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(AttendanceResponse::from(record)))
}

/// Clock out
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Clocked out", body = AttendanceResponse),
        (status = 401, description = "Credential invalid, unknown or ambiguous"),
        (status = 403, description = "Employee is not active"),
        (status = 409, description = "No open clock-in", body = Object, example = json!({
            "code": "NOT_CLOCKED_IN",
            "message": "no open clock-in found, please clock in first"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    engine: web::Data<ClockEngine>,
    body: web::Json<ClockRequest>,
) -> actix_web::Result<impl Responder> {
    let record = engine.clock_out(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AttendanceResponse::from(record)))
}

/// Records clocked in today
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's records, newest first", body = [AttendanceResponse]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn today(engine: web::Data<ClockEngine>) -> actix_web::Result<impl Responder> {
    let records = engine.today().await?;
    Ok(HttpResponse::Ok().json(to_responses(records)))
}

/// Employees currently clocked in
#[utoipa::path(
    get,
    path = "/api/attendance/present",
    responses(
        (status = 200, description = "Open records, including ones opened on earlier days", body = [AttendanceResponse]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn present(engine: web::Data<ClockEngine>) -> actix_web::Result<impl Responder> {
    let records = engine.currently_present().await?;
    Ok(HttpResponse::Ok().json(to_responses(records)))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceResponse),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    engine: web::Data<ClockEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record = engine.record(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(AttendanceResponse::from(record)))
}

/// Attendance history of one employee
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_code}",
    params(
        ("employee_code" = String, Path, description = "Employee code"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Records, newest first", body = [AttendanceResponse]),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn employee_history(
    engine: web::Data<ClockEngine>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let records = engine.history(&path, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(to_responses(records)))
}

/// Reload enrolled face vectors
#[utoipa::path(
    post,
    path = "/api/attendance/face-snapshot/refresh",
    responses(
        (status = 200, description = "Snapshot reloaded", body = FaceSnapshotResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn refresh_face_snapshot(
    engine: web::Data<ClockEngine>,
) -> actix_web::Result<impl Responder> {
    let profiles = engine.refresh_face_snapshot().await?;
    Ok(HttpResponse::Ok().json(FaceSnapshotResponse { profiles }))
}
