use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::engine::ClockEngine;
use crate::model::shift::NewShift;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShiftListQuery {
    /// Include deactivated shifts (default false)
    #[param(example = false)]
    pub include_inactive: Option<bool>,
}

/// List shifts, ordered by start time
#[utoipa::path(
    get,
    path = "/api/shifts",
    params(ShiftListQuery),
    responses(
        (status = 200, description = "Shifts", body = [crate::model::shift::Shift]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    engine: web::Data<ClockEngine>,
    query: web::Query<ShiftListQuery>,
) -> actix_web::Result<impl Responder> {
    let active_only = !query.include_inactive.unwrap_or(false);
    let shifts = engine.list_shifts(active_only).await?;
    Ok(HttpResponse::Ok().json(shifts))
}

/// Get one shift
#[utoipa::path(
    get,
    path = "/api/shifts/{id}",
    params(
        ("id" = u64, Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift", body = crate::model::shift::Shift),
        (status = 404, description = "Shift not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shift"
)]
pub async fn get_shift(
    engine: web::Data<ClockEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let shift = engine.shift(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shift))
}

/// Create a shift
#[utoipa::path(
    post,
    path = "/api/shifts",
    request_body(
        content = NewShift,
        description = "Shift window; 4 to 12 hours, may cross midnight",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Shift created", body = crate::model::shift::Shift),
        (status = 400, description = "Invalid shift window", body = Object, example = json!({
            "code": "INVALID_SHIFT",
            "message": "invalid shift: shift must last between 4 and 12 hours"
        })),
        (status = 409, description = "Shift name already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shift"
)]
pub async fn create_shift(
    engine: web::Data<ClockEngine>,
    payload: web::Json<NewShift>,
) -> actix_web::Result<impl Responder> {
    let shift = engine.create_shift(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(shift))
}
