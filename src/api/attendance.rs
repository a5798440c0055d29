use crate::auth::auth::AuthUser;
use crate::engine::{
    absentee::find_absentees,
    geo::{self, GeoVerdict},
    state_machine::BulkMarkResult,
    summary::{DailySummary, summarize},
};
use crate::error::AttendanceError;
use crate::model::{attendance::AttendanceRecord, geofence::Location, person::Person};
use crate::state::{AppState, today};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = 23.8103)]
    pub latitude: Option<f64>,
    #[schema(example = 90.4125)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateLocationRequest {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    #[schema(example = 7)]
    pub person_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// One of unmarked, present, absent, late, excused (any case)
    #[schema(example = "excused")]
    pub status: String,
    #[schema(example = "Doctor's appointment")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkPresentRequest {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = json!([7, 8, 9]))]
    pub person_ids: Vec<u64>,
    #[schema(example = "Offsite training")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateQuery {
    /// Day to look at, defaults to today
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

/// Both coordinates or neither.
fn location_from(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<Location>, AttendanceError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Ok(Some(Location::new(lat, lng))),
        (None, None) => Ok(None),
        _ => Err(AttendanceError::InvalidLocation(
            "latitude and longitude must be sent together".to_string(),
        )),
    }
}

fn internal(context: &'static str) -> impl Fn(anyhow::Error) -> actix_web::Error {
    move |e| {
        error!(error = %e, "{context}");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "record": { "person_id": 7, "status": "present" }
        })),
        (status = 400, description = "Already checked in today, or location rejected", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_in", skip(auth, state, body), fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.require_person_id()?;
    let location = location_from(body.latitude, body.longitude)?;

    let now = Utc::now();
    let date = today();
    let is_late = state.late_policy.is_late(now);

    let lock = state.locks.get(person_id, date);
    let _guard = lock.lock().await;

    let record = state
        .attendance
        .check_in(person_id, date, now, location, is_late)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "record": record
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "worked_minutes": 482
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_out", skip(auth, state, body), fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<CheckOutRequest>>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.require_person_id()?;
    let location = match &body {
        Some(b) => location_from(b.latitude, b.longitude)?,
        None => None,
    };
    let date = today();

    let lock = state.locks.get(person_id, date);
    let _guard = lock.lock().await;

    let record = state
        .attendance
        .check_out(person_id, date, Utc::now(), location)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "worked_minutes": record.worked_minutes(),
        "record": record
    })))
}

/// The caller's own record for today
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, body = AttendanceRecord),
        (status = 404, description = "Not checked in yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_today(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.require_person_id()?;

    let record = state
        .records
        .get(person_id, today())
        .await
        .map_err(internal("Failed to fetch today's attendance"))?;

    match record {
        Some(r) => Ok(HttpResponse::Ok().json(r)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No attendance recorded today"
        }))),
    }
}

/// All attendance records for a day
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(DateQuery),
    responses(
        (status = 200, body = [AttendanceRecord]),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_by_date(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = query.date.unwrap_or_else(today);

    let records = state
        .records
        .list_by_date(date)
        .await
        .map_err(internal("Failed to list attendance"))?;

    Ok(HttpResponse::Ok().json(records))
}

/// Admin status override
#[utoipa::path(
    put,
    path = "/api/attendance/status",
    request_body = SetStatusRequest,
    responses(
        (status = 200, body = AttendanceRecord),
        (status = 400, description = "Invalid attendance status", body = Object, example = json!({
            "message": "Invalid attendance status: holiday"
        })),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(
    name = "attendance_set_status",
    skip(auth, state, body),
    fields(
        user_id = auth.user_id,
        username = %auth.username,
        person_id = body.person_id,
        date = %body.date
    )
)]
pub async fn set_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<SetStatusRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let body = body.into_inner();

    let lock = state.locks.get(body.person_id, body.date);
    let _guard = lock.lock().await;

    let record = state
        .attendance
        .admin_set_status(body.person_id, body.date, &body.status, body.notes)
        .await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Mark many people present for a day
#[utoipa::path(
    post,
    path = "/api/attendance/bulk-present",
    request_body = BulkPresentRequest,
    responses(
        (status = 200, description = "Per-id results", body = [BulkMarkResult]),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(
    name = "attendance_bulk_present",
    skip(auth, state, body),
    fields(
        user_id = auth.user_id,
        username = %auth.username,
        date = %body.date,
        count = body.person_ids.len()
    )
)]
pub async fn bulk_present(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<BulkPresentRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let body = body.into_inner();

    let roster: HashSet<u64> = state
        .roster
        .list_active_people()
        .await
        .map_err(internal("Failed to load roster"))?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let (known, unknown): (Vec<u64>, Vec<u64>) =
        body.person_ids.iter().partition(|id| roster.contains(*id));

    // lock in id order so overlapping bulk requests can't deadlock
    let mut lock_ids = known.clone();
    lock_ids.sort_unstable();
    lock_ids.dedup();
    let locks: Vec<_> = lock_ids
        .iter()
        .map(|&id| state.locks.get(id, body.date))
        .collect();
    let mut guards = Vec::with_capacity(locks.len());
    for lock in &locks {
        guards.push(lock.lock().await);
    }

    let mut marked = state
        .attendance
        .bulk_set_present(body.date, &known, body.notes)
        .await
        .into_iter();
    drop(guards);

    // answer in request order
    let results: Vec<BulkMarkResult> = body
        .person_ids
        .iter()
        .map(|&id| {
            if unknown.contains(&id) {
                BulkMarkResult {
                    person_id: id,
                    success: false,
                    record: None,
                    error: Some("unknown person".to_string()),
                }
            } else {
                marked.next().unwrap_or_else(|| BulkMarkResult {
                    person_id: id,
                    success: false,
                    record: None,
                    error: Some("not processed".to_string()),
                })
            }
        })
        .collect();

    info!(
        marked = results.iter().filter(|r| r.success).count(),
        failed = results.iter().filter(|r| !r.success).count(),
        "Bulk mark present finished"
    );
    Ok(HttpResponse::Ok().json(results))
}

/// People with no attendance, or marked absent, for a day
#[utoipa::path(
    get,
    path = "/api/attendance/absentees",
    params(DateQuery),
    responses(
        (status = 200, body = [Person]),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn absentees(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = query.date.unwrap_or_else(today);
    let (roster, records) = load_day(&state, date).await?;

    Ok(HttpResponse::Ok().json(find_absentees(date, &roster, &records)))
}

/// Dashboard counts for a day
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(DateQuery),
    responses(
        (status = 200, body = DailySummary),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = query.date.unwrap_or_else(today);
    let (roster, records) = load_day(&state, date).await?;

    Ok(HttpResponse::Ok().json(summarize(date, &roster, &records)))
}

/// Check a location against the configured geofences
#[utoipa::path(
    post,
    path = "/api/attendance/validate-location",
    request_body = ValidateLocationRequest,
    responses(
        (status = 200, body = GeoVerdict),
        (status = 400, description = "Malformed coordinates")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn validate_location(
    _auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ValidateLocationRequest>,
) -> actix_web::Result<impl Responder> {
    let fences = state
        .geofences
        .list_geofences()
        .await
        .map_err(internal("Failed to load geofences"))?;

    let verdict = geo::validate(Location::new(body.latitude, body.longitude), &fences)?;
    Ok(HttpResponse::Ok().json(verdict))
}

pub(crate) async fn load_day(
    state: &AppState,
    date: NaiveDate,
) -> actix_web::Result<(Vec<Person>, Vec<AttendanceRecord>)> {
    let roster = state
        .roster
        .list_active_people()
        .await
        .map_err(internal("Failed to load roster"))?;
    let records = state
        .records
        .list_by_date(date)
        .await
        .map_err(internal("Failed to list attendance"))?;
    Ok((roster, records))
}
