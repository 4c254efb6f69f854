use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityRequest, CreateExceptionRequest, CreateWeeklyScheduleRequest,
    UpdateWeeklyScheduleRequest,
};
use crate::services::{AvailabilityService, ScheduleService};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub specialty_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DaySlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ExceptionRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================
//
// The availability browser, the day calendar, and weekly schedule
// listings back the public booking screens, so none of them require a
// session.

/// The availability browser: which doctors have free slots, per date.
#[axum::debug_handler]
pub async fn find_available(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let request = AvailabilityRequest {
        start_date: query.start_date,
        end_date: query.end_date,
        specialty_id: query.specialty_id,
        doctor_id: query.doctor_id,
    };

    let availability = availability_service.find_available(request).await?;

    Ok(Json(json!({
        "availability": availability,
        "total_entries": availability.len()
    })))
}

/// Single-day calendar for one doctor, every slot status included.
#[axum::debug_handler]
pub async fn get_day_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DaySlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service.day_slots(doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn list_weekly_schedules(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let schedules = schedule_service.list_weekly(doctor_id, None).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedules": schedules
    })))
}

// ==============================================================================
// CLINIC STAFF HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_exceptions(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ExceptionRangeQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let exceptions = schedule_service
        .list_exceptions(doctor_id, query.from, query.to, Some(auth.token()))
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "exceptions": exceptions
    })))
}

// ==============================================================================
// SCHEDULE MANAGEMENT HANDLERS (DOCTOR OR ADMIN; OWNERSHIP ENFORCED)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateWeeklyScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    schedule_service
        .authorize_manage(&user, doctor_id, auth.token())
        .await?;

    let schedule = schedule_service
        .create_weekly(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn update_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateWeeklyScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let existing = schedule_service
        .get_weekly_by_id(schedule_id, auth.token())
        .await?;
    schedule_service
        .authorize_manage(&user, existing.doctor_id, auth.token())
        .await?;

    let schedule = schedule_service
        .update_weekly(schedule_id, request, auth.token())
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn delete_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(schedule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let existing = schedule_service
        .get_weekly_by_id(schedule_id, auth.token())
        .await?;
    schedule_service
        .authorize_manage(&user, existing.doctor_id, auth.token())
        .await?;

    schedule_service
        .delete_weekly(schedule_id, auth.token())
        .await?;

    Ok(Json(json!({
        "deleted": true,
        "schedule_id": schedule_id
    })))
}

#[axum::debug_handler]
pub async fn create_exception(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateExceptionRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    schedule_service
        .authorize_manage(&user, doctor_id, auth.token())
        .await?;

    let exception = schedule_service
        .create_exception(doctor_id, request, &user, auth.token())
        .await?;

    Ok(Json(json!(exception)))
}

#[axum::debug_handler]
pub async fn delete_exception(
    State(state): State<Arc<AppConfig>>,
    Path(exception_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(&state);

    let existing = schedule_service
        .get_exception_by_id(exception_id, auth.token())
        .await?;
    schedule_service
        .authorize_manage(&user, existing.doctor_id, auth.token())
        .await?;

    schedule_service
        .delete_exception(exception_id, auth.token())
        .await?;

    Ok(Json(json!({
        "deleted": true,
        "exception_id": exception_id
    })))
}
