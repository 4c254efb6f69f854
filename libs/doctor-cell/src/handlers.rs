use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CreateDoctorRequest, CreateSpecialtyRequest, DoctorSearchFilters, UpdateDoctorRequest,
};
use crate::services::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub search: Option<String>,
    pub specialty_id: Option<Uuid>,
    pub active: Option<bool>,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let filters = DoctorSearchFilters {
        search: query.search,
        specialty_id: query.specialty_id,
        // Public browsing only sees active doctors unless asked otherwise.
        active: Some(query.active.unwrap_or(true)),
    };

    let doctors = doctor_service.search_doctors(filters, None).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(doctor_id, None).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let specialties = doctor_service.list_specialties(None).await?;

    Ok(Json(json!({
        "specialties": specialties
    })))
}

// ==============================================================================
// ADMIN HANDLERS (ROLE GATE APPLIED IN THE ROUTER)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.create_doctor(request, auth.token()).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .update_doctor(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn deactivate_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    doctor_service
        .deactivate_doctor(doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "deactivated": true,
        "doctor_id": doctor_id
    })))
}

#[axum::debug_handler]
pub async fn create_specialty(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateSpecialtyRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let specialty = doctor_service
        .create_specialty(request, auth.token())
        .await?;

    Ok(Json(json!(specialty)))
}
