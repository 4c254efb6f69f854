use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    CreateDoctorRequest, CreateSpecialtyRequest, Doctor, DoctorSearchFilters, Specialty,
    UpdateDoctorRequest,
};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Search doctor profiles. Free-text search matches name, email and
    /// license number; specialty and active-state filters narrow further.
    pub async fn search_doctors(
        &self,
        filters: DoctorSearchFilters,
        auth_token: Option<&str>,
    ) -> Result<Vec<Doctor>, AppError> {
        let mut path = "/rest/v1/doctors?order=first_name.asc,last_name.asc".to_string();

        if let Some(ref search) = filters.search {
            let pattern = search.replace(['(', ')', ','], " ");
            path.push_str(&format!(
                "&or=(first_name.ilike.*{p}*,last_name.ilike.*{p}*,email.ilike.*{p}*,license_number.ilike.*{p}*)",
                p = pattern.trim()
            ));
        }
        if let Some(specialty_id) = filters.specialty_id {
            path.push_str(&format!("&specialty_id=eq.{}", specialty_id));
        }
        if let Some(active) = filters.active {
            path.push_str(&format!("&active=eq.{}", active));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(doctors)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, AppError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a doctor profile. The linked user account receives the
    /// doctor role here, once, instead of being silently promoted on
    /// every later save.
    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, AppError> {
        debug!("Creating doctor profile for user {}", request.user_id);

        let existing: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/doctors?license_number=eq.{}",
                    request.license_number
                ),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(AppError::Conflict(
                "A doctor with this license number already exists".to_string(),
            ));
        }

        let doctor_data = json!({
            "user_id": request.user_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "specialty_id": request.specialty_id,
            "license_number": request.license_number,
            "office_phone": request.office_phone,
            "office": request.office,
            "active": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors",
                Some(auth_token),
                Some(doctor_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create doctor".to_string()))?;

        let doctor: Doctor =
            serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))?;

        // One-time role assignment for the linked account.
        let mut role_headers = reqwest::header::HeaderMap::new();
        role_headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/profiles?id=eq.{}", request.user_id),
                Some(auth_token),
                Some(json!({ "role": "doctor" })),
                Some(role_headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        debug!("Doctor profile created with ID: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, AppError> {
        debug!("Updating doctor: {}", doctor_id);

        // Ensure the profile exists before patching.
        self.get_doctor(doctor_id, Some(auth_token)).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(specialty_id) = request.specialty_id {
            update_data.insert("specialty_id".to_string(), json!(specialty_id));
        }
        if let Some(office_phone) = request.office_phone {
            update_data.insert("office_phone".to_string(), json!(office_phone));
        }
        if let Some(office) = request.office {
            update_data.insert("office".to_string(), json!(office));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to update doctor".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-deactivate a doctor. Profiles are never hard-deleted; the
    /// flag hides them from search and availability.
    pub async fn deactivate_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppError> {
        debug!("Deactivating doctor: {}", doctor_id);

        self.update_doctor(
            doctor_id,
            UpdateDoctorRequest {
                first_name: None,
                last_name: None,
                specialty_id: None,
                office_phone: None,
                office: None,
                active: Some(false),
            },
            auth_token,
        )
        .await?;

        Ok(())
    }

    pub async fn list_specialties(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<Specialty>, AppError> {
        let path = "/rest/v1/specialties?active=eq.true&order=name.asc";
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, auth_token, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let specialties = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Specialty>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(specialties)
    }

    pub async fn create_specialty(
        &self,
        request: CreateSpecialtyRequest,
        auth_token: &str,
    ) -> Result<Specialty, AppError> {
        let existing: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                &format!("/rest/v1/specialties?name=eq.{}", request.name),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(AppError::Conflict(
                "A specialty with this name already exists".to_string(),
            ));
        }

        let specialty_data = json!({
            "name": request.name,
            "description": request.description,
            "active": true,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/specialties",
                Some(auth_token),
                Some(specialty_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create specialty".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }
}
