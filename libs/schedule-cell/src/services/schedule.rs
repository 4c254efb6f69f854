use chrono::{DateTime, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::roles::is_admin;

use crate::models::{
    CreateExceptionRequest, CreateWeeklyScheduleRequest, DoctorRow, ScheduleException,
    UpdateWeeklyScheduleRequest, WeeklySchedule,
};

/// Write path for weekly schedules and schedule exceptions. All the
/// invariants the slot generator relies on (ordered time windows,
/// positive durations, one active schedule per weekday, no past-dated
/// exceptions) are rejected here, at write time.
pub struct ScheduleService {
    supabase: SupabaseClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// A doctor may only manage their own schedule rows; admins may
    /// manage anyone's.
    pub async fn authorize_manage(
        &self,
        user: &User,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppError> {
        if is_admin(user) {
            return Ok(());
        }

        let doctor = self.get_doctor(doctor_id, auth_token).await?;

        if doctor.user_id.to_string() != user.id {
            return Err(AppError::Forbidden(
                "You may only manage your own schedule".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorRow, AppError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_weekly(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<WeeklySchedule>, AppError> {
        let path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&order=day_of_week.asc,created_at.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WeeklySchedule>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn create_weekly(
        &self,
        doctor_id: Uuid,
        request: CreateWeeklyScheduleRequest,
        auth_token: &str,
    ) -> Result<WeeklySchedule, AppError> {
        debug!("Creating weekly schedule for doctor {}", doctor_id);

        validate_weekly(
            request.day_of_week,
            request.start_time,
            request.end_time,
            request.slot_duration_minutes,
        )?;

        self.check_active_duplicate(doctor_id, request.day_of_week, None, auth_token)
            .await?;

        let schedule_data = json!({
            "doctor_id": doctor_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "slot_duration_minutes": request.slot_duration_minutes,
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
                "/rest/v1/weekly_schedules",
                Some(auth_token),
                Some(schedule_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create weekly schedule".to_string()))?;

        let schedule: WeeklySchedule =
            serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))?;

        debug!("Weekly schedule created with ID: {}", schedule.id);
        Ok(schedule)
    }

    pub async fn update_weekly(
        &self,
        schedule_id: Uuid,
        request: UpdateWeeklyScheduleRequest,
        auth_token: &str,
    ) -> Result<WeeklySchedule, AppError> {
        debug!("Updating weekly schedule: {}", schedule_id);

        let existing = self.get_weekly_by_id(schedule_id, auth_token).await?;

        let start_time = request.start_time.unwrap_or(existing.start_time);
        let end_time = request.end_time.unwrap_or(existing.end_time);
        let duration = request
            .slot_duration_minutes
            .unwrap_or(existing.slot_duration_minutes);

        validate_weekly(existing.day_of_week, start_time, end_time, duration)?;

        // Re-activating a disabled row must not produce a second active
        // schedule for the same weekday.
        if request.active == Some(true) && !existing.active {
            self.check_active_duplicate(
                existing.doctor_id,
                existing.day_of_week,
                Some(schedule_id),
                auth_token,
            )
            .await?;
        }

        let mut update_data = serde_json::Map::new();

        if let Some(start) = request.start_time {
            update_data.insert(
                "start_time".to_string(),
                json!(start.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(end) = request.end_time {
            update_data.insert(
                "end_time".to_string(),
                json!(end.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(duration) = request.slot_duration_minutes {
            update_data.insert("slot_duration_minutes".to_string(), json!(duration));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }

        let path = format!("/rest/v1/weekly_schedules?id=eq.{}", schedule_id);
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
            .ok_or_else(|| AppError::Database("Failed to update weekly schedule".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete_weekly(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppError> {
        debug!("Deleting weekly schedule: {}", schedule_id);

        // PostgREST answers deletes with an empty body unless asked for
        // the deleted rows.
        let path = format!("/rest/v1/weekly_schedules?id=eq.{}", schedule_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    pub async fn get_weekly_by_id(
        &self,
        schedule_id: Uuid,
        auth_token: &str,
    ) -> Result<WeeklySchedule, AppError> {
        let path = format!("/rest/v1/weekly_schedules?id=eq.{}", schedule_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Weekly schedule not found".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_exceptions(
        &self,
        doctor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        auth_token: Option<&str>,
    ) -> Result<Vec<ScheduleException>, AppError> {
        let mut path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&order=start_at.asc",
            doctor_id
        );

        if let Some(from) = from {
            path.push_str(&format!("&end_at=gt.{}", from.to_rfc3339()));
        }
        if let Some(to) = to {
            path.push_str(&format!("&start_at=lt.{}", to.to_rfc3339()));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ScheduleException>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn create_exception(
        &self,
        doctor_id: Uuid,
        request: CreateExceptionRequest,
        created_by: &User,
        auth_token: &str,
    ) -> Result<ScheduleException, AppError> {
        debug!(
            "Creating schedule exception for doctor {} from {}",
            doctor_id, request.start_at
        );

        if request.start_at >= request.end_at {
            return Err(AppError::ValidationError(
                "Exception start must be before its end".to_string(),
            ));
        }
        if request.start_at < Utc::now() {
            return Err(AppError::ValidationError(
                "Exceptions cannot be created for past dates".to_string(),
            ));
        }

        let exception_data = json!({
            "doctor_id": doctor_id,
            "start_at": request.start_at.to_rfc3339(),
            "end_at": request.end_at.to_rfc3339(),
            "category": request.category,
            "reason": request.reason,
            "all_day": request.all_day.unwrap_or(false),
            "notified": false,
            "created_by": created_by.id,
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
                "/rest/v1/schedule_exceptions",
                Some(auth_token),
                Some(exception_data),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create exception".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_exception_by_id(
        &self,
        exception_id: Uuid,
        auth_token: &str,
    ) -> Result<ScheduleException, AppError> {
        let path = format!("/rest/v1/schedule_exceptions?id=eq.{}", exception_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Schedule exception not found".to_string()))?;

        serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn delete_exception(
        &self,
        exception_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppError> {
        debug!("Deleting schedule exception: {}", exception_id);

        let path = format!("/rest/v1/schedule_exceptions?id=eq.{}", exception_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn check_active_duplicate(
        &self,
        doctor_id: Uuid,
        day_of_week: i16,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppError> {
        let mut path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&day_of_week=eq.{}&active=eq.true",
            doctor_id, day_of_week
        );

        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !existing.is_empty() {
            return Err(AppError::Conflict(
                "An active schedule already exists for this weekday".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_weekly(
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: i32,
) -> Result<(), AppError> {
    if !(0..=6).contains(&day_of_week) {
        return Err(AppError::ValidationError(
            "Day of week must be between 0 (Monday) and 6 (Sunday)".to_string(),
        ));
    }
    if start_time >= end_time {
        return Err(AppError::ValidationError(
            "Start time must be before end time".to_string(),
        ));
    }
    if slot_duration_minutes <= 0 {
        return Err(AppError::ValidationError(
            "Slot duration must be greater than 0 minutes".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert_matches!(
            validate_weekly(0, time(10, 0), time(9, 0), 30),
            Err(AppError::ValidationError(_))
        );
        assert_matches!(
            validate_weekly(0, time(9, 0), time(9, 0), 30),
            Err(AppError::ValidationError(_))
        );
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert_matches!(
            validate_weekly(0, time(9, 0), time(17, 0), 0),
            Err(AppError::ValidationError(_))
        );
        assert_matches!(
            validate_weekly(0, time(9, 0), time(17, 0), -15),
            Err(AppError::ValidationError(_))
        );
    }

    #[test]
    fn out_of_range_weekday_is_rejected() {
        assert_matches!(
            validate_weekly(7, time(9, 0), time(17, 0), 30),
            Err(AppError::ValidationError(_))
        );
        assert_matches!(
            validate_weekly(-1, time(9, 0), time(17, 0), 30),
            Err(AppError::ValidationError(_))
        );
    }

    #[test]
    fn well_formed_schedule_passes() {
        assert!(validate_weekly(4, time(8, 30), time(12, 0), 20).is_ok());
    }
}
