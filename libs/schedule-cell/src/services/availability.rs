use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityRequest, DoctorDayAvailability, DoctorRow, ScheduleException, Slot, SlotStatus,
    WeeklySchedule,
};
use crate::services::slots::{generate_slots, weekday_index, NoBookings};

/// Longest date range one availability query may span.
const MAX_RANGE_DAYS: i64 = 30;

/// Read path over the schedule store: turns weekly schedules plus
/// exceptions into concrete available slots across a date range. Pure
/// recomputation on every call; nothing is cached.
pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// The multi-day, multi-doctor availability query. Returns one entry
    /// per (doctor, date) that has at least one available slot; dates or
    /// doctors with nothing free are omitted entirely.
    pub async fn find_available(
        &self,
        request: AvailabilityRequest,
    ) -> Result<Vec<DoctorDayAvailability>, AppError> {
        validate_range(
            request.start_date,
            request.end_date,
            Utc::now().date_naive(),
        )?;

        let doctors = self
            .list_doctors(request.specialty_id, request.doctor_id)
            .await?;
        let specialty_names = self.specialty_names().await?;

        // Exceptions are fetched for the whole range in one go.
        let range_start = request.start_date.and_time(NaiveTime::MIN).and_utc();
        let range_end = request
            .end_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::ValidationError("End date out of range".to_string()))?
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut results = Vec::new();

        for doctor in doctors {
            let schedules_by_day = self.active_schedules_by_day(doctor.id).await?;
            let exceptions = self
                .exceptions_in_range(doctor.id, range_start, range_end)
                .await?;

            let specialty = specialty_names
                .get(&doctor.specialty_id)
                .cloned()
                .unwrap_or_default();

            for date in request
                .start_date
                .iter_days()
                .take_while(|d| *d <= request.end_date)
            {
                let schedule = schedules_by_day.get(&weekday_index(date));
                let mut slots = generate_slots(schedule, &exceptions, &NoBookings, date);
                slots.retain(|slot| slot.status == SlotStatus::Available);

                if slots.is_empty() {
                    continue;
                }

                results.push(DoctorDayAvailability {
                    doctor_id: doctor.id,
                    doctor_name: doctor.full_name(),
                    specialty: specialty.clone(),
                    date,
                    slots,
                });
            }
        }

        debug!("Availability query produced {} entries", results.len());
        Ok(results)
    }

    /// Single-day calendar view for one doctor: every slot with its
    /// status, blocked and booked included.
    pub async fn day_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, AppError> {
        let schedules_by_day = self.active_schedules_by_day(doctor_id).await?;

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::ValidationError("Date out of range".to_string()))?
            .and_time(NaiveTime::MIN)
            .and_utc();
        let exceptions = self
            .exceptions_in_range(doctor_id, day_start, day_end)
            .await?;

        let schedule = schedules_by_day.get(&weekday_index(date));
        Ok(generate_slots(schedule, &exceptions, &NoBookings, date))
    }

    async fn list_doctors(
        &self,
        specialty_id: Option<Uuid>,
        doctor_id: Option<Uuid>,
    ) -> Result<Vec<DoctorRow>, AppError> {
        let mut path =
            "/rest/v1/doctors?active=eq.true&order=first_name.asc,last_name.asc".to_string();

        if let Some(specialty_id) = specialty_id {
            path.push_str(&format!("&specialty_id=eq.{}", specialty_id));
        }
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&id=eq.{}", doctor_id));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorRow>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn specialty_names(&self) -> Result<HashMap<Uuid, String>, AppError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/specialties", None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut names = HashMap::new();
        for row in result {
            if let (Some(id), Some(name)) = (
                row["id"].as_str().and_then(|s| s.parse::<Uuid>().ok()),
                row["name"].as_str(),
            ) {
                names.insert(id, name.to_string());
            }
        }

        Ok(names)
    }

    /// Active weekly schedules keyed by weekday. If the store ever holds
    /// two active rows for one weekday the earliest-created wins, so the
    /// result stays deterministic even on inconsistent data.
    async fn active_schedules_by_day(
        &self,
        doctor_id: Uuid,
    ) -> Result<HashMap<i16, WeeklySchedule>, AppError> {
        let path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&active=eq.true&order=day_of_week.asc,created_at.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_day: HashMap<i16, WeeklySchedule> = HashMap::new();
        for row in result {
            let schedule: WeeklySchedule =
                serde_json::from_value(row).map_err(|e| AppError::Database(e.to_string()))?;
            by_day
                .entry(schedule.day_of_week)
                .or_insert(schedule);
        }

        Ok(by_day)
    }

    async fn exceptions_in_range(
        &self,
        doctor_id: Uuid,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> Result<Vec<ScheduleException>, AppError> {
        let path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&end_at=gt.{}&start_at=lt.{}&order=start_at.asc",
            doctor_id,
            from.to_rfc3339(),
            to.to_rfc3339()
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ScheduleException>, _>>()
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Boundary validation for the availability query. Runs before any
/// store read; violations never produce a partial result.
fn validate_range(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::ValidationError(
            "Start date must be on or before end date".to_string(),
        ));
    }
    if start < today {
        return Err(AppError::ValidationError(
            "Start date cannot be in the past".to_string(),
        ));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(AppError::ValidationError(format!(
            "Date range cannot exceed {} days",
            MAX_RANGE_DAYS
        )));
    }

    Ok(())
}
