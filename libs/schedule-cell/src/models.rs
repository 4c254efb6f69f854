use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor's recurring attendance window for one weekday.
/// `day_of_week` runs Monday = 0 through Sunday = 6. At most one active
/// row may exist per (doctor, weekday); the write path enforces this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCategory {
    Vacation,
    MedicalLeave,
    Meeting,
    Training,
    Personal,
    Other,
}

/// A one-off blackout interval overriding the weekly schedule
/// (vacation, leave, meetings and so on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub category: ExceptionCategory,
    pub reason: String,
    pub all_day: bool,
    pub notified: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ScheduleException {
    /// Whether the exception blacks out the given instant.
    /// Half-open: the end instant itself is not covered.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        self.start_at <= instant && instant < self.end_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Blocked,
    Booked,
}

/// A derived bookable time unit. Never persisted; recomputed on every
/// query from the weekly schedule and exception list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: SlotStatus,
}

/// Serializes slot times as "HH:MM" for the JSON surface.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWeeklyScheduleRequest {
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWeeklyScheduleRequest {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub slot_duration_minutes: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExceptionRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub category: ExceptionCategory,
    pub reason: String,
    pub all_day: Option<bool>,
}

/// Parameters for the multi-day, multi-doctor availability query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub specialty_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

/// One (doctor, date) entry of the availability result. Entries with no
/// available slots are omitted entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorDayAvailability {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

/// The subset of the doctors table this cell reads. Profile management
/// itself lives in the doctor cell.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialty_id: Uuid,
    pub active: bool,
}

impl DoctorRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
