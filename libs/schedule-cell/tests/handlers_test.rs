use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, State};
use axum::Json;
use axum_extra::TypedHeader;
use chrono::{Duration, NaiveTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::handlers;
use schedule_cell::models::{
    CreateExceptionRequest, CreateWeeklyScheduleRequest, ExceptionCategory,
};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser};

fn mock_config(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_supabase_url(&server.uri()).to_arc()
}

fn auth_header() -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer("test-token").unwrap())
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn weekly_request() -> CreateWeeklyScheduleRequest {
    CreateWeeklyScheduleRequest {
        day_of_week: 0,
        start_time: time(9, 0),
        end_time: time(17, 0),
        slot_duration_minutes: 30,
    }
}

#[tokio::test]
async fn doctor_cannot_manage_another_doctors_schedule() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // The schedule belongs to a different user account.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": doctor_id,
            "user_id": Uuid::new_v4(),
            "first_name": "Ana",
            "last_name": "Reyes",
            "specialty_id": Uuid::new_v4(),
            "active": true
        }])))
        .mount(&server)
        .await;

    let state = mock_config(&server);
    let user = TestUser::doctor("other.doctor@clinic.example").to_user();

    let result = handlers::create_weekly_schedule(
        State(state),
        Path(doctor_id),
        auth_header(),
        Extension(user),
        Json(weekly_request()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn admin_create_rejects_inverted_time_window() {
    let server = MockServer::start().await;

    let state = mock_config(&server);
    let user = TestUser::admin("admin@clinic.example").to_user();

    let request = CreateWeeklyScheduleRequest {
        day_of_week: 2,
        start_time: time(17, 0),
        end_time: time(9, 0),
        slot_duration_minutes: 30,
    };

    let result = handlers::create_weekly_schedule(
        State(state),
        Path(Uuid::new_v4()),
        auth_header(),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn second_active_schedule_for_same_weekday_conflicts() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // The duplicate check finds an existing active Monday row.
    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "day_of_week": 0,
            "start_time": "08:00:00",
            "end_time": "12:00:00",
            "slot_duration_minutes": 30,
            "active": true,
            "created_at": Utc::now().to_rfc3339()
        }])))
        .mount(&server)
        .await;

    let state = mock_config(&server);
    let user = TestUser::admin("admin@clinic.example").to_user();

    let result = handlers::create_weekly_schedule(
        State(state),
        Path(doctor_id),
        auth_header(),
        Extension(user),
        Json(weekly_request()),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn past_dated_exception_is_rejected() {
    let server = MockServer::start().await;

    let state = mock_config(&server);
    let user = TestUser::admin("admin@clinic.example").to_user();

    let request = CreateExceptionRequest {
        start_at: Utc::now() - Duration::days(1),
        end_at: Utc::now() + Duration::hours(1),
        category: ExceptionCategory::Vacation,
        reason: "late paperwork".to_string(),
        all_day: None,
    };

    let result = handlers::create_exception(
        State(state),
        Path(Uuid::new_v4()),
        auth_header(),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn exception_with_inverted_window_is_rejected() {
    let server = MockServer::start().await;

    let state = mock_config(&server);
    let user = TestUser::admin("admin@clinic.example").to_user();

    let start = Utc::now() + Duration::days(2);
    let request = CreateExceptionRequest {
        start_at: start,
        end_at: start - Duration::hours(1),
        category: ExceptionCategory::Meeting,
        reason: "backwards".to_string(),
        all_day: None,
    };

    let result = handlers::create_exception(
        State(state),
        Path(Uuid::new_v4()),
        auth_header(),
        Extension(user),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn update_missing_schedule_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let state = mock_config(&server);
    let user = TestUser::admin("admin@clinic.example").to_user();

    let result = handlers::delete_weekly_schedule(
        State(state),
        Path(Uuid::new_v4()),
        auth_header(),
        Extension(user),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}
