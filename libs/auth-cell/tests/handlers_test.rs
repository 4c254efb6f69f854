use std::sync::Arc;

use axum::{extract::State, http::HeaderMap};
use assert_matches::assert_matches;

use auth_cell::handlers;
use shared_models::auth::UserRole;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Authorization", format!("Bearer {}", token).parse().unwrap());
    headers
}

#[tokio::test]
async fn validate_returns_user_details_for_good_token() {
    let config = TestConfig::default();
    let state: Arc<_> = config.to_arc();

    let user = TestUser::reception("front@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);

    let response = handlers::validate_token(State(state), bearer_headers(&token))
        .await
        .expect("validation should succeed");

    assert!(response.0.valid);
    assert_eq!(response.0.user_id, user.id);
    assert_eq!(response.0.role, Some(UserRole::Reception));
}

#[tokio::test]
async fn validate_rejects_expired_token() {
    let config = TestConfig::default();
    let state: Arc<_> = config.to_arc();

    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let result = handlers::validate_token(State(state), bearer_headers(&token)).await;
    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn validate_requires_authorization_header() {
    let config = TestConfig::default();
    let state: Arc<_> = config.to_arc();

    let result = handlers::validate_token(State(state), HeaderMap::new()).await;
    assert_matches!(result, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn verify_reports_invalid_without_failing() {
    let config = TestConfig::default();
    let state: Arc<_> = config.to_arc();

    let token = JwtTestUtils::create_malformed_token();
    let response = handlers::verify_token(State(state), bearer_headers(&token))
        .await
        .expect("verify never errors on bad tokens");

    assert_eq!(response.0["valid"], false);
}
