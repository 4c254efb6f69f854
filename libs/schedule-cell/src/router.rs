use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;
use shared_utils::roles::{require_role, RoleGate};

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    // The booking screens browse these without a session.
    let public_routes = Router::new()
        .route("/availability", get(handlers::find_available))
        .route("/doctors/{doctor_id}/slots", get(handlers::get_day_slots))
        .route(
            "/doctors/{doctor_id}/weekly",
            get(handlers::list_weekly_schedules),
        );

    // Exception listings reveal why a doctor is away; staff only.
    let staff_routes = Router::new()
        .route(
            "/doctors/{doctor_id}/exceptions",
            get(handlers::list_exceptions),
        )
        .layer(middleware::from_fn_with_state(
            RoleGate::CLINIC_STAFF,
            require_role,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Schedule mutation; doctors manage their own rows, admins anyone's.
    let management_routes = Router::new()
        .route(
            "/doctors/{doctor_id}/weekly",
            post(handlers::create_weekly_schedule),
        )
        .route(
            "/weekly/{schedule_id}",
            put(handlers::update_weekly_schedule),
        )
        .route(
            "/weekly/{schedule_id}",
            delete(handlers::delete_weekly_schedule),
        )
        .route(
            "/doctors/{doctor_id}/exceptions",
            post(handlers::create_exception),
        )
        .route(
            "/exceptions/{exception_id}",
            delete(handlers::delete_exception),
        )
        .layer(middleware::from_fn_with_state(
            RoleGate::DOCTOR_OR_ADMIN,
            require_role,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .merge(management_routes)
        .with_state(state)
}
