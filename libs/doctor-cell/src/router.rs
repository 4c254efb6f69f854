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

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::search_doctors))
        .route("/specialties", get(handlers::list_specialties))
        .route("/{doctor_id}", get(handlers::get_doctor));

    // Profile management is administrator-only
    let admin_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/specialties", post(handlers::create_specialty))
        .route("/{doctor_id}", put(handlers::update_doctor))
        .route("/{doctor_id}", delete(handlers::deactivate_doctor))
        .layer(middleware::from_fn_with_state(
            RoleGate::ADMIN_ONLY,
            require_role,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
