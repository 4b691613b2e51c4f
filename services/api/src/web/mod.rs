pub mod middleware;
pub mod rest;
pub mod scheduler;
pub mod state;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::post, Router};

use state::AppState;

/// Builds the conference lifecycle router.
///
/// Every endpoint is method-locked to POST; the bearer-auth middleware is
/// attached per method router so a non-POST request is rejected with 405
/// before any credential processing. Shared by the server binary and the
/// integration tests.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    let auth = axum_middleware::from_fn_with_state(app_state.clone(), middleware::require_auth);
    Router::new()
        .route(
            "/conference/delete",
            post(rest::delete_conference_handler).route_layer(auth.clone()),
        )
        .route(
            "/conference/duplicate",
            post(rest::duplicate_conference_handler).route_layer(auth.clone()),
        )
        .route(
            "/conference/refresh-dashboard",
            post(rest::refresh_dashboard_handler).route_layer(auth.clone()),
        )
        .route(
            "/conference/export-descriptor",
            post(rest::export_descriptor_handler).route_layer(auth),
        )
        .with_state(app_state)
}

pub use middleware::require_auth;
pub use scheduler::spawn_dashboard_sweep;
