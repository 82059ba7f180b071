// lib.rs
// Crate surface shared by the binary and the integration tests.

pub mod commission;
pub mod dashboard;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod models;
pub mod principal;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::state::AppState;

/// The full dashboard router. Kept here so tests can mount the exact same
/// surface the binary serves.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/dashboard/admin", get(routes::admin_dashboard))
        .route(
            "/dashboard/dealer-manager",
            get(routes::dealer_manager_dashboard),
        )
        .route("/dashboard/dealer", get(routes::dealer_dashboard))
        .route("/dashboard/delivery", get(routes::delivery_dashboard))
        .route("/dashboard/installer", get(routes::installer_dashboard))
        .route("/dashboard/inventory", get(routes::inventory_dashboard))
        .route("/reports/activity", get(routes::activity_report))
        .with_state(state)
}
