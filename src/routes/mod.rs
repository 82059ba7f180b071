// routes module: thin JSON handlers over the dashboard assemblers. Scope
// checks and payload shaping live here; everything else is delegated.

use std::sync::Arc;

use axum::{Json, extract::Query, extract::State};
use serde_json::{Value, json};
use tracing::info;

use crate::dashboard;
use crate::error::AppResult;
use crate::filters::DashboardQuery;
use crate::models::UserRole;
use crate::principal::Principal;
use crate::state::AppState;

fn dashboard_response<T: serde::Serialize>(payload: T) -> Json<Value> {
    Json(json!({ "success": true, "dashboard": payload }))
}

pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&[])?;
    info!(user = %principal.id, "assembling admin dashboard");
    let payload = dashboard::admin::assemble(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn dealer_manager_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&dashboard::MANAGER_ROLES)?;
    info!(user = %principal.id, "assembling dealer-manager dashboard");
    let payload = dashboard::dealer_manager::assemble(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn dealer_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&[UserRole::Dealer])?;
    info!(user = %principal.id, "assembling dealer dashboard");
    let payload = dashboard::dealer::assemble(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn delivery_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&[UserRole::DeliveryManager])?;
    info!(user = %principal.id, "assembling delivery dashboard");
    let payload = dashboard::partner::assemble_delivery(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn installer_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&[UserRole::Installer])?;
    info!(user = %principal.id, "assembling installer dashboard");
    let payload = dashboard::partner::assemble_installer(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn inventory_dashboard(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    principal.require_role(&[UserRole::Employee])?;
    info!(user = %principal.id, "assembling inventory dashboard");
    let payload = dashboard::inventory::assemble(&state, &principal, &query).await?;
    Ok(dashboard_response(payload))
}

pub async fn activity_report(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    info!(user = %principal.id, "assembling activity report");
    let payload = dashboard::activity::assemble(&state, &principal, &query).await?;
    Ok(Json(json!({ "success": true, "stats": payload })))
}
