//! Health check handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use crate::api::SharedState;
use crate::error::Result;
use crate::models::health::{ComponentStatus, HealthCheckEntry, HealthComponents, HealthResponse};
use crate::services::health_monitor_service::HealthMonitorService;

#[derive(OpenApi)]
#[openapi(
    paths(health, get_health_log),
    components(schemas(HealthResponse, HealthComponents, ComponentStatus, HealthCheckEntry))
)]
pub struct HealthApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/log", get(get_health_log))
}

/// GET /report-generation/health (also served at /user/health)
#[utoipa::path(
    get,
    path = "/health",
    context_path = "/report-generation",
    tag = "health",
    operation_id = "health",
    responses(
        (status = 200, description = "Component health; status is OK or Degraded", body = HealthResponse),
    ),
)]
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let monitor = HealthMonitorService::new(state.db.clone(), state.cache.clone());
    Json(monitor.check().await)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HealthLogQuery {
    /// Only entries for this component ("redis" or "database")
    pub component: Option<String>,
    /// Maximum entries to return (default 100, max 500)
    pub limit: Option<i64>,
}

/// GET /report-generation/health/log
#[utoipa::path(
    get,
    path = "/health/log",
    context_path = "/report-generation",
    tag = "health",
    operation_id = "get_health_log",
    params(HealthLogQuery),
    responses(
        (status = 200, description = "Recorded health checks, newest first", body = Vec<HealthCheckEntry>),
        (status = 400, description = "Malformed query string"),
    ),
)]
pub async fn get_health_log(
    State(state): State<SharedState>,
    query: std::result::Result<Query<HealthLogQuery>, QueryRejection>,
) -> Result<Json<Vec<HealthCheckEntry>>> {
    let Query(query) = query?;
    let monitor = HealthMonitorService::new(state.db.clone(), state.cache.clone());
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let entries = monitor
        .get_health_log(query.component.as_deref(), limit)
        .await?;
    Ok(Json(entries))
}
