//! Dashboard API handlers. Every route requires an authenticated caller.

use axum::{
    extract::{Extension, State},
    routing::{delete, get},
    Json, Router,
};
use utoipa::OpenApi;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::dashboard::{
    CallVolumeData, CallVolumeDataset, CallVolumeResponse, CustomerSatisfactionData,
    DashboardStatsResponse, IncidentChannel, IncidentPriority, IncidentResponse, IncidentState,
    MessageResponse, TimeSeriesData,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        get_dashboard_stats,
        get_recent_incidents,
        get_call_volume_data,
        get_call_volume_chart,
        get_customer_satisfaction_data,
        clear_user_cache,
    ),
    components(schemas(
        DashboardStatsResponse,
        IncidentResponse,
        IncidentState,
        IncidentChannel,
        IncidentPriority,
        CallVolumeData,
        CallVolumeResponse,
        CallVolumeDataset,
        CustomerSatisfactionData,
        TimeSeriesData,
        MessageResponse,
    ))
)]
pub struct DashboardApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/stats", get(get_dashboard_stats))
        .route("/recent-incidents", get(get_recent_incidents))
        .route("/call-volume", get(get_call_volume_data))
        .route("/call-volume/chart", get(get_call_volume_chart))
        .route("/satisfaction", get(get_customer_satisfaction_data))
        .route("/cache", delete(clear_user_cache))
}

/// Re-sign the caller's claims for the upstream request.
fn forward_token(state: &SharedState, auth: &AuthExtension) -> Result<String> {
    state
        .auth
        .encode(&auth.claims)
        .map_err(|e| AppError::Internal(format!("Failed to sign upstream token: {}", e)))
}

/// GET /report-generation/dashboard/stats
#[utoipa::path(
    get,
    path = "/stats",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "get_dashboard_stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatsResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_dashboard_stats(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<DashboardStatsResponse>> {
    let token = forward_token(&state, &auth)?;
    let stats = state
        .incidents
        .dashboard_stats(&token)
        .await
        .map_err(|e| e.into_app_error("Error fetching dashboard stats"))?;
    Ok(Json(stats.into()))
}

/// GET /report-generation/dashboard/recent-incidents
#[utoipa::path(
    get,
    path = "/recent-incidents",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "get_recent_incidents",
    responses(
        (status = 200, description = "Recent incidents for the caller's company", body = Vec<IncidentResponse>),
        (status = 403, description = "Caller is not a company user"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_recent_incidents(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<Vec<IncidentResponse>>> {
    if !auth.is_company() {
        return Err(AppError::Authorization(
            "Only company users can access this endpoint".to_string(),
        ));
    }

    if let Some(cached) = state.cache.get_recent_incidents(&auth.user_id).await {
        return Ok(Json(cached));
    }

    let token = forward_token(&state, &auth)?;
    let incidents = state
        .incidents
        .company_incidents(&token)
        .await
        .map_err(|e| e.into_app_error("Error connecting to incident service"))?;

    state
        .cache
        .cache_recent_incidents(&auth.user_id, &incidents)
        .await;
    Ok(Json(incidents))
}

async fn call_volume_for(state: &SharedState, user_id: &str) -> CallVolumeData {
    if let Some(cached) = state.cache.get_call_volume(user_id).await {
        return cached;
    }
    let data = CallVolumeData::hourly_default();
    state.cache.cache_call_volume(user_id, &data).await;
    data
}

/// GET /report-generation/dashboard/call-volume
#[utoipa::path(
    get,
    path = "/call-volume",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "get_call_volume_data",
    responses(
        (status = 200, description = "Call volume trend", body = CallVolumeData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_call_volume_data(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Json<CallVolumeData> {
    Json(call_volume_for(&state, &auth.user_id).await)
}

/// GET /report-generation/dashboard/call-volume/chart
#[utoipa::path(
    get,
    path = "/call-volume/chart",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "get_call_volume_chart",
    responses(
        (status = 200, description = "Call volume as chart datasets", body = CallVolumeResponse),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_call_volume_chart(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Json<CallVolumeResponse> {
    Json(call_volume_for(&state, &auth.user_id).await.to_chart())
}

/// GET /report-generation/dashboard/satisfaction
#[utoipa::path(
    get,
    path = "/satisfaction",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "get_customer_satisfaction_data",
    responses(
        (status = 200, description = "Customer satisfaction metrics", body = CustomerSatisfactionData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_customer_satisfaction_data(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Json<CustomerSatisfactionData> {
    if let Some(cached) = state.cache.get_satisfaction_data(&auth.user_id).await {
        return Json(cached);
    }
    let data = CustomerSatisfactionData::weekly_default();
    state
        .cache
        .cache_satisfaction_data(&auth.user_id, &data)
        .await;
    Json(data)
}

/// DELETE /report-generation/dashboard/cache
#[utoipa::path(
    delete,
    path = "/cache",
    context_path = "/report-generation/dashboard",
    tag = "dashboard",
    operation_id = "clear_user_cache",
    responses(
        (status = 200, description = "Cache cleared", body = MessageResponse),
        (status = 500, description = "Cache unavailable"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn clear_user_cache(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<MessageResponse>> {
    match state.cache.flush_user_cache(&auth.user_id).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: "Cache cleared successfully".to_string(),
        })),
        Err(e) => {
            tracing::error!(user_id = %auth.user_id, "Failed to clear cache: {}", e);
            Err(AppError::Internal("Failed to clear cache".to_string()))
        }
    }
}
