//! HTTP API: shared state and router assembly.

pub mod handlers;
pub mod middleware;
pub mod openapi;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    middleware::{from_fn_with_state, map_response},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::AnyPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::auth_service::AuthService;
use crate::services::cache::CacheStore;
use crate::services::dashboard_cache::DashboardCache;
use crate::services::incident_client::IncidentQueryClient;

/// Path prefix shared by the service's own routes.
pub const API_PREFIX: &str = "/report-generation";

/// State shared by all handlers.
pub struct AppState {
    pub config: Config,
    pub db: AnyPool,
    pub cache: DashboardCache,
    pub incidents: IncidentQueryClient,
    pub auth: AuthService,
    /// Present when a Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: Config,
        db: AnyPool,
        cache_store: Arc<dyn CacheStore>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let cache = DashboardCache::new(
            cache_store,
            Duration::from_secs(config.cache_expiration_secs),
        );
        let incidents = IncidentQueryClient::new(&config.incident_query_url)?;
        let auth = AuthService::new(&config.jwt_secret);

        Ok(Self {
            config,
            db,
            cache,
            incidents,
            auth,
            metrics,
        })
    }
}

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    let dashboard = handlers::dashboard::router().route_layer(from_fn_with_state(
        state.clone(),
        middleware::auth::auth_middleware,
    ));

    let service_routes = handlers::health::router().nest("/dashboard", dashboard);

    Router::new()
        .route("/user/health", get(handlers::health::health))
        .nest(API_PREFIX, service_routes)
        .route("/openapi.json", get(openapi_json))
        .route("/metrics", get(prometheus_metrics))
        .fallback(not_found)
        .layer(map_response(method_not_allowed_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::build_openapi())
}

async fn prometheus_metrics(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => AppError::NotFound("Metrics are not enabled".to_string()).into_response(),
    }
}

/// Give axum's empty 405 responses the standard JSON error body, keeping
/// the `Allow` header.
async fn method_not_allowed_json(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = AppError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}

async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(path = %uri.path(), "No route");
    AppError::NotFound("Not Found".to_string())
}
