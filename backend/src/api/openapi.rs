//! OpenAPI specification generated from handler annotations via utoipa.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Top-level OpenAPI document for the Report Generation API.
///
/// Each handler module contributes its own paths and schemas via per-module
/// `#[derive(OpenApi)]` structs that are merged into this root document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Report Generation API",
        description = "API for report generation with Redis integration",
        version = "1.0",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health checks and the health check log"),
        (name = "dashboard", description = "Dashboard statistics and incident summaries"),
    ),
    components(schemas(ErrorResponse))
)]
pub struct ApiDoc;

/// Standard error response body returned by all endpoints on failure.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "NOT_FOUND", "UNAUTHORIZED")
    pub code: String,
    /// Human-readable error message
    pub detail: String,
    /// API version, always "1.0"
    pub version: String,
}

/// Adds Bearer JWT security scheme to the OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the merged OpenAPI document from all handler modules.
pub fn build_openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(super::handlers::health::HealthApiDoc::openapi());
    doc.merge(super::handlers::dashboard::DashboardApiDoc::openapi());
    doc
}
