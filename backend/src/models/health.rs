//! Health check payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "Report Generation";
pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";

/// State of a single dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatus {
    pub status: String,
    pub message: String,
}

impl ComponentStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_HEALTHY.to_string(),
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_UNHEALTHY.to_string(),
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthComponents {
    pub api: ComponentStatus,
    pub redis: ComponentStatus,
    pub database: ComponentStatus,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub service: String,
    /// "OK" when every dependency is healthy, "Degraded" otherwise
    pub status: String,
    pub components: HealthComponents,
    pub version: String,
}

impl HealthResponse {
    pub fn from_checks(redis: ComponentStatus, database: ComponentStatus) -> Self {
        let status = if redis.is_healthy() && database.is_healthy() {
            "OK"
        } else {
            "Degraded"
        };
        Self {
            service: SERVICE_NAME.to_string(),
            status: status.to_string(),
            components: HealthComponents {
                api: ComponentStatus {
                    status: "OK".to_string(),
                    message: "API is responding".to_string(),
                },
                redis,
                database,
            },
            version: crate::error::API_VERSION.to_string(),
        }
    }
}

/// A recorded component check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckEntry {
    pub id: String,
    pub component: String,
    pub status: String,
    pub message: Option<String>,
    /// RFC 3339 timestamp
    pub checked_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_healthy_is_ok() {
        let resp = HealthResponse::from_checks(
            ComponentStatus::healthy("Redis connection successful"),
            ComponentStatus::healthy("Database connection successful"),
        );
        assert_eq!(resp.status, "OK");
        assert_eq!(resp.service, "Report Generation");
        assert_eq!(resp.components.api.status, "OK");
        assert_eq!(resp.version, "1.0");
    }

    #[test]
    fn test_any_unhealthy_is_degraded() {
        let resp = HealthResponse::from_checks(
            ComponentStatus::unhealthy("Redis connection failed"),
            ComponentStatus::healthy("ok"),
        );
        assert_eq!(resp.status, "Degraded");
        assert_eq!(resp.components.redis.status, "unhealthy");

        let resp = HealthResponse::from_checks(
            ComponentStatus::healthy("ok"),
            ComponentStatus::unhealthy("pool timed out"),
        );
        assert_eq!(resp.status, "Degraded");
    }
}
