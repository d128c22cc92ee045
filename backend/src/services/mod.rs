//! Business services.

pub mod auth_service;
pub mod cache;
pub mod dashboard_cache;
pub mod health_monitor_service;
pub mod incident_client;
pub mod metrics_service;
pub mod scheduler_service;
