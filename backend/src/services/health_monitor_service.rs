//! Component health checks and the health check log.

use chrono::{SecondsFormat, Utc};
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::models::health::{ComponentStatus, HealthCheckEntry, HealthResponse};
use crate::services::dashboard_cache::DashboardCache;

pub struct HealthMonitorService {
    db: AnyPool,
    cache: DashboardCache,
}

impl HealthMonitorService {
    pub fn new(db: AnyPool, cache: DashboardCache) -> Self {
        Self { db, cache }
    }

    pub async fn check_database(&self) -> ComponentStatus {
        match db::ping(&self.db).await {
            Ok(()) => ComponentStatus::healthy("Database connection successful"),
            Err(e) => ComponentStatus::unhealthy(e.to_string()),
        }
    }

    /// Check every component. Never fails.
    pub async fn check(&self) -> HealthResponse {
        let (redis, database) = tokio::join!(self.cache.health_check(), self.check_database());
        HealthResponse::from_checks(redis, database)
    }

    /// Persist one row per dependency of `report`.
    pub async fn record(&self, report: &HealthResponse) -> Result<()> {
        let checked_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let components = [
            ("redis", &report.components.redis),
            ("database", &report.components.database),
        ];

        for (name, status) in components {
            sqlx::query(
                "INSERT INTO health_check_log (id, component, status, message, checked_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .bind(status.status.clone())
            .bind(Some(status.message.clone()))
            .bind(checked_at.clone())
            .execute(&self.db)
            .await?;
        }
        Ok(())
    }

    /// Run a full check and record it.
    pub async fn check_and_record(&self) -> Result<HealthResponse> {
        let report = self.check().await;
        self.record(&report).await?;
        Ok(report)
    }

    /// Most recent log rows first, optionally for a single component.
    pub async fn get_health_log(
        &self,
        component: Option<&str>,
        limit: i64,
    ) -> Result<Vec<HealthCheckEntry>> {
        let rows = match component {
            Some(component) => {
                sqlx::query(
                    "SELECT id, component, status, message, checked_at FROM health_check_log \
                     WHERE component = $1 ORDER BY checked_at DESC LIMIT $2",
                )
                .bind(component.to_string())
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, component, status, message, checked_at FROM health_check_log \
                     ORDER BY checked_at DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                Ok(HealthCheckEntry {
                    id: row.try_get("id")?,
                    component: row.try_get("component")?,
                    status: row.try_get("status")?,
                    message: row.try_get("message")?,
                    checked_at: row.try_get("checked_at")?,
                })
            })
            .collect()
    }
}
