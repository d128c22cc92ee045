//! Background task scheduler.
//!
//! Runs the periodic health monitor, which records component checks in the
//! health check log.

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::api::SharedState;
use crate::services::health_monitor_service::HealthMonitorService;

/// Delay before the first cycle so startup logs stay readable.
const INITIAL_DELAY: Duration = Duration::from_secs(15);

/// Spawn all background scheduler tasks (fire-and-forget). Returns `None`
/// when the health monitor is disabled by a zero interval.
pub fn spawn_all(state: SharedState) -> Option<JoinHandle<()>> {
    spawn_health_monitor(state, INITIAL_DELAY)
}

fn spawn_health_monitor(state: SharedState, initial_delay: Duration) -> Option<JoinHandle<()>> {
    let period = state.config.health_check_interval_secs;
    if period == 0 {
        tracing::info!("Health monitor disabled");
        return None;
    }

    let handle = tokio::spawn(async move {
        tokio::time::sleep(initial_delay).await;
        let monitor = HealthMonitorService::new(state.db.clone(), state.cache.clone());
        let mut ticker = interval(Duration::from_secs(period));

        loop {
            ticker.tick().await;
            match monitor.check_and_record().await {
                Ok(report) => {
                    if report.status != "OK" {
                        tracing::warn!(
                            redis = %report.components.redis.message,
                            database = %report.components.database.message,
                            "Service is {}",
                            report.status
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Health monitoring cycle failed: {}", e);
                }
            }
        }
    });

    tracing::info!(period_secs = period, "Background schedulers started: health monitor");
    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::api::AppState;
    use crate::config::Config;
    use crate::db::migrations::{MigrationService, HEAD};
    use crate::db::{self, DatabaseBackend, DatabaseConfig};
    use crate::services::cache::MemoryCache;

    async fn state_with_interval(secs: &str) -> SharedState {
        let config = Config::from_lookup(|key| {
            (key == "HEALTH_CHECK_INTERVAL_SECS").then(|| secs.to_string())
        })
        .unwrap();
        let pool = db::connect(&DatabaseConfig::with_url("sqlite::memory:"))
            .await
            .unwrap();
        MigrationService::new(
            pool.clone(),
            DatabaseBackend::Sqlite,
            concat!(env!("CARGO_MANIFEST_DIR"), "/migrations"),
        )
        .upgrade(HEAD)
        .await
        .unwrap();
        Arc::new(AppState::new(config, pool, Arc::new(MemoryCache::new()), None).unwrap())
    }

    #[tokio::test]
    async fn test_zero_interval_disables_monitor() {
        let state = state_with_interval("0").await;
        assert!(spawn_all(state).is_none());
    }

    #[tokio::test]
    async fn test_monitor_records_checks() {
        let state = state_with_interval("60").await;
        let handle = spawn_health_monitor(state.clone(), Duration::ZERO).unwrap();

        let monitor = HealthMonitorService::new(state.db.clone(), state.cache.clone());
        let mut entries = Vec::new();
        for _ in 0..100 {
            entries = monitor.get_health_log(None, 10).await.unwrap();
            if entries.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.component == "redis"));
        assert!(entries.iter().any(|e| e.component == "database"));
    }
}
