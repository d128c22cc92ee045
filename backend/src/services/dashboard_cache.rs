//! Per-user dashboard caching on top of a `CacheStore`.
//!
//! Keys are `dashboard:{kind}:{user_id}`. Reads that fail are treated as
//! misses and writes that fail are logged; the cache never fails a request
//! except when a caller explicitly flushes it.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::models::dashboard::{CallVolumeData, CustomerSatisfactionData, IncidentResponse};
use crate::models::health::ComponentStatus;
use crate::services::cache::CacheStore;
use crate::services::metrics_service;

const RECENT_INCIDENTS: &str = "recent_incidents";
const CALL_VOLUME: &str = "call_volume";
const SATISFACTION: &str = "satisfaction";

pub fn cache_key(kind: &str, user_id: &str) -> String {
    format!("dashboard:{}:{}", kind, user_id)
}

#[derive(Clone)]
pub struct DashboardCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl DashboardCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Connectivity check. Never fails; the outcome is in the status.
    pub async fn health_check(&self) -> ComponentStatus {
        match self.store.ping().await {
            Ok(()) => ComponentStatus::healthy("Redis connection successful"),
            Err(e) => ComponentStatus::unhealthy(e.to_string()),
        }
    }

    /// Read and decode a JSON value. Missing keys, undecodable payloads and
    /// backend errors all come back as `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, backend = self.store.backend_name(), "Cache read failed: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Encode and store a JSON value with the configured TTL. Returns whether
    /// the value was stored.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "Failed to encode cache entry: {}", e);
                return false;
            }
        };
        match self.store.set(key, raw, self.ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, backend = self.store.backend_name(), "Cache write failed: {}", e);
                false
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, kind: &'static str, user_id: &str) -> Option<T> {
        let value = self.get_json(&cache_key(kind, user_id)).await;
        metrics_service::record_cache_lookup(kind, value.is_some());
        value
    }

    /// Cached incidents for a user. An empty cached list counts as a miss.
    pub async fn get_recent_incidents(&self, user_id: &str) -> Option<Vec<IncidentResponse>> {
        self.lookup::<Vec<IncidentResponse>>(RECENT_INCIDENTS, user_id)
            .await
            .filter(|incidents| !incidents.is_empty())
    }

    pub async fn cache_recent_incidents(
        &self,
        user_id: &str,
        incidents: &[IncidentResponse],
    ) -> bool {
        self.set_json(&cache_key(RECENT_INCIDENTS, user_id), &incidents)
            .await
    }

    pub async fn get_call_volume(&self, user_id: &str) -> Option<CallVolumeData> {
        self.lookup(CALL_VOLUME, user_id).await
    }

    pub async fn cache_call_volume(&self, user_id: &str, data: &CallVolumeData) -> bool {
        self.set_json(&cache_key(CALL_VOLUME, user_id), data).await
    }

    pub async fn get_satisfaction_data(&self, user_id: &str) -> Option<CustomerSatisfactionData> {
        self.lookup(SATISFACTION, user_id).await
    }

    pub async fn cache_satisfaction_data(
        &self,
        user_id: &str,
        data: &CustomerSatisfactionData,
    ) -> bool {
        self.set_json(&cache_key(SATISFACTION, user_id), data).await
    }

    /// Remove every cached dashboard entry for a user.
    pub async fn flush_user_cache(&self, user_id: &str) -> Result<u64> {
        let keys: Vec<String> = [RECENT_INCIDENTS, CALL_VOLUME, SATISFACTION]
            .iter()
            .map(|kind| cache_key(kind, user_id))
            .collect();
        let removed = self.store.delete(&keys).await?;
        tracing::debug!(user_id, removed, "Flushed dashboard cache");
        Ok(removed)
    }
}
