//! Client for the incident-query service.

use std::time::Duration;

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::dashboard::{IncidentResponse, UpstreamStats};
use crate::services::metrics_service;

const DASHBOARD_STATS: &str = "dashboard-stats";
const COMPANY_INCIDENTS: &str = "company-incidents";

#[derive(Error, Debug)]
pub enum IncidentQueryError {
    #[error("Incident service returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("{0}")]
    Transport(String),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl IncidentQueryError {
    /// Convert into an API error. Upstream statuses pass through unchanged;
    /// everything else is a 500 prefixed with `context`.
    pub fn into_app_error(self, context: &str) -> AppError {
        let message = self.to_string();
        match self {
            Self::Status { status, .. } => AppError::Upstream { status, message },
            _ => AppError::Internal(format!("{}: {}", context, message)),
        }
    }
}

pub struct IncidentQueryClient {
    http: reqwest::Client,
    base_url: String,
}

impl IncidentQueryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Aggregate counters for the caller's scope.
    pub async fn dashboard_stats(
        &self,
        token: &str,
    ) -> std::result::Result<UpstreamStats, IncidentQueryError> {
        self.get_json(DASHBOARD_STATS, token).await
    }

    /// Incidents belonging to the caller's company.
    pub async fn company_incidents(
        &self,
        token: &str,
    ) -> std::result::Result<Vec<IncidentResponse>, IncidentQueryError> {
        self.get_json(COMPANY_INCIDENTS, token).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        token: &str,
    ) -> std::result::Result<T, IncidentQueryError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = match self.http.get(&url).bearer_auth(token).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics_service::record_upstream_request(endpoint, 0);
                tracing::warn!(url = %url, "Incident service request failed: {}", e);
                return Err(IncidentQueryError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        metrics_service::record_upstream_request(endpoint, status.as_u16());
        if !status.is_success() {
            return Err(IncidentQueryError::Status { status, url });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IncidentQueryError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> IncidentQueryClient {
        IncidentQueryClient::new(&format!("{}/incident-query/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_stats_forwards_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/incident-query/dashboard-stats"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"total_calls": 100, "open_tickets": 25})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stats = client_for(&server).await.dashboard_stats("tok").await.unwrap();
        assert_eq!(stats.total_calls, 100);
        assert_eq!(stats.open_tickets, 25);
    }

    #[tokio::test]
    async fn test_status_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/incident-query/company-incidents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .company_incidents("tok")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IncidentQueryError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }
        ));
        assert_eq!(err.into_app_error("ctx").status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/incident-query/dashboard-stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hourly_counts": [1]})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .dashboard_stats("tok")
            .await
            .unwrap_err();
        assert!(matches!(err, IncidentQueryError::Decode(_)));
        let app_err = err.into_app_error("Error fetching dashboard stats");
        assert_eq!(app_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(app_err
            .to_string()
            .contains("Error fetching dashboard stats"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) on loopback is not expected to accept HTTP.
        let client = IncidentQueryClient::new("http://127.0.0.1:9/incident-query").unwrap();
        let err = client.company_incidents("tok").await.unwrap_err();
        assert!(matches!(err, IncidentQueryError::Transport(_)));
    }
}
