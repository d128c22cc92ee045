//! Dashboard payloads exchanged with clients and the incident-query service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Open,
    InProgress,
    Closed,
    Escalated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncidentChannel {
    Phone,
    Email,
    Chat,
    Mobile,
}

/// An incident as returned by the incident-query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IncidentResponse {
    pub id: Uuid,
    pub description: String,
    pub state: IncidentState,
    pub channel: IncidentChannel,
    pub priority: IncidentPriority,
    pub creation_date: DateTime<Utc>,
    pub user_id: Uuid,
    pub company_id: Uuid,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsResponse {
    pub total_calls: i64,
    pub average_handling_time: i64,
    pub customer_satisfaction: i64,
    pub open_tickets: i64,
}

/// Raw counters reported by the upstream `dashboard-stats` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamStats {
    pub total_calls: i64,
    pub open_tickets: i64,
}

impl From<UpstreamStats> for DashboardStatsResponse {
    fn from(stats: UpstreamStats) -> Self {
        Self {
            total_calls: stats.total_calls,
            average_handling_time: 0,
            customer_satisfaction: 0,
            open_tickets: stats.open_tickets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeSeriesData {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Call counts per time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallVolumeData {
    /// Time periods, e.g. hours of the day
    pub labels: Vec<String>,
    /// Number of calls per period
    pub values: Vec<i64>,
    pub trend: Vec<TimeSeriesData>,
    pub total_calls: i64,
    pub peak_hour: String,
    pub lowest_hour: String,
}

impl CallVolumeData {
    /// Build the series from parallel labels and counts, deriving the total,
    /// peak and lowest buckets. Ties resolve to the earliest bucket.
    pub fn from_buckets(labels: Vec<String>, values: Vec<i64>) -> Self {
        let total_calls = values.iter().sum();
        let pick = |better: fn(i64, i64) -> bool| {
            let mut best: Option<(usize, i64)> = None;
            for (i, v) in values.iter().copied().enumerate() {
                match best {
                    Some((_, b)) if !better(v, b) => {}
                    _ => best = Some((i, v)),
                }
            }
            best.and_then(|(i, _)| labels.get(i).cloned())
                .unwrap_or_default()
        };
        let peak_hour = pick(|v, b| v > b);
        let lowest_hour = pick(|v, b| v < b);

        Self {
            labels,
            values,
            trend: Vec::new(),
            total_calls,
            peak_hour,
            lowest_hour,
        }
    }

    /// The built-in hourly series served until the upstream exposes call
    /// volume.
    pub fn hourly_default() -> Self {
        Self::from_buckets(
            ["00:00", "04:00", "08:00", "12:00", "16:00", "20:00"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec![10, 5, 35, 45, 40, 20],
        )
    }

    /// Chart-ready representation.
    pub fn to_chart(&self) -> CallVolumeResponse {
        CallVolumeResponse {
            labels: self.labels.clone(),
            datasets: vec![CallVolumeDataset {
                label: "Calls".to_string(),
                data: self.values.clone(),
                background_color: "#3b82f6".to_string(),
            }],
        }
    }
}

/// Satisfaction scores per time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerSatisfactionData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub trend: Vec<TimeSeriesData>,
    pub average_score: f64,
    pub total_responses: i64,
    pub positive_feedback_percentage: f64,
}

impl CustomerSatisfactionData {
    pub fn weekly_default() -> Self {
        Self {
            labels: ["Mon", "Tue", "Wed", "Thu", "Fri"]
                .into_iter()
                .map(String::from)
                .collect(),
            values: vec![85.0, 88.0, 82.0, 89.0, 90.0],
            trend: Vec::new(),
            average_score: 86.8,
            total_responses: 500,
            positive_feedback_percentage: 88.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallVolumeDataset {
    pub label: String,
    pub data: Vec<i64>,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CallVolumeResponse {
    pub labels: Vec<String>,
    pub datasets: Vec<CallVolumeDataset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
