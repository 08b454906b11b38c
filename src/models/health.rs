// Health data models. JSON field names follow the public API contract
// (camelCase for the sleep fields), column names follow the table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for submitting a health data entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDataCreate {
    pub timestamp: DateTime<Utc>,
    pub steps: i64,
    pub calories: i64,
    #[serde(rename = "sleepHours")]
    pub sleep_hours: f64,
}

/// A stored health data entry, ordered by `(timestamp, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HealthEntry {
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub steps: i64,
    pub calories: i64,
    #[serde(rename = "sleepHours")]
    pub sleep_hours: f64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a date range. Requesting a summary of an empty range is
/// an error (404), never a zero-filled response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_steps: i64,
    pub average_calories: f64,
    #[serde(rename = "averageSleepHours")]
    pub average_sleep_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedHealthData {
    pub data: Vec<HealthEntry>,
    /// Resume position for the next page; absent on the last page.
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub limit: i64,
}

/// Query string for the paginated list endpoint. Dates use DD-MM-YYYY.
#[derive(Debug, Deserialize)]
pub struct HealthDataQuery {
    pub start: String,
    pub end: String,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Query string for the summary endpoint.
#[derive(Debug, Deserialize)]
pub struct HealthSummaryQuery {
    pub start_date: String,
    pub end_date: String,
}
