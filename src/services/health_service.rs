// Health data service: cursor pagination over the time-ordered collection
// plus the derived range summary.
//
// The collection's total order is (timestamp asc, id asc). The id tie-break
// matters: multiple entries may share a timestamp, and a single-field order
// would make resume positions ambiguous.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::cursor;
use crate::database::DatabaseError;
use crate::models::health::{HealthDataCreate, HealthEntry, HealthSummary};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Effectively unbounded fetch used by the summary reduction.
const SUMMARY_FETCH_LIMIT: i64 = 10_000;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("User has no health data entries")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InvalidDate(pub String);

/// The ordered collection interface the engine runs against. Postgres in
/// production, an in-memory vector in tests.
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn insert(&self, entry: &HealthEntry) -> Result<(), DatabaseError>;

    async fn exists(&self, id: &str) -> Result<bool, DatabaseError>;

    /// Fetch up to `limit` entries for `subject`, filtered to the inclusive
    /// timestamp range, strictly after `after` when given, in stable
    /// `(timestamp asc, id asc)` order.
    async fn fetch_page(
        &self,
        subject: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        after: Option<(DateTime<Utc>, String)>,
        limit: i64,
    ) -> Result<Vec<HealthEntry>, DatabaseError>;
}

pub struct HealthService<S> {
    store: S,
}

impl<S: HealthStore> HealthService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: &str,
        data: HealthDataCreate,
    ) -> Result<HealthEntry, HealthError> {
        let entry = HealthEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            timestamp: data.timestamp,
            steps: data.steps,
            calories: data.calories,
            sleep_hours: data.sleep_hours,
            created_at: Utc::now(),
        };
        self.store.insert(&entry).await?;
        Ok(entry)
    }

    /// Resumable range query. Returns one page plus the position marker for
    /// the next one.
    ///
    /// - `limit` outside `[1, 100]` silently coerces to 50 (upstream
    ///   validation is expected to reject earlier; the engine stays
    ///   defensive).
    /// - An undecodable cursor, or one whose referenced record no longer
    ///   exists, is treated as absent: pagination restarts from the
    ///   beginning.
    pub async fn query(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<(Vec<HealthEntry>, Option<String>, bool), HealthError> {
        let limit = clamp_limit(limit);
        self.fetch_range(user_id, start, end, cursor, limit).await
    }

    /// Summary statistics over an inclusive date range. An empty range is an
    /// explicit error, not a zero-filled result.
    pub async fn summary(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HealthSummary, HealthError> {
        let (entries, _, _) = self
            .fetch_range(user_id, Some(start), Some(end), None, SUMMARY_FETCH_LIMIT)
            .await?;

        if entries.is_empty() {
            return Err(HealthError::NotFound);
        }

        let count = entries.len() as f64;
        let total_steps: i64 = entries.iter().map(|e| e.steps).sum();
        let total_calories: i64 = entries.iter().map(|e| e.calories).sum();
        let total_sleep: f64 = entries.iter().map(|e| e.sleep_hours).sum();

        Ok(HealthSummary {
            total_steps,
            average_calories: total_calories as f64 / count,
            average_sleep_hours: total_sleep / count,
        })
    }

    async fn fetch_range(
        &self,
        user_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<(Vec<HealthEntry>, Option<String>, bool), HealthError> {
        // The end bound covers the whole final day
        let end = end.map(end_of_day);

        let after = match cursor {
            Some(token) => match cursor::decode(token) {
                Ok((timestamp, id)) => {
                    // Referenced record gone: restart from the beginning
                    if self.store.exists(&id).await? {
                        Some((timestamp, id))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    debug!("ignoring cursor: {}", e);
                    None
                }
            },
            None => None,
        };

        // Fetch one extra entry to detect has_more without a count query
        let mut entries = self
            .store
            .fetch_page(user_id, start, end, after, limit + 1)
            .await?;

        let has_more = entries.len() as i64 > limit;
        if has_more {
            entries.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            entries.last().map(|e| cursor::encode(e.timestamp, &e.id))
        } else {
            None
        };

        Ok((entries, next_cursor, has_more))
    }
}

pub fn clamp_limit(limit: i64) -> i64 {
    if (1..=MAX_PAGE_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_PAGE_LIMIT
    }
}

/// Extend a day boundary to its last representable microsecond.
fn end_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let eod = ts
        .date_naive()
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| ts.naive_utc());
    Utc.from_utc_datetime(&eod)
}

/// Parse a `DD-MM-YYYY` date string into midnight UTC. Strict shape: two
/// digits, dash, two digits, dash, four digits, year within 1900..=2100.
pub fn parse_dd_mm_yyyy(value: &str) -> Result<DateTime<Utc>, InvalidDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[2] == b'-'
        && bytes[5] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 2 | 5) || b.is_ascii_digit());
    if !shaped {
        return Err(InvalidDate(format!(
            "Invalid date format. Expected DD-MM-YYYY (e.g. '08-01-2026'), got '{}'",
            value
        )));
    }

    let date = NaiveDate::parse_from_str(value, "%d-%m-%Y").map_err(|_| {
        InvalidDate(format!("Invalid date '{}'. Expected DD-MM-YYYY format", value))
    })?;

    if !(1900..=2100).contains(&date.year()) {
        return Err(InvalidDate(format!(
            "Year must be between 1900 and 2100, got {}",
            date.year()
        )));
    }

    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}
