// Postgres implementation of the ordered health-data collection.
//
// The pagination contract depends on a stable total order: timestamp
// ascending with id ascending as the tie-break. Resume-after-position uses
// a row-value comparison so it composes with that order exactly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::health::HealthEntry;
use crate::services::health_service::HealthStore;

use super::DatabaseError;

pub struct PgHealthStore {
    pool: PgPool,
}

impl PgHealthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthStore for PgHealthStore {
    async fn insert(&self, entry: &HealthEntry) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO health_data (id, user_id, "timestamp", steps, calories, sleep_hours, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.timestamp)
        .bind(entry.steps)
        .bind(entry.calories)
        .bind(entry.sleep_hours)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM health_data WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    async fn fetch_page(
        &self,
        subject: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        after: Option<(DateTime<Utc>, String)>,
        limit: i64,
    ) -> Result<Vec<HealthEntry>, DatabaseError> {
        let (after_ts, after_id) = match after {
            Some((ts, id)) => (Some(ts), Some(id)),
            None => (None, None),
        };

        let entries = sqlx::query_as::<_, HealthEntry>(
            r#"
            SELECT id, user_id, "timestamp", steps, calories, sleep_hours, created_at
            FROM health_data
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR "timestamp" >= $2)
              AND ($3::timestamptz IS NULL OR "timestamp" <= $3)
              AND ($4::timestamptz IS NULL OR ("timestamp", id) > ($4, $5))
            ORDER BY "timestamp" ASC, id ASC
            LIMIT $6
            "#,
        )
        .bind(subject)
        .bind(start)
        .bind(end)
        .bind(after_ts)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
