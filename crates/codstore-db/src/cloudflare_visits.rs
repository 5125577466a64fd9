//! Database operations for the `cloudflare_visits` mirror table.
//!
//! Rows are aggregate buckets imported from the Cloudflare Analytics API and
//! are read-only to the stats pipeline. Imports upsert on the
//! `(zone_id, source, bucket_start)` key so re-running a sync never duplicates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `cloudflare_visits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CloudflareVisitRow {
    pub id: Uuid,
    pub bucket_start: DateTime<Utc>,
    pub bucket_label: String,
    pub count: i64,
    pub source: String,
    pub zone_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One bucket to import. `source` is `daily` or `minute`.
#[derive(Debug, Clone)]
pub struct NewBucket {
    pub bucket_start: DateTime<Utc>,
    pub bucket_label: String,
    pub count: i64,
    pub source: String,
    pub zone_id: String,
}

/// Per-source mirror summary for the status endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MirrorSourceStatus {
    pub source: String,
    pub buckets: i64,
    pub latest_bucket: Option<DateTime<Utc>>,
}

/// Upserts a batch of imported buckets. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_buckets(pool: &PgPool, buckets: &[NewBucket]) -> Result<u64, DbError> {
    let mut written = 0;
    for bucket in buckets {
        let result = sqlx::query(
            "INSERT INTO cloudflare_visits (bucket_start, bucket_label, count, source, zone_id) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (zone_id, source, bucket_start) \
             DO UPDATE SET count = EXCLUDED.count, bucket_label = EXCLUDED.bucket_label, \
                           updated_at = NOW()",
        )
        .bind(bucket.bucket_start)
        .bind(&bucket.bucket_label)
        .bind(bucket.count)
        .bind(&bucket.source)
        .bind(&bucket.zone_id)
        .execute(pool)
        .await?;
        written += result.rows_affected();
    }

    Ok(written)
}

/// Whether any daily mirror bucket falls inside `[from, to)`.
///
/// The stats pipeline prefers the mirror unconditionally when this is true,
/// even if its coverage of the window is partial.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn has_daily_between(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (\
             SELECT 1 FROM cloudflare_visits \
             WHERE source = 'daily' \
               AND ($1::TIMESTAMPTZ IS NULL OR bucket_start >= $1) \
               AND ($2::TIMESTAMPTZ IS NULL OR bucket_start < $2)\
         )",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Sums daily mirror counts inside `[from, to)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sum_daily_between(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<i64, DbError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(count), 0)::BIGINT \
         FROM cloudflare_visits \
         WHERE source = 'daily' \
           AND ($1::TIMESTAMPTZ IS NULL OR bucket_start >= $1) \
           AND ($2::TIMESTAMPTZ IS NULL OR bucket_start < $2)",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Per-day daily-bucket counts inside `[from, to)`, for the sparkline.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn daily_counts_between(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<(DateTime<Utc>, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (DateTime<Utc>, i64)>(
        "SELECT bucket_start, count \
         FROM cloudflare_visits \
         WHERE source = 'daily' AND bucket_start >= $1 AND bucket_start < $2 \
         ORDER BY bucket_start",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Bucket count and latest bucket per source, for the status endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn mirror_status(pool: &PgPool) -> Result<Vec<MirrorSourceStatus>, DbError> {
    let rows = sqlx::query_as::<_, MirrorSourceStatus>(
        "SELECT source, COUNT(*) AS buckets, MAX(bucket_start) AS latest_bucket \
         FROM cloudflare_visits \
         GROUP BY source \
         ORDER BY source",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
