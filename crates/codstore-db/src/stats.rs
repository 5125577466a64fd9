//! Grouped aggregation queries for the admin dashboard.
//!
//! The order aggregates are one pass over the window: total, pending count,
//! revenue in minor units, and distinct customers. Revenue reads the numeric
//! `total_price_minor` column; display strings are never parsed.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A reporting window. `None` bounds mean "all time" on that side.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_seed: bool,
}

/// Single-pass order aggregates for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderAggregates {
    pub total: i64,
    pub pending: i64,
    pub revenue_minor: i64,
    pub unique_customers: i64,
}

/// A (day, count) pair for sparkline series.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct DayCount {
    pub day: DateTime<Utc>,
    pub count: i64,
}

/// Computes the grouped order aggregates for a window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn order_aggregates(
    pool: &PgPool,
    filter: StatsFilter,
) -> Result<OrderAggregates, DbError> {
    let row = sqlx::query_as::<_, OrderAggregates>(
        "SELECT \
             COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status IN ('new', 'pending', 'called')) AS pending, \
             COALESCE(SUM(total_price_minor), 0)::BIGINT AS revenue_minor, \
             COUNT(DISTINCT phone) AS unique_customers \
         FROM orders \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2) \
           AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)",
    )
    .bind(filter.include_seed)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Per-calendar-day order counts inside `[from, to)`. Days with no orders are
/// absent; the caller zero-fills.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn orders_per_day(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    include_seed: bool,
) -> Result<Vec<DayCount>, DbError> {
    let rows = sqlx::query_as::<_, DayCount>(
        "SELECT date_trunc('day', created_at) AS day, COUNT(*) AS count \
         FROM orders \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND created_at >= $2 AND created_at < $3 \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(include_seed)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-calendar-day local visit counts inside `[from, to)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn visits_per_day(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    include_seed: bool,
) -> Result<Vec<DayCount>, DbError> {
    let rows = sqlx::query_as::<_, DayCount>(
        "SELECT date_trunc('day', created_at) AS day, COUNT(*) AS count \
         FROM visits \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND created_at >= $2 AND created_at < $3 \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(include_seed)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
