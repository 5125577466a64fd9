//! Database operations for the `visits` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const VISIT_COLUMNS: &str = "id, path, referrer, user_agent, ip, session_id, is_seed, created_at";

/// A row from the `visits` table. Visits are insert-only.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitRow {
    pub id: Uuid,
    pub path: String,
    pub referrer: String,
    pub user_agent: String,
    pub ip: String,
    pub session_id: String,
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewVisit {
    pub path: String,
    pub referrer: String,
    pub user_agent: String,
    pub ip: String,
    pub session_id: String,
    pub is_seed: bool,
}

/// Input filters for the admin visit list.
#[derive(Debug, Clone, Default)]
pub struct VisitListFilters<'a> {
    /// Case-insensitive substring match on the path.
    pub path: Option<&'a str>,
    /// Case-insensitive substring match across path/referrer/ip.
    pub search: Option<&'a str>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_seed: bool,
    pub limit: i64,
    pub offset: i64,
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Records one page-view event.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_visit(pool: &PgPool, visit: &NewVisit) -> Result<VisitRow, DbError> {
    let row = sqlx::query_as::<_, VisitRow>(&format!(
        "INSERT INTO visits (path, referrer, user_agent, ip, session_id, is_seed) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {VISIT_COLUMNS}"
    ))
    .bind(&visit.path)
    .bind(&visit.referrer)
    .bind(&visit.user_agent)
    .bind(&visit.ip)
    .bind(&visit.session_id)
    .bind(visit.is_seed)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a page of visits matching the filters plus the unpaged total.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_visits(
    pool: &PgPool,
    filters: &VisitListFilters<'_>,
) -> Result<(Vec<VisitRow>, i64), DbError> {
    let path = filters.path.map(|p| format!("%{}%", escape_like(p)));
    let search = filters.search.map(|s| format!("%{}%", escape_like(s)));

    let rows = sqlx::query_as::<_, VisitRow>(&format!(
        "SELECT {VISIT_COLUMNS} \
         FROM visits \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TEXT IS NULL OR path ILIKE $2) \
           AND ($3::TEXT IS NULL OR path ILIKE $3 OR referrer ILIKE $3 OR ip ILIKE $3) \
           AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR created_at < $5) \
         ORDER BY created_at DESC \
         LIMIT $6 OFFSET $7"
    ))
    .bind(filters.include_seed)
    .bind(path.as_deref())
    .bind(search.as_deref())
    .bind(filters.from)
    .bind(filters.to)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM visits \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TEXT IS NULL OR path ILIKE $2) \
           AND ($3::TEXT IS NULL OR path ILIKE $3 OR referrer ILIKE $3 OR ip ILIKE $3) \
           AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR created_at < $5)",
    )
    .bind(filters.include_seed)
    .bind(path.as_deref())
    .bind(search.as_deref())
    .bind(filters.from)
    .bind(filters.to)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Counts non-seed visits inside `[from, to)`; `None` bounds disable that side.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_visits_between(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    include_seed: bool,
) -> Result<i64, DbError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM visits \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2) \
           AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)",
    )
    .bind(include_seed)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Deletes a single visit. Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_visit(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM visits WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes every visit in `ids` with one statement. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn bulk_delete_visits(pool: &PgPool, ids: &[Uuid]) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM visits WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Removes every seed visit. Used by the seeding CLI's `--clean` pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_seed_visits(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM visits WHERE is_seed = TRUE")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
