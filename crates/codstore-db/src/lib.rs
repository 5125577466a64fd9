//! Postgres layer for the storefront: pool setup, embedded migrations, and
//! one query module per table (orders, visits, products, cloudflare mirror,
//! plus the dashboard aggregates).

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

mod cloudflare_visits;
mod orders;
mod products;
mod stats;
mod visits;

pub use cloudflare_visits::{
    daily_counts_between, has_daily_between, mirror_status, sum_daily_between, upsert_buckets,
    CloudflareVisitRow, MirrorSourceStatus, NewBucket,
};
pub use orders::{
    bulk_delete_orders, bulk_update_status, count_orders, create_order, delete_order,
    delete_seed_orders, get_order, list_orders, update_order, update_order_status, NewOrder,
    OrderListFilters, OrderRow, OrderSort, OrderUpdate,
};
pub use products::{create_product, get_product_by_slug, list_products, NewProduct, ProductRow};
pub use stats::{
    order_aggregates, orders_per_day, visits_per_day, DayCount, OrderAggregates, StatsFilter,
};
pub use visits::{
    bulk_delete_visits, count_visits_between, delete_seed_visits, delete_visit, insert_visit,
    list_visits, NewVisit, VisitListFilters, VisitRow,
};

// Path relative to crates/codstore-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing, sourced from [`codstore_core::AppConfig`] in the binaries.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &codstore_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Open a sized connection pool against the given database URL.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply any pending migrations. Both binaries call this on startup, so a
/// fresh database is usable without a separate migrate step.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// `SELECT 1` round trip, backing the `/api/health` database probe.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i64>("SELECT 1::BIGINT")
        .fetch_one(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_secs, 10);
    }
}
