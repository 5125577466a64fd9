//! Database operations for the `orders` table.
//!
//! Every mutation here excludes seed rows in SQL (`is_seed = FALSE`) rather
//! than pre-checking ids, so bulk calls can never touch demo data.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ORDER_COLUMNS: &str = "id, name, phone, city, address, product_slug, quantity, \
     total_price, total_price_minor, product_name, product_price, product_images, \
     product_short_desc, product_full_desc, product_benefits, product_usage, \
     product_guarantee, product_delivery_info, product_reviews, status, is_seed, \
     created_at, updated_at";

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub product_slug: String,
    pub quantity: i32,
    pub total_price: String,
    pub total_price_minor: i64,
    pub product_name: String,
    pub product_price: String,
    pub product_images: serde_json::Value,
    pub product_short_desc: String,
    pub product_full_desc: String,
    pub product_benefits: serde_json::Value,
    pub product_usage: String,
    pub product_guarantee: String,
    pub product_delivery_info: String,
    pub product_reviews: serde_json::Value,
    pub status: String,
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new order. The product snapshot is denormalized at
/// creation time and never refreshed from the catalog afterwards.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub product_slug: String,
    pub quantity: i32,
    pub total_price: String,
    pub total_price_minor: i64,
    pub product_name: String,
    pub product_price: String,
    pub product_images: serde_json::Value,
    pub product_short_desc: String,
    pub product_full_desc: String,
    pub product_benefits: serde_json::Value,
    pub product_usage: String,
    pub product_guarantee: String,
    pub product_delivery_info: String,
    pub product_reviews: serde_json::Value,
    pub status: String,
    pub is_seed: bool,
}

/// Partial field set for an admin order update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<String>,
}

/// Whitelisted sort orders for the admin order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    NameAsc,
    NameDesc,
    TotalPriceAsc,
    TotalPriceDesc,
}

impl OrderSort {
    #[must_use]
    const fn order_by(self) -> &'static str {
        match self {
            OrderSort::CreatedAtDesc => "created_at DESC",
            OrderSort::CreatedAtAsc => "created_at ASC",
            OrderSort::NameAsc => "name ASC",
            OrderSort::NameDesc => "name DESC",
            OrderSort::TotalPriceAsc => "total_price_minor ASC",
            OrderSort::TotalPriceDesc => "total_price_minor DESC",
        }
    }
}

/// Input filters for the admin order list.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilters<'a> {
    pub status: Option<&'a str>,
    /// Case-insensitive substring match on the city field.
    pub city: Option<&'a str>,
    /// Case-insensitive substring match across name/phone/city/product/address.
    pub search: Option<&'a str>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub include_seed: bool,
    pub sort: OrderSort,
    pub limit: i64,
    pub offset: i64,
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Returns a page of orders matching the filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    filters: &OrderListFilters<'_>,
) -> Result<Vec<OrderRow>, DbError> {
    let search = filters.search.map(|s| format!("%{}%", escape_like(s)));
    let city = filters.city.map(|c| format!("%{}%", escape_like(c)));

    let sql = format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TEXT IS NULL OR status = $2) \
           AND ($3::TEXT IS NULL OR city ILIKE $3) \
           AND ($4::TEXT IS NULL OR name ILIKE $4 OR phone ILIKE $4 OR city ILIKE $4 \
                OR product_name ILIKE $4 OR address ILIKE $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5) \
           AND ($6::TIMESTAMPTZ IS NULL OR created_at < $6) \
         ORDER BY {} \
         LIMIT $7 OFFSET $8",
        filters.sort.order_by()
    );

    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(filters.include_seed)
        .bind(filters.status)
        .bind(city)
        .bind(search)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.limit)
        .bind(filters.offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Counts orders matching the filters (ignoring pagination).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_orders(pool: &PgPool, filters: &OrderListFilters<'_>) -> Result<i64, DbError> {
    let search = filters.search.map(|s| format!("%{}%", escape_like(s)));
    let city = filters.city.map(|c| format!("%{}%", escape_like(c)));

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM orders \
         WHERE ($1::BOOLEAN OR is_seed = FALSE) \
           AND ($2::TEXT IS NULL OR status = $2) \
           AND ($3::TEXT IS NULL OR city ILIKE $3) \
           AND ($4::TEXT IS NULL OR name ILIKE $4 OR phone ILIKE $4 OR city ILIKE $4 \
                OR product_name ILIKE $4 OR address ILIKE $4) \
           AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5) \
           AND ($6::TIMESTAMPTZ IS NULL OR created_at < $6)",
    )
    .bind(filters.include_seed)
    .bind(filters.status)
    .bind(city)
    .bind(search)
    .bind(filters.from)
    .bind(filters.to)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Returns a single order by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Option<OrderRow>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts an order and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_order(pool: &PgPool, order: &NewOrder) -> Result<OrderRow, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders \
             (name, phone, city, address, product_slug, quantity, total_price, \
              total_price_minor, product_name, product_price, product_images, \
              product_short_desc, product_full_desc, product_benefits, product_usage, \
              product_guarantee, product_delivery_info, product_reviews, status, is_seed) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19, $20) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&order.name)
    .bind(&order.phone)
    .bind(&order.city)
    .bind(&order.address)
    .bind(&order.product_slug)
    .bind(order.quantity)
    .bind(&order.total_price)
    .bind(order.total_price_minor)
    .bind(&order.product_name)
    .bind(&order.product_price)
    .bind(&order.product_images)
    .bind(&order.product_short_desc)
    .bind(&order.product_full_desc)
    .bind(&order.product_benefits)
    .bind(&order.product_usage)
    .bind(&order.product_guarantee)
    .bind(&order.product_delivery_info)
    .bind(&order.product_reviews)
    .bind(&order.status)
    .bind(order.is_seed)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Applies a partial update to a non-seed order and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no non-seed order has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_order(
    pool: &PgPool,
    id: Uuid,
    update: &OrderUpdate,
) -> Result<OrderRow, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET \
             name = COALESCE($2, name), \
             phone = COALESCE($3, phone), \
             city = COALESCE($4, city), \
             address = COALESCE($5, address), \
             quantity = COALESCE($6, quantity), \
             status = COALESCE($7, status), \
             updated_at = NOW() \
         WHERE id = $1 AND is_seed = FALSE \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.phone.as_deref())
    .bind(update.city.as_deref())
    .bind(update.address.as_deref())
    .bind(update.quantity)
    .bind(update.status.as_deref())
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Sets the status of a non-seed order and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no non-seed order has this id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_order_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
) -> Result<OrderRow, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE orders SET status = $2, updated_at = NOW() \
         WHERE id = $1 AND is_seed = FALSE \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}

/// Deletes a non-seed order. Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_order(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND is_seed = FALSE")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Sets the status for every non-seed order in `ids` with one statement.
/// Returns the number of rows affected.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn bulk_update_status(
    pool: &PgPool,
    ids: &[Uuid],
    status: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE orders SET status = $2, updated_at = NOW() \
         WHERE id = ANY($1) AND is_seed = FALSE",
    )
    .bind(ids)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes every non-seed order in `ids` with one statement. Returns the
/// number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn bulk_delete_orders(pool: &PgPool, ids: &[Uuid]) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ANY($1) AND is_seed = FALSE")
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Removes every seed order. Used by the seeding CLI's `--clean` pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_seed_orders(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE is_seed = TRUE")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_map_to_expected_order_by() {
        assert_eq!(OrderSort::CreatedAtDesc.order_by(), "created_at DESC");
        assert_eq!(OrderSort::TotalPriceAsc.order_by(), "total_price_minor ASC");
        assert_eq!(OrderSort::default(), OrderSort::CreatedAtDesc);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Douala"), "Douala");
    }
}
