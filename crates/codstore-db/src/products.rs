//! Database operations for the `products` table.
//!
//! The database catalog overrides the static fallback catalog on slug
//! collisions; the merge itself happens in the server layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, slug, name, short_desc, images, offers, created_at";

/// A row from the `products` table. `offers` holds a JSON list of
/// `{qty, label, price_minor}` objects.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub short_desc: String,
    pub images: serde_json::Value,
    pub offers: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    pub short_desc: String,
    pub images: serde_json::Value,
    pub offers: serde_json::Value,
}

/// Returns all catalog products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single product by slug, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_slug(pool: &PgPool, slug: &str) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a product and returns the stored row. The unique index on `slug`
/// surfaces duplicates as a database error (23505) for the caller to map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_product(pool: &PgPool, product: &NewProduct) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (slug, name, short_desc, images, offers) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&product.slug)
    .bind(&product.name)
    .bind(&product.short_desc)
    .bind(&product.images)
    .bind(&product.offers)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
