//! Public catalog endpoints.
//!
//! Lookups are two-tier: the database catalog wins, the hardcoded fallback
//! fills in behind it, and every response says which tier served it.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use codstore_core::catalog::{self, CatalogSource, StaticProduct};
use codstore_db::ProductRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub slug: String,
    pub name: String,
    pub short_desc: String,
    pub images: Value,
    pub offers: Value,
    pub source: CatalogSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_info: Option<String>,
}

fn static_offers(product: &StaticProduct) -> Value {
    Value::Array(
        product
            .offers
            .iter()
            .map(|o| {
                json!({
                    "qty": o.qty,
                    "label": o.label,
                    "price_minor": o.price.minor(),
                    "price": o.price.display(),
                })
            })
            .collect(),
    )
}

impl From<&'static StaticProduct> for ProductView {
    fn from(product: &'static StaticProduct) -> Self {
        Self {
            slug: product.slug.to_owned(),
            name: product.name.to_owned(),
            short_desc: product.short_desc.to_owned(),
            images: json!(product.images),
            offers: static_offers(product),
            source: CatalogSource::Static,
            full_desc: Some(product.full_desc.to_owned()),
            benefits: Some(json!(product.benefits)),
            usage: Some(product.usage.to_owned()),
            guarantee: Some(product.guarantee.to_owned()),
            delivery_info: Some(product.delivery_info.to_owned()),
        }
    }
}

impl From<ProductRow> for ProductView {
    fn from(row: ProductRow) -> Self {
        Self {
            slug: row.slug,
            name: row.name,
            short_desc: row.short_desc,
            images: row.images,
            offers: row.offers,
            source: CatalogSource::Database,
            full_desc: None,
            benefits: None,
            usage: None,
            guarantee: None,
            delivery_info: None,
        }
    }
}

/// `GET /api/products` — database catalog first, static entries appended for
/// any slug the database does not cover.
pub async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ProductView>>>, ApiError> {
    let rows = codstore_db::list_products(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut items: Vec<ProductView> = rows.into_iter().map(ProductView::from).collect();
    for product in catalog::static_products() {
        if !items.iter().any(|item| item.slug == product.slug) {
            items.push(ProductView::from(*product));
        }
    }

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/products/{slug}`
pub async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let row = codstore_db::get_product_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let view = match row {
        Some(row) => ProductView::from(row),
        None => catalog::static_product(&slug)
            .map(ProductView::from)
            .ok_or_else(|| {
                ApiError::new(
                    req_id.0.clone(),
                    "not_found",
                    format!("no product with slug '{slug}'"),
                )
            })?,
    };

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_view_carries_the_full_copy() {
        let product = catalog::static_product("hismile").expect("catalog entry");
        let view = ProductView::from(product);
        assert_eq!(view.source, CatalogSource::Static);
        assert!(view.full_desc.is_some());

        let offers = view.offers.as_array().expect("offers array");
        assert_eq!(offers[1]["price_minor"].as_i64(), Some(14_000));
        assert_eq!(offers[1]["price"].as_str(), Some("14,000 FCFA"));
    }

    #[test]
    fn database_view_is_tagged_and_trimmed() {
        let row = ProductRow {
            id: uuid::Uuid::new_v4(),
            slug: "hismile".to_string(),
            name: "Hismile Premium".to_string(),
            short_desc: "Variant sourced from the back office".to_string(),
            images: json!(["https://cdn.example.com/p1.jpg"]),
            offers: json!([{"qty": 1, "label": "1 sérum", "price_minor": 9_900}]),
            created_at: chrono::Utc::now(),
        };
        let view = ProductView::from(row);
        assert_eq!(view.source, CatalogSource::Database);
        assert!(view.full_desc.is_none());
        let body = serde_json::to_value(&view).expect("serialize");
        assert_eq!(body["shortDesc"], "Variant sourced from the back office");
        assert!(body.get("fullDesc").is_none());
    }
}
