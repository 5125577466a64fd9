//! Back-office catalog writes.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use codstore_core::slug_from_name;
use codstore_db::NewProduct;

use crate::api::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferInput {
    pub qty: u32,
    pub label: String,
    pub price_minor: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub short_desc: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub offers: Vec<OfferInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProduct {
    pub id: uuid::Uuid,
    pub slug: String,
    pub name: String,
    pub short_desc: String,
    pub images: serde_json::Value,
    pub offers: serde_json::Value,
}

/// `POST /api/admin/products`
pub async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedProduct>>), ApiError> {
    let name = body.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "name is required",
        ));
    }

    let slug = slug_from_name(&name);
    if slug.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "name must contain at least one alphanumeric character",
        ));
    }

    for offer in &body.offers {
        if offer.qty == 0 || offer.price_minor <= 0 {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "offers need a positive qty and price",
            ));
        }
    }

    let offers = json!(body
        .offers
        .iter()
        .map(|o| json!({"qty": o.qty, "label": o.label, "price_minor": o.price_minor}))
        .collect::<Vec<_>>());

    let product = NewProduct {
        slug: slug.clone(),
        name,
        short_desc: body.short_desc.unwrap_or_default(),
        images: json!(body.images),
        offers,
    };

    let row = codstore_db::create_product(&state.pool, &product)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::new(
                    req_id.0.clone(),
                    "conflict",
                    format!("a product with slug '{slug}' already exists"),
                )
            } else {
                map_db_error(req_id.0.clone(), &e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CreatedProduct {
                id: row.id,
                slug: row.slug,
                name: row.name,
                short_desc: row.short_desc,
                images: row.images,
                offers: row.offers,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

fn is_unique_violation(error: &codstore_db::DbError) -> bool {
    match error {
        codstore_db::DbError::Sqlx(sqlx::Error::Database(db)) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION)
        }
        _ => false,
    }
}
