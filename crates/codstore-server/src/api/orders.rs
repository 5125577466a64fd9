//! Public order intake: the conversion point of the storefront.
//!
//! The handler answers 201 as soon as the row is stored; the Telegram and
//! Meta fan-outs run in their own tasks and never delay or fail the order.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use codstore_core::{catalog, money::CURRENCY_CODE, normalize_phone};
use codstore_db::NewOrder;
use codstore_notify::{OrderNotification, PurchaseEvent};

use crate::middleware::RequestId;

use super::{client_ip, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const MIN_QUANTITY: u32 = 1;
const MAX_QUANTITY: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub product_slug: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// The trimmed order view returned to the storefront.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub city: String,
    pub product_name: String,
    pub quantity: i32,
    pub total_price: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&codstore_db::OrderRow> for OrderSummary {
    fn from(row: &codstore_db::OrderRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            phone: row.phone.clone(),
            city: row.city.clone(),
            product_name: row.product_name.clone(),
            quantity: row.quantity,
            total_price: row.total_price.clone(),
            status: row.status.clone(),
            created_at: row.created_at,
        }
    }
}

fn required_field(value: Option<&String>, field: &str) -> Result<String, String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{field} is required"))
}

/// Validates a request and resolves it into an insertable order.
/// Shared with the admin create endpoint, which layers a status on top.
pub(super) fn prepare_order(
    body: &CreateOrderRequest,
    status: &str,
) -> Result<NewOrder, String> {
    let name = required_field(body.name.as_ref(), "name")?;
    let city = required_field(body.city.as_ref(), "city")?;
    let raw_phone = required_field(body.phone.as_ref(), "phone")?;
    let phone = normalize_phone(&raw_phone).map_err(|e| e.to_string())?;

    let slug = required_field(body.product_slug.as_ref(), "productSlug")?;
    let quantity = body
        .quantity
        .unwrap_or(MIN_QUANTITY)
        .clamp(MIN_QUANTITY, MAX_QUANTITY);

    let quote = catalog::quote(&slug, quantity).map_err(|e| e.to_string())?;
    let product = catalog::pricing_product(&slug);

    Ok(NewOrder {
        name,
        phone,
        city,
        address: body
            .address
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_owned(),
        product_slug: slug,
        quantity: i32::try_from(quantity).unwrap_or(1),
        total_price: quote.total.display(),
        total_price_minor: quote.total.minor(),
        product_name: product.name.to_owned(),
        product_price: quote.unit.display(),
        product_images: serde_json::json!(product.images),
        product_short_desc: product.short_desc.to_owned(),
        product_full_desc: product.full_desc.to_owned(),
        product_benefits: serde_json::json!(product.benefits),
        product_usage: product.usage.to_owned(),
        product_guarantee: product.guarantee.to_owned(),
        product_delivery_info: product.delivery_info.to_owned(),
        product_reviews: serde_json::json!([]),
        status: status.to_owned(),
        is_seed: false,
    })
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderSummary>>), ApiError> {
    let new_order = prepare_order(&body, "new")
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    let row = codstore_db::create_order(&state.pool, &new_order)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(order_id = %row.id, product = %row.product_slug, "order stored");

    spawn_fanout(&state, &headers, &row);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: OrderSummary::from(&row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// Fires the Telegram and Meta notifications, each in its own task. Both own
/// their inputs and report only to the log.
fn spawn_fanout(state: &AppState, headers: &HeaderMap, row: &codstore_db::OrderRow) {
    if let Some(notifier) = state.notifier.clone() {
        let order = OrderNotification {
            name: row.name.clone(),
            phone: row.phone.clone(),
            product: row.product_name.clone(),
            price: row.total_price.clone(),
            city: row.city.clone(),
        };
        let order_id = row.id;
        tokio::spawn(async move {
            let summary = notifier.send_order_notification(&order).await;
            if summary.any_delivered() {
                tracing::info!(order_id = %order_id, sent = summary.sent, failed = summary.failed, "telegram notification sent");
            } else {
                tracing::warn!(order_id = %order_id, failed = summary.failed, "telegram notification failed for every chat");
            }
        });
    }

    if let Some(capi) = state.capi.clone() {
        let event = PurchaseEvent {
            client_ip: client_ip(headers),
            user_agent: header_str(headers, "user-agent"),
            value_minor: row.total_price_minor,
            currency: CURRENCY_CODE.to_owned(),
            source_url: source_url(headers, state),
            order_id: row.id.to_string(),
            content_name: row.product_name.clone(),
            content_id: row.product_slug.clone(),
        };
        tokio::spawn(async move {
            match capi.send_purchase(&event).await {
                Ok(ack) => {
                    tracing::info!(order_id = %event.order_id, events_received = ack.events_received, "purchase event sent");
                }
                Err(e) => {
                    tracing::warn!(order_id = %event.order_id, error = %e, "purchase event failed");
                }
            }
        });
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Where the conversion happened: Origin, then Referer, then the first
/// configured storefront origin.
fn source_url(headers: &HeaderMap, state: &AppState) -> String {
    let from_headers = headers
        .get("origin")
        .or_else(|| headers.get("referer"))
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty());

    from_headers.map_or_else(
        || {
            state
                .config
                .cors_origins
                .first()
                .cloned()
                .unwrap_or_default()
        },
        ToOwned::to_owned,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(slug: &str, quantity: u32) -> CreateOrderRequest {
        CreateOrderRequest {
            name: Some("Marie Ngo".to_string()),
            phone: Some("00237676778377".to_string()),
            city: Some("Douala".to_string()),
            address: Some("Akwa".to_string()),
            product_slug: Some(slug.to_string()),
            quantity: Some(quantity),
        }
    }

    #[test]
    fn duo_offer_beats_unit_price() {
        let order = prepare_order(&request("hismile", 2), "new").expect("valid order");
        assert_eq!(order.total_price_minor, 14_000);
        assert_eq!(order.total_price, "14,000 FCFA");
        assert_eq!(order.phone, "+237676778377");
    }

    #[test]
    fn quantities_above_offers_fall_back_to_unit_price() {
        let order = prepare_order(&request("hismile", 3), "new").expect("valid order");
        assert_eq!(order.total_price_minor, 3 * 9_900);
    }

    #[test]
    fn bundle_only_product_rejects_off_tier_quantities() {
        let err = prepare_order(&request("gumies", 5), "new").expect_err("no 5-unit offer");
        assert!(err.contains("gumies"), "unexpected message: {err}");
    }

    #[test]
    fn missing_fields_are_rejected_with_field_name() {
        let mut body = request("hismile", 1);
        body.city = Some("   ".to_string());
        let err = prepare_order(&body, "new").expect_err("blank city");
        assert_eq!(err, "city is required");
    }

    #[test]
    fn missing_product_slug_is_rejected() {
        let mut body = request("hismile", 1);
        body.product_slug = None;
        let err = prepare_order(&body, "new").expect_err("absent slug");
        assert_eq!(err, "productSlug is required");

        body.product_slug = Some("  ".to_string());
        let err = prepare_order(&body, "new").expect_err("blank slug");
        assert_eq!(err, "productSlug is required");
    }

    #[test]
    fn unknown_slug_prices_as_default_product() {
        let order = prepare_order(&request("mystery", 1), "new").expect("default pricing");
        assert_eq!(order.total_price_minor, 9_900);
        assert_eq!(order.product_slug, "mystery");
    }

    #[test]
    fn quantity_is_clamped_and_defaulted() {
        let mut body = request("hismile", 99);
        let order = prepare_order(&body, "new").expect("clamped");
        assert_eq!(order.quantity, 10);

        body.quantity = None;
        let order = prepare_order(&body, "new").expect("defaulted");
        assert_eq!(order.quantity, 1);
    }
}
