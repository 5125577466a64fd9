//! Back-office order management.
//!
//! Seed (demo) orders are read-only here: single-row mutations answer 403,
//! and bulk mutations silently skip them through the persistence filter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use codstore_core::{normalize_phone, OrderStatus};
use codstore_db::{OrderListFilters, OrderRow, OrderSort, OrderUpdate};

use crate::api::orders::{prepare_order, CreateOrderRequest};
use crate::api::{
    map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, Pagination,
    ResponseMeta,
};
use crate::middleware::RequestId;

use super::{coerce_ids, day_end_exclusive, day_start};

/// Full order row as the dashboard sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderView {
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
    pub status: String,
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRow> for AdminOrderView {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            city: row.city,
            address: row.address,
            product_slug: row.product_slug,
            quantity: row.quantity,
            total_price: row.total_price,
            total_price_minor: row.total_price_minor,
            product_name: row.product_name,
            product_price: row.product_price,
            product_images: row.product_images,
            status: row.status,
            is_seed: row.is_seed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderListData {
    pub items: Vec<AdminOrderView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Relative shortcut: orders from the last N days.
    pub days: Option<i64>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_seed: bool,
}

fn parse_sort(sort: Option<&str>) -> OrderSort {
    match sort.map(str::trim) {
        Some("created_at" | "createdAt") => OrderSort::CreatedAtAsc,
        Some("name") => OrderSort::NameAsc,
        Some("-name") => OrderSort::NameDesc,
        Some("total_price" | "totalPrice") => OrderSort::TotalPriceAsc,
        Some("-total_price" | "-totalPrice") => OrderSort::TotalPriceDesc,
        _ => OrderSort::CreatedAtDesc,
    }
}

/// Resolves the status filter: `all`/empty means no filter, anything else
/// must be in the vocabulary.
fn parse_status_filter(status: Option<&str>) -> Result<Option<String>, String> {
    match status.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(s) => s
            .parse::<OrderStatus>()
            .map(|status| Some(status.as_str().to_owned()))
            .map_err(|e| e.to_string()),
    }
}

fn window_bounds(query: &OrderListQuery) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    if let Some(days) = query.days {
        let days = days.max(1);
        let from = day_start(Utc::now().date_naive()) - Duration::days(days - 1);
        return (Some(from), None);
    }

    (
        query.start_date.map(day_start),
        query.end_date.map(day_end_exclusive),
    )
}

/// `GET /api/admin/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<OrderListData>>, ApiError> {
    let status = parse_status_filter(query.status.as_deref())
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;
    let (from, to) = window_bounds(&query);

    let limit = normalize_limit(query.limit);
    let page = normalize_page(query.page);

    let filters = OrderListFilters {
        status: status.as_deref(),
        city: query.city.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
        from,
        to,
        include_seed: query.include_seed,
        sort: parse_sort(query.sort.as_deref()),
        limit,
        offset: (page - 1) * limit,
    };

    let rows = codstore_db::list_orders(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total = codstore_db::count_orders(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OrderListData {
            items: rows.into_iter().map(AdminOrderView::from).collect(),
            pagination: Pagination::new(page, limit, total),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdminCreateOrderRequest {
    #[serde(flatten)]
    pub order: CreateOrderRequest,
    pub status: Option<String>,
}

/// `POST /api/admin/orders` — manual back-office entry; same validation and
/// pricing as the storefront, no notification fan-out.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AdminCreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdminOrderView>>), ApiError> {
    let status = match body.status.as_deref().map(str::trim) {
        None | Some("") => OrderStatus::New,
        Some(s) => s.parse::<OrderStatus>().map_err(|e| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })?,
    };

    let new_order = prepare_order(&body.order, status.as_str())
        .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?;

    let row = codstore_db::create_order(&state.pool, &new_order)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: AdminOrderView::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// `GET /api/admin/orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdminOrderView>>, ApiError> {
    let row = codstore_db::get_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| order_not_found(&req_id.0, id))?;

    Ok(Json(ApiResponse {
        data: AdminOrderView::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<String>,
}

/// `PUT /api/admin/orders/{id}`
pub async fn update_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<AdminOrderView>>, ApiError> {
    let status = match body.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<OrderStatus>()
                .map(|status| status.as_str().to_owned())
                .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?,
        ),
    };

    let phone = match body.phone.as_deref() {
        None => None,
        Some(raw) => Some(normalize_phone(raw).map_err(|e| {
            ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
        })?),
    };

    reject_seed_target(&state, &req_id.0, id).await?;

    let update = OrderUpdate {
        name: body.name,
        phone,
        city: body.city,
        address: body.address,
        quantity: body.quantity.map(|q| q.clamp(1, 10)),
        status,
    };

    let row = codstore_db::update_order(&state.pool, id, &update)
        .await
        .map_err(|e| match e {
            codstore_db::DbError::NotFound => order_not_found(&req_id.0, id),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: AdminOrderView::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// `PATCH /api/admin/orders/{id}/status`
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<AdminOrderView>>, ApiError> {
    let status = body
        .status
        .trim()
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    reject_seed_target(&state, &req_id.0, id).await?;

    let row = codstore_db::update_order_status(&state.pool, id, status.as_str())
        .await
        .map_err(|e| match e {
            codstore_db::DbError::NotFound => order_not_found(&req_id.0, id),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: AdminOrderView::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeletedData {
    pub deleted: bool,
}

/// `DELETE /api/admin/orders/{id}`
pub async fn delete_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedData>>, ApiError> {
    reject_seed_target(&state, &req_id.0, id).await?;

    let deleted = codstore_db::delete_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(order_not_found(&req_id.0, id));
    }

    Ok(Json(ApiResponse {
        data: DeletedData { deleted },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: serde_json::Value,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BulkResultData {
    pub affected: u64,
}

/// `POST /api/admin/orders/bulk-status`
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkStatusRequest>,
) -> Result<Json<ApiResponse<BulkResultData>>, ApiError> {
    let status = body
        .status
        .trim()
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let ids = coerce_ids(&body.ids);
    if ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ids must contain at least one valid order id",
        ));
    }

    let affected = codstore_db::bulk_update_status(&state.pool, &ids, status.as_str())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkResultData { affected },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: serde_json::Value,
}

/// `POST /api/admin/orders/bulk-delete`
pub async fn bulk_delete_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<BulkResultData>>, ApiError> {
    let ids = coerce_ids(&body.ids);
    if ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ids must contain at least one valid order id",
        ));
    }

    let affected = codstore_db::bulk_delete_orders(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkResultData { affected },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn order_not_found(request_id: &str, id: Uuid) -> ApiError {
    ApiError::new(
        request_id.to_owned(),
        "not_found",
        format!("no order with id {id}"),
    )
}

/// Seed rows are demo fixtures; single-row mutations against them are
/// refused outright so the dashboard shows an explicit error.
async fn reject_seed_target(state: &AppState, request_id: &str, id: Uuid) -> Result<(), ApiError> {
    let row = codstore_db::get_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;

    match row {
        Some(row) if row.is_seed => Err(ApiError::new(
            request_id.to_owned(),
            "forbidden",
            "seed orders cannot be modified",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_cover_both_naming_styles() {
        assert_eq!(parse_sort(Some("-created_at")), OrderSort::CreatedAtDesc);
        assert_eq!(parse_sort(Some("createdAt")), OrderSort::CreatedAtAsc);
        assert_eq!(parse_sort(Some("-totalPrice")), OrderSort::TotalPriceDesc);
        assert_eq!(parse_sort(Some("rubbish")), OrderSort::CreatedAtDesc);
        assert_eq!(parse_sort(None), OrderSort::CreatedAtDesc);
    }

    #[test]
    fn status_filter_all_means_no_filter() {
        assert_eq!(parse_status_filter(Some("all")), Ok(None));
        assert_eq!(parse_status_filter(None), Ok(None));
        assert_eq!(
            parse_status_filter(Some("delivered")),
            Ok(Some("delivered".to_string()))
        );
        assert!(parse_status_filter(Some("shipped-ish")).is_err());
    }

    #[test]
    fn days_shortcut_wins_over_explicit_dates() {
        let query = OrderListQuery {
            days: Some(7),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..OrderListQuery::default()
        };
        let (from, to) = window_bounds(&query);
        let from = from.expect("relative lower bound");
        assert!(to.is_none());
        assert!(Utc::now() - from < Duration::days(8));
    }

    #[test]
    fn explicit_dates_make_an_inclusive_range() {
        let query = OrderListQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..OrderListQuery::default()
        };
        let (from, to) = window_bounds(&query);
        assert_eq!(from.expect("from").to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(to.expect("to").to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }
}
