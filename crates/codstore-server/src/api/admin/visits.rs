//! Back-office traffic inspection.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use codstore_db::{VisitListFilters, VisitRow};

use crate::api::{
    map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, Pagination,
    ResponseMeta,
};
use crate::middleware::RequestId;

use super::{coerce_ids, day_end_exclusive, day_start};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitView {
    pub id: Uuid,
    pub path: String,
    pub referrer: String,
    pub user_agent: String,
    pub ip: String,
    pub session_id: String,
    pub is_seed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<VisitRow> for VisitView {
    fn from(row: VisitRow) -> Self {
        Self {
            id: row.id,
            path: row.path,
            referrer: row.referrer,
            user_agent: row.user_agent,
            ip: row.ip,
            session_id: row.session_id,
            is_seed: row.is_seed,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VisitListData {
    pub items: Vec<VisitView>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, Default)]
pub struct VisitListQuery {
    pub path: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub include_seed: bool,
}

/// `GET /api/admin/visits`
pub async fn list_visits(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<VisitListQuery>,
) -> Result<Json<ApiResponse<VisitListData>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let page = normalize_page(query.page);

    let filters = VisitListFilters {
        path: query.path.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
        from: query.start_date.map(day_start),
        to: query.end_date.map(day_end_exclusive),
        include_seed: query.include_seed,
        limit,
        offset: (page - 1) * limit,
    };

    let (rows, total) = codstore_db::list_visits(&state.pool, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: VisitListData {
            items: rows.into_iter().map(VisitView::from).collect(),
            pagination: Pagination::new(page, limit, total),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub struct DeletedData {
    pub deleted: bool,
}

/// `DELETE /api/admin/visits/{id}`
pub async fn delete_visit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedData>>, ApiError> {
    let deleted = codstore_db::delete_visit(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if !deleted {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no visit with id {id}"),
        ));
    }

    Ok(Json(ApiResponse {
        data: DeletedData { deleted },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BulkResultData {
    pub affected: u64,
}

/// `POST /api/admin/visits/bulk-delete`
pub async fn bulk_delete_visits(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<BulkResultData>>, ApiError> {
    let ids = coerce_ids(&body.ids);
    if ids.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "ids must contain at least one valid visit id",
        ));
    }

    let affected = codstore_db::bulk_delete_visits(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkResultData { affected },
        meta: ResponseMeta::new(req_id.0),
    }))
}
