//! Cloudflare analytics mirror management.
//!
//! `import` and `sync` persist buckets through the upsert path so re-runs
//! are idempotent; `live` reads the API directly and stores nothing.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use codstore_cloudflare::{CloudflareClient, VisitBucket};
use codstore_db::NewBucket;

use crate::api::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

use super::day_start;

const SYNC_DAILY_DAYS: i64 = 7;
const SYNC_MINUTE_MINUTES: i64 = 30;

fn require_client(state: &AppState, request_id: &str) -> Result<Arc<CloudflareClient>, ApiError> {
    state.cloudflare.clone().ok_or_else(|| {
        ApiError::new(
            request_id.to_owned(),
            "bad_request",
            "cloudflare analytics is not configured",
        )
    })
}

fn upstream_error(request_id: &str, error: &codstore_cloudflare::CloudflareError) -> ApiError {
    tracing::error!(error = %error, "cloudflare analytics request failed");
    ApiError::new(request_id.to_owned(), "internal_error", error.to_string())
}

fn to_new_buckets(buckets: Vec<VisitBucket>) -> Vec<NewBucket> {
    buckets
        .into_iter()
        .map(|b| NewBucket {
            bucket_start: b.bucket_start,
            bucket_label: b.bucket_label,
            count: b.count,
            source: b.source.as_str().to_owned(),
            zone_id: b.zone_id,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ImportData {
    pub imported: u64,
}

/// `POST /api/admin/analytics/cloudflare/import`
pub async fn import_buckets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ApiResponse<ImportData>>, ApiError> {
    let client = require_client(&state, &req_id.0)?;

    let buckets = client
        .fetch_daily_visits(day_start(body.start_date), day_start(body.end_date))
        .await
        .map_err(|e| upstream_error(&req_id.0, &e))?;

    let imported = codstore_db::upsert_buckets(&state.pool, &to_new_buckets(buckets))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(imported, "cloudflare daily import finished");

    Ok(Json(ApiResponse {
        data: ImportData { imported },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub struct SyncData {
    pub daily: u64,
    pub minute: u64,
}

/// `POST /api/admin/analytics/cloudflare/sync` — daily buckets for the last
/// week plus minute buckets for the last half hour.
pub async fn sync_buckets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SyncData>>, ApiError> {
    let client = require_client(&state, &req_id.0)?;
    let now = Utc::now();

    let daily = client
        .fetch_daily_visits(now - Duration::days(SYNC_DAILY_DAYS), now)
        .await
        .map_err(|e| upstream_error(&req_id.0, &e))?;
    let daily = codstore_db::upsert_buckets(&state.pool, &to_new_buckets(daily))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let minute = client
        .fetch_minute_visits(now - Duration::minutes(SYNC_MINUTE_MINUTES), now)
        .await
        .map_err(|e| upstream_error(&req_id.0, &e))?;
    let minute = codstore_db::upsert_buckets(&state.pool, &to_new_buckets(minute))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(daily, minute, "cloudflare sync finished");

    Ok(Json(ApiResponse {
        data: SyncData { daily, minute },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSourceView {
    pub source: String,
    pub buckets: i64,
    pub latest_bucket: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StatusData {
    pub configured: bool,
    pub sources: Vec<MirrorSourceView>,
}

/// `GET /api/admin/analytics/cloudflare/status`
pub async fn mirror_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatusData>>, ApiError> {
    let sources = codstore_db::mirror_status(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(|s| MirrorSourceView {
            source: s.source,
            buckets: s.buckets,
            latest_bucket: s.latest_bucket,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: StatusData {
            configured: state.cloudflare.is_some(),
            sources,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct LiveQuery {
    pub minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBucketView {
    pub bucket_start: DateTime<Utc>,
    pub label: String,
    pub count: i64,
}

/// `GET /api/admin/analytics/cloudflare/live` — straight from the API, never
/// persisted.
pub async fn live_buckets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LiveQuery>,
) -> Result<Json<ApiResponse<Vec<LiveBucketView>>>, ApiError> {
    let client = require_client(&state, &req_id.0)?;
    let minutes = query.minutes.unwrap_or(SYNC_MINUTE_MINUTES).clamp(1, 360);
    let now = Utc::now();

    let buckets = client
        .fetch_minute_visits(now - Duration::minutes(minutes), now)
        .await
        .map_err(|e| upstream_error(&req_id.0, &e))?
        .into_iter()
        .map(|b| LiveBucketView {
            bucket_start: b.bucket_start,
            label: b.bucket_label,
            count: b.count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: buckets,
        meta: ResponseMeta::new(req_id.0),
    }))
}
