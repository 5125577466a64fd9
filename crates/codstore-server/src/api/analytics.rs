//! Public page-view tracking.
//!
//! Tracking must never break the storefront: a failed insert is logged and
//! still answered with 200 so the client script stays silent.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::{Deserialize, Serialize};

use codstore_db::NewVisit;

use crate::middleware::RequestId;

use super::{client_ip, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackVisitData {
    pub success: bool,
}

/// `POST /api/analytics/track-visit`
pub async fn track_visit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Json(body): Json<TrackVisitRequest>,
) -> Json<ApiResponse<TrackVisitData>> {
    let user_agent = body
        .user_agent
        .filter(|ua| !ua.is_empty())
        .or_else(|| {
            headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_default();

    let visit = NewVisit {
        path: body.path.filter(|p| !p.is_empty()).unwrap_or_else(|| "/".to_string()),
        referrer: body.referrer.unwrap_or_default(),
        user_agent,
        ip: client_ip(&headers),
        session_id: body.session_id.unwrap_or_default(),
        is_seed: false,
    };

    let success = match codstore_db::insert_visit(&state.pool, &visit).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, path = %visit.path, "visit tracking failed");
            false
        }
    };

    Json(ApiResponse {
        data: TrackVisitData { success },
        meta: ResponseMeta::new(req_id.0),
    })
}
