mod admin;
mod analytics;
mod orders;
mod products;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::{request_id, require_admin_key, AuthState, RequestId};

const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<codstore_core::AppConfig>,
    pub notifier: Option<Arc<codstore_notify::TelegramNotifier>>,
    pub capi: Option<Arc<codstore_notify::MetaCapi>>,
    pub cloudflare: Option<Arc<codstore_cloudflare::CloudflareClient>>,
    pub storage: Option<Arc<codstore_storage::ObjectStore>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Pagination block returned alongside admin list data.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub(super) fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

pub(super) fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

pub(super) fn map_db_error(request_id: String, error: &codstore_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// First address in `X-Forwarded-For`, or "unknown" when absent.
pub(super) fn client_ip(headers: &axum::http::HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| "unknown".to_string(), ToOwned::to_owned)
}

fn build_cors(config: &codstore_core::AppConfig) -> CorsLayer {
    let origins = config.cors_origins.clone();
    let suffixes = config.cors_suffixes.clone();

    let allow = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin.to_str().is_ok_and(|origin| {
            origins.iter().any(|allowed| allowed == origin)
                || suffixes.iter().any(|suffix| origin.ends_with(suffix))
        })
    });

    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-admin-key"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/orders",
            get(admin::orders::list_orders).post(admin::orders::create_order),
        )
        .route(
            "/api/admin/orders/bulk-status",
            post(admin::orders::bulk_update_status),
        )
        .route(
            "/api/admin/orders/bulk-delete",
            post(admin::orders::bulk_delete_orders),
        )
        .route(
            "/api/admin/orders/{id}",
            get(admin::orders::get_order)
                .put(admin::orders::update_order)
                .delete(admin::orders::delete_order),
        )
        .route(
            "/api/admin/orders/{id}/status",
            axum::routing::patch(admin::orders::update_order_status),
        )
        .route("/api/admin/visits", get(admin::visits::list_visits))
        .route(
            "/api/admin/visits/bulk-delete",
            post(admin::visits::bulk_delete_visits),
        )
        .route(
            "/api/admin/visits/{id}",
            axum::routing::delete(admin::visits::delete_visit),
        )
        .route("/api/admin/products", post(admin::products::create_product))
        .route(
            "/api/admin/upload-image",
            post(admin::upload::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/admin/stats", get(admin::stats::get_stats))
        .route(
            "/api/admin/analytics/cloudflare/import",
            post(admin::cloudflare::import_buckets),
        )
        .route(
            "/api/admin/analytics/cloudflare/sync",
            post(admin::cloudflare::sync_buckets),
        )
        .route(
            "/api/admin/analytics/cloudflare/status",
            get(admin::cloudflare::mirror_status),
        )
        .route(
            "/api/admin/analytics/cloudflare/live",
            get(admin::cloudflare::live_buckets),
        )
        .layer(axum::middleware::from_fn_with_state(auth, require_admin_key))
}

pub fn build_app(state: AppState, auth: AuthState, config: &codstore_core::AppConfig) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/orders", post(orders::create_order))
        .route("/api/analytics/track-visit", post(analytics::track_visit))
        .route("/api/products", get(products::list_products))
        .route("/api/products/{slug}", get(products::get_product));

    Router::new()
        .merge(public_routes)
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(build_cors(config))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);
    let now = Utc::now();

    match codstore_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                    timestamp: now,
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        timestamp: now,
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_config(admin_key: Option<&str>) -> codstore_core::AppConfig {
        codstore_core::AppConfig {
            database_url: "postgres://unused".to_string(),
            env: codstore_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            admin_key: admin_key.map(ToOwned::to_owned),
            cors_origins: vec!["http://localhost:5173".to_string()],
            cors_suffixes: vec![".pages.dev".to_string()],
            telegram_token: None,
            telegram_chat_ids: Vec::new(),
            meta_pixel_id: None,
            meta_access_token: None,
            meta_test_event_code: None,
            cloudflare_api_token: None,
            cloudflare_zone_id: None,
            storage: None,
            db_max_connections: 5,
            db_min_connections: 1,
            db_acquire_timeout_secs: 5,
        }
    }

    fn test_app(pool: PgPool, admin_key: Option<&str>) -> Router {
        let config = Arc::new(test_config(admin_key));
        let auth = crate::middleware::AuthState::with_key(admin_key);
        build_app(
            AppState {
                pool,
                config: Arc::clone(&config),
                notifier: None,
                capi: None,
                cloudflare: None,
                storage: None,
            },
            auth,
            &config,
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_ok(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"], "ok");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn admin_routes_require_the_key(pool: PgPool) {
        let app = test_app(pool, Some("top-secret"));

        let denied = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/admin/orders")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/orders")
                    .header("x-admin-key", "top-secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn order_intake_persists_and_prices_the_duo_offer(pool: PgPool) {
        let app = test_app(pool, None);

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/orders",
                serde_json::json!({
                    "name": "Marie Ngo",
                    "phone": "00237676778377",
                    "city": "Douala",
                    "productSlug": "hismile",
                    "quantity": 2,
                }),
            ))
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        let json = body_json(created).await;
        assert_eq!(json["data"]["totalPrice"], "14,000 FCFA");
        assert_eq!(json["data"]["phone"], "+237676778377");
        assert_eq!(json["data"]["status"], "new");

        let listed = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/orders?search=Marie")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = body_json(listed).await;
        assert_eq!(json["data"]["pagination"]["total"], 1);
        assert_eq!(json["data"]["items"][0]["totalPriceMinor"], 14_000);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn off_tier_quantity_is_rejected(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/orders",
                serde_json::json!({
                    "name": "Jean",
                    "phone": "+237690112233",
                    "city": "Yaoundé",
                    "productSlug": "gumies",
                    "quantity": 5,
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    async fn insert_order(pool: &PgPool, name: &str, is_seed: bool) -> uuid::Uuid {
        sqlx::query_scalar(
            "INSERT INTO orders \
                 (name, phone, city, address, product_slug, quantity, total_price, \
                  total_price_minor, product_name, product_price, product_short_desc, \
                  product_full_desc, product_usage, product_guarantee, \
                  product_delivery_info, status, is_seed) \
             VALUES ($1, '+237600000001', 'Douala', '', 'hismile', 1, '9,900 FCFA', \
                     9900, 'Hismile', '9,900 FCFA', '', '', '', '', '', 'new', $2) \
             RETURNING id",
        )
        .bind(name)
        .bind(is_seed)
        .fetch_one(pool)
        .await
        .expect("insert order")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn seed_orders_refuse_single_row_mutations(pool: PgPool) {
        let id = insert_order(&pool, "Seed", true).await;

        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/admin/orders/{id}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_mutations_leave_seed_rows_untouched(pool: PgPool) {
        let seed_id = insert_order(&pool, "Seed", true).await;
        let real_id = insert_order(&pool, "Paul Biyick", false).await;
        let app = test_app(pool.clone(), None);

        let updated = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/orders/bulk-status",
                serde_json::json!({
                    "ids": [seed_id.to_string(), real_id.to_string()],
                    "status": "called",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(updated.status(), StatusCode::OK);
        let json = body_json(updated).await;
        assert_eq!(json["data"]["affected"], 1);

        let seed_status: String = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(seed_id)
            .fetch_one(&pool)
            .await
            .expect("seed status");
        assert_eq!(seed_status, "new");

        let deleted = app
            .oneshot(json_request(
                "POST",
                "/api/admin/orders/bulk-delete",
                serde_json::json!({"ids": [seed_id.to_string(), real_id.to_string()]}),
            ))
            .await
            .expect("response");
        assert_eq!(deleted.status(), StatusCode::OK);
        let json = body_json(deleted).await;
        assert_eq!(json["data"]["affected"], 1);

        let survivors: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE is_seed = TRUE")
                .fetch_one(&pool)
                .await
                .expect("count seed rows");
        assert_eq!(survivors, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_status_with_no_valid_ids_is_rejected(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/admin/orders/bulk-status",
                serde_json::json!({"ids": ["definitely-not-a-uuid"], "status": "called"}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn track_visit_records_and_acknowledges(pool: PgPool) {
        let app = test_app(pool.clone(), None);
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/analytics/track-visit",
                serde_json::json!({"path": "/landing", "sessionId": "s-1"}),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["success"], true);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .expect("count visits");
        assert_eq!(count, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unknown_product_slug_is_404(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products/does-not-exist")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn static_catalog_answers_when_database_is_empty(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products/hismile")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["source"], "static");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_on_an_empty_store_are_all_zero(pool: PgPool) {
        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/stats?days=7")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["orders"]["total"], 0);
        assert_eq!(json["data"]["visits"]["change"], 0);
        assert_eq!(json["data"]["visits"]["source"], "local");
        assert_eq!(json["data"]["conversionRate"], 0.0);
        assert_eq!(
            json["data"]["orders"]["sparkline"]
                .as_array()
                .map(Vec::len),
            Some(7)
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_prefer_the_mirror_when_daily_buckets_cover_the_window(pool: PgPool) {
        let today = Utc::now().date_naive();
        for (days_back, count) in [(1i64, 12i64), (2, 5)] {
            let day = today - chrono::Duration::days(days_back);
            sqlx::query(
                "INSERT INTO cloudflare_visits (bucket_start, bucket_label, count, source, zone_id) \
                 VALUES ($1, $2, $3, 'daily', 'zone-1')",
            )
            .bind(admin::day_start(day))
            .bind(day.to_string())
            .bind(count)
            .execute(&pool)
            .await
            .expect("insert daily bucket");
        }

        let app = test_app(pool, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/stats?days=7")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["visits"]["source"], "mirror");
        assert_eq!(json["data"]["visits"]["total"], 17);

        let sparkline: i64 = json["data"]["visits"]["sparkline"]
            .as_array()
            .expect("sparkline array")
            .iter()
            .filter_map(serde_json::Value::as_i64)
            .sum();
        assert_eq!(sparkline, 17);
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 100);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn normalize_page_floors_at_one() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(7)), 7);
    }

    #[test]
    fn pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("forbidden", StatusCode::FORBIDDEN),
            ("not_found", StatusCode::NOT_FOUND),
            ("conflict", StatusCode::CONFLICT),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "boom").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn client_ip_takes_first_forwarded_entry() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
        assert_eq!(client_ip(&axum::http::HeaderMap::new()), "unknown");
    }
}
