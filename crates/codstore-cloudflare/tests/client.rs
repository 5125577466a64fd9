//! Integration tests for `CloudflareClient` using wiremock HTTP mocks.

use chrono::{DateTime, Utc};
use codstore_cloudflare::{BucketSource, CloudflareClient};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(api_url: &str) -> CloudflareClient {
    CloudflareClient::with_api_url("test-token", "zone-123", api_url)
        .expect("client construction should not fail")
}

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("timestamp")
}

#[tokio::test]
async fn fetch_daily_visits_parses_buckets() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": {
            "viewer": {
                "zones": [{
                    "httpRequests1dGroups": [
                        { "dimensions": { "date": "2026-08-01" }, "sum": { "requests": 321 } },
                        { "dimensions": { "date": "2026-08-02" }, "sum": { "requests": 187 } }
                    ]
                }]
            }
        }
    });

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(
            serde_json::json!({ "variables": { "zoneTag": "zone-123", "start": "2026-08-01", "end": "2026-08-02" } }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let buckets = client
        .fetch_daily_visits(ts("2026-08-01T00:00:00Z"), ts("2026-08-02T12:00:00Z"))
        .await
        .expect("should parse buckets");

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].bucket_label, "2026-08-01");
    assert_eq!(buckets[0].bucket_start, ts("2026-08-01T00:00:00Z"));
    assert_eq!(buckets[0].count, 321);
    assert_eq!(buckets[0].source, BucketSource::Daily);
    assert_eq!(buckets[0].zone_id, "zone-123");
    assert_eq!(buckets[1].count, 187);
}

#[tokio::test]
async fn fetch_minute_visits_parses_buckets() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": {
            "viewer": {
                "zones": [{
                    "httpRequests1mGroups": [
                        {
                            "dimensions": { "datetimeMinute": "2026-08-29T10:15:00Z" },
                            "sum": { "requests": 9 }
                        }
                    ]
                }]
            }
        }
    });

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let buckets = client
        .fetch_minute_visits(ts("2026-08-29T10:00:00Z"), ts("2026-08-29T10:30:00Z"))
        .await
        .expect("should parse buckets");

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].bucket_start, ts("2026-08-29T10:15:00Z"));
    assert_eq!(buckets[0].source, BucketSource::Minute);
}

#[tokio::test]
async fn graphql_errors_surface_as_api_error() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": null,
        "errors": [
            { "message": "zone not found" },
            { "message": "quota exceeded" }
        ]
    });

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_daily_visits(ts("2026-08-01T00:00:00Z"), ts("2026-08-02T00:00:00Z"))
        .await
        .expect_err("should surface GraphQL errors");

    let message = err.to_string();
    assert!(message.contains("zone not found"));
    assert!(message.contains("quota exceeded"));
}

#[tokio::test]
async fn missing_zone_yields_empty_buckets() {
    let server = MockServer::start().await;

    let body = serde_json::json!({ "data": { "viewer": { "zones": [] } } });

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let buckets = client
        .fetch_daily_visits(ts("2026-08-01T00:00:00Z"), ts("2026-08-02T00:00:00Z"))
        .await
        .expect("empty zone list is not an error");

    assert!(buckets.is_empty());
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_minute_visits(ts("2026-08-29T10:00:00Z"), ts("2026-08-29T10:30:00Z"))
        .await
        .expect_err("500 should be an error");

    assert!(matches!(err, codstore_cloudflare::CloudflareError::Http(_)));
}
