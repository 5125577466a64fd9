//! Integration tests for the notification adapters using wiremock HTTP mocks.

use codstore_notify::{MetaCapi, OrderNotification, PurchaseEvent, TelegramNotifier};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_order() -> OrderNotification {
    OrderNotification {
        name: "Aïcha".to_string(),
        phone: "+237676778377".to_string(),
        product: "Hismile".to_string(),
        price: "14,000 FCFA".to_string(),
        city: "Douala".to_string(),
    }
}

fn sample_purchase() -> PurchaseEvent {
    PurchaseEvent {
        client_ip: "41.202.0.1".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        value_minor: 14_000,
        currency: "XAF".to_string(),
        source_url: "https://shop.example.com".to_string(),
        order_id: "order-1".to_string(),
        content_name: "Hismile".to_string(),
        content_id: "hismile".to_string(),
    }
}

#[tokio::test]
async fn telegram_sends_to_every_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(
        "test-token",
        vec!["111".to_string(), "222".to_string()],
        &server.uri(),
    )
    .expect("notifier");

    let summary = notifier.send_order_notification(&sample_order()).await;
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.any_delivered());
}

#[tokio::test]
async fn telegram_counts_partial_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "chat_id": "good" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "chat_id": "bad" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            serde_json::json!({ "ok": false, "description": "chat not found" }),
        ))
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(
        "tok",
        vec!["good".to_string(), "bad".to_string()],
        &server.uri(),
    )
    .expect("notifier");

    let summary = notifier.send_order_notification(&sample_order()).await;
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.any_delivered());
}

#[tokio::test]
async fn meta_purchase_posts_to_pixel_events() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pixel-9/events"))
        .and(query_param("access_token", "secret"))
        .and(body_partial_json(serde_json::json!({
            "data": [{
                "event_name": "Purchase",
                "custom_data": { "value": 14_000, "currency": "XAF", "order_id": "order-1" }
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "events_received": 1 })),
        )
        .mount(&server)
        .await;

    let capi = MetaCapi::with_api_base("pixel-9", "secret", None, &server.uri()).expect("client");
    let ack = capi
        .send_purchase(&sample_purchase())
        .await
        .expect("purchase accepted");

    assert_eq!(ack.events_received, 1);
}

#[tokio::test]
async fn meta_test_event_code_is_included_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(
            serde_json::json!({ "test_event_code": "TEST123" }),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "events_received": 1 })),
        )
        .mount(&server)
        .await;

    let capi = MetaCapi::with_api_base("px", "tok", Some("TEST123".to_string()), &server.uri())
        .expect("client");
    capi.send_purchase(&sample_purchase())
        .await
        .expect("purchase accepted");
}

#[tokio::test]
async fn meta_api_error_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            serde_json::json!({ "error": { "message": "Invalid OAuth access token" } }),
        ))
        .mount(&server)
        .await;

    let capi = MetaCapi::with_api_base("px", "tok", None, &server.uri()).expect("client");
    let err = capi
        .send_purchase(&sample_purchase())
        .await
        .expect_err("should fail");

    assert!(err.to_string().contains("Invalid OAuth access token"));
}
