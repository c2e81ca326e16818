mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use checkout_backend::routes::create_router;
use common::{CountingNotifier, FakeGateway, checkout_metadata, harness, shipping};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn create_session_prices_the_cart() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state);

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/create-session",
        Some(json!({
            "items": [{
                "product_id": "7f1c1a2e-4a8e-4c57-9a53-2d7d3c1b9e10",
                "name": "Linen shirt",
                "price": 1000,
                "quantity": 2,
                "product_discount": 10.0,
                "event_discount": 20.0
            }],
            "shipping": shipping(),
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["session_id"], "cs_test_0");
    // Product discount wins over the larger event discount.
    assert_eq!(data["subtotal"], 1800);
    assert_eq!(data["shipping_cost"], 49);
    assert_eq!(data["total"], 1849);
    assert_eq!(data["currency"], "sek");
}

#[tokio::test]
async fn create_session_requires_items_and_shipping() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-session",
        Some(json!({ "shipping": shipping() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-session",
        Some(json!({ "items": [{
            "product_id": "7f1c1a2e-4a8e-4c57-9a53-2d7d3c1b9e10",
            "name": "Linen shirt",
            "price": 1000,
            "quantity": 1
        }]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-session",
        Some(json!([1, 2])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_session_rejects_overflowing_amounts() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state.clone());

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-session",
        Some(json!({
            "items": [{
                "product_id": "7f1c1a2e-4a8e-4c57-9a53-2d7d3c1b9e10",
                "name": "Linen shirt",
                "price": i64::MAX,
                "quantity": 2
            }],
            "shipping": shipping(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.gateway.created.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieve_session_reports_payment_state() {
    let h = harness(
        FakeGateway::default().with_session("cs_view", "paid", checkout_metadata()),
        CountingNotifier::default(),
    );
    let app = create_router(h.state);

    let (status, body) = call(
        &app,
        "GET",
        "/api/checkout/retrieve-session?session_id=cs_view",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, _) = call(&app, "GET", "/api/checkout/retrieve-session", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn client_callback_then_order_management() {
    let h = harness(
        FakeGateway::default().with_session("cs_flow", "paid", checkout_metadata()),
        CountingNotifier::default(),
    );
    let app = create_router(h.state.clone());

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/create-order-from-session",
        Some(json!({ "session_id": "cs_flow" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], true);
    assert_eq!(body["data"]["order"]["total_amount"], 1849);
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/retrigger",
        Some(json!({ "session_id": "cs_flow" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], false);
    assert_eq!(body["data"]["order"]["id"], order_id);
    assert_eq!(h.notifier.confirmations(), 1);

    let (status, body) = call(&app, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/orders/{order_id}/status"),
        Some(json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["previous_status"], "processing");
    assert_eq!(body["data"]["order"]["status"], "shipped");
    assert_eq!(body["data"]["email_sent"], true);
    assert_eq!(h.notifier.status_updates(), 1);

    let (status, body) = call(&app, "GET", "/api/orders?status=shipped", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let (status, _) = call(&app, "GET", "/api/orders?status=lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/status-update-email"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email_sent"], true);
    assert_eq!(h.notifier.status_updates(), 2);

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/send-confirmation-email",
        Some(json!({ "order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email_sent"], true);
    assert_eq!(h.notifier.confirmations(), 2);
}

#[tokio::test]
async fn email_endpoints_report_failure_in_body() {
    let h = harness(
        FakeGateway::default().with_session("cs_mail", "paid", checkout_metadata()),
        CountingNotifier::failing(),
    );
    let app = create_router(h.state);

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/create-order-from-session",
        Some(json!({ "session_id": "cs_mail" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/api/checkout/send-confirmation-email",
        Some(json!({ "order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email_sent"], false);
    assert!(body["data"]["error"].is_string());

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/send-confirmation-email",
        Some(json!({ "order_id": "00000000-0000-4000-8000-000000000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unpaid_callback_is_bad_request() {
    let h = harness(
        FakeGateway::default().with_session("cs_open", "unpaid", checkout_metadata()),
        CountingNotifier::default(),
    );
    let app = create_router(h.state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-order-from-session",
        Some(json!({ "session_id": "cs_open" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/checkout/create-order-from-session",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_update_email_body_is_optional() {
    let h = harness(
        FakeGateway::default().with_session("cs_optional", "paid", checkout_metadata()),
        CountingNotifier::default(),
    );
    let app = create_router(h.state.clone());

    let (_, body) = call(
        &app,
        "POST",
        "/api/checkout/create-order-from-session",
        Some(json!({ "session_id": "cs_optional" })),
    )
    .await;
    let uri = format!(
        "/api/orders/{}/status-update-email",
        body["data"]["order"]["id"].as_str().unwrap()
    );

    let send = |body: &'static str| {
        let app = app.clone();
        let uri = uri.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
        }
    };

    assert_eq!(send("").await, StatusCode::OK);
    assert_eq!(send(r#"{"new_status":"shipped"}"#).await, StatusCode::OK);
    assert_eq!(send("{not json").await, StatusCode::BAD_REQUEST);
    assert_eq!(h.notifier.status_updates(), 2);
}
