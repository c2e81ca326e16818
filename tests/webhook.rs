mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use checkout_backend::{payments::Metadata, routes::create_router};
use common::{CountingNotifier, FakeGateway, checkout_metadata, harness};
use serde_json::{Value, json};
use tower::ServiceExt;

fn event(event_type: &str, session_id: &str, payment_status: &str, metadata: &Metadata) -> String {
    json!({
        "id": "evt_test",
        "type": event_type,
        "data": { "object": {
            "id": session_id,
            "status": "complete",
            "payment_status": payment_status,
            "metadata": metadata,
        }}
    })
    .to_string()
}

async fn post_webhook(app: Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/checkout/webhook")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn malformed_event_is_rejected() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let (status, _) = post_webhook(create_router(h.state), "not an event".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_event_creates_order_once() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state.clone());
    let body = event(
        "checkout.session.completed",
        "cs_hook_1",
        "paid",
        &checkout_metadata(),
    );

    let (status, ack) = post_webhook(app.clone(), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["received"], true);
    assert_eq!(ack["outcome"], "order_created");
    let order_id = ack["order_id"].as_str().unwrap().to_string();

    let (status, ack) = post_webhook(app, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "order_exists");
    assert_eq!(ack["order_id"], order_id);

    assert_eq!(h.store.order_count(), 1);
    assert_eq!(h.notifier.confirmations(), 1);
}

#[tokio::test]
async fn unpaid_completion_and_bad_metadata_are_acknowledged() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state.clone());

    let unpaid = event(
        "checkout.session.completed",
        "cs_hook_2",
        "unpaid",
        &checkout_metadata(),
    );
    let (status, ack) = post_webhook(app.clone(), unpaid).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "payment_not_completed");

    let mut legacy = Metadata::new();
    legacy.insert("items".into(), "[]".into());
    let invalid = event("checkout.session.completed", "cs_hook_3", "paid", &legacy);
    let (status, ack) = post_webhook(app, invalid).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "invalid_metadata");

    assert_eq!(h.store.order_count(), 0);
}

#[tokio::test]
async fn async_events_drive_order_status() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let app = create_router(h.state.clone());
    let metadata = checkout_metadata();

    let (_, ack) = post_webhook(
        app.clone(),
        event(
            "checkout.session.async_payment_failed",
            "cs_hook_4",
            "unpaid",
            &metadata,
        ),
    )
    .await;
    assert_eq!(ack["outcome"], "no_order");

    let (_, ack) = post_webhook(
        app.clone(),
        event(
            "checkout.session.async_payment_succeeded",
            "cs_hook_4",
            "paid",
            &metadata,
        ),
    )
    .await;
    assert_eq!(ack["outcome"], "order_created");

    let (status, ack) = post_webhook(
        app,
        event(
            "checkout.session.async_payment_failed",
            "cs_hook_4",
            "unpaid",
            &metadata,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "order_pending");
}

#[tokio::test]
async fn unrelated_events_are_ignored() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let body = json!({ "type": "invoice.paid", "data": { "object": { "id": "in_1" } } });
    let (status, ack) = post_webhook(create_router(h.state), body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "ignored");
}
