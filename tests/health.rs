mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use checkout_backend::routes::{create_router, health::health_check};
use common::{CountingNotifier, FakeGateway, harness};
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "checkout-backend");
    assert!(response.0.meta.is_some_and(|meta| meta.total.is_none()));
}

#[tokio::test]
async fn unknown_paths_get_json_not_found() {
    let h = harness(FakeGateway::default(), CountingNotifier::default());
    let response = create_router(h.state)
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["path"], "/nope");
}
