//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each admin endpoint against a
//! cache populated through the library.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tagcache::{api::create_router, AppState, CachePolicy, Config};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_state() -> AppState {
    AppState::from_config(&Config::default())
}

fn app(state: &AppState) -> Router {
    create_router(state.clone())
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn invalidate(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/invalidate")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn populate(state: &AppState) {
    let users = CachePolicy::new("users", Duration::from_secs(60)).tag("people");
    let orders = CachePolicy::new("orders", Duration::from_secs(60));
    for id in 1..=3u32 {
        state
            .cache
            .get_or_compute("get", &users, id, |id| async move { id * 2 })
            .await;
    }
    state
        .cache
        .get_or_compute("list", &orders, (), |_| async { vec![1, 2, 3] })
        .await;
}

// == Invalidate Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_by_prefix() {
    let state = create_test_state();
    populate(&state).await;

    let response = app(&state)
        .oneshot(invalidate(r#"{"prefix":"users:"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["target"], "prefix");
    assert_eq!(json["removed"], 3);
    assert_eq!(state.backend.len().await, 1);
}

#[tokio::test]
async fn test_invalidate_by_prefix_twice_is_noop() {
    let state = create_test_state();
    populate(&state).await;

    app(&state)
        .oneshot(invalidate(r#"{"prefix":"users:"}"#))
        .await
        .unwrap();
    let response = app(&state)
        .oneshot(invalidate(r#"{"prefix":"users:"}"#))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 0);
}

#[tokio::test]
async fn test_invalidate_by_tag() {
    let state = create_test_state();
    populate(&state).await;

    let response = app(&state)
        .oneshot(invalidate(r#"{"tag":"people"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 3);
    assert_eq!(state.backend.len().await, 1, "untagged entry survives");
}

#[tokio::test]
async fn test_invalidate_by_key() {
    let state = create_test_state();
    populate(&state).await;

    let key = state
        .cache
        .key_for("list", "orders", &tagcache::CallArgs::new())
        .unwrap();
    let body = format!(r#"{{"key":"{}"}}"#, key);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 1);
    assert_eq!(state.backend.len().await, 3);
}

#[tokio::test]
async fn test_invalidate_requires_exactly_one_target() {
    let state = create_test_state();

    let response = app(&state)
        .oneshot(invalidate(r#"{"prefix":"users:","tag":"people"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Exactly one"));
}

#[tokio::test]
async fn test_invalidate_rejects_empty_prefix() {
    let state = create_test_state();
    populate(&state).await;

    let response = app(&state)
        .oneshot(invalidate(r#"{"prefix":""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.backend.len().await, 4);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let state = create_test_state();

    let response = app(&state)
        .oneshot(invalidate("{not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let state = create_test_state();
    populate(&state).await;
    populate(&state).await;

    let response = app(&state)
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 4);
    assert_eq!(json["misses"], 4);
    assert_eq!(json["stores"], 4);
    assert_eq!(json["total_entries"], 4);
    assert_eq!(json["tags"], 1);
    assert_eq!(json["hit_rate"], 0.5);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();

    let response = app(&state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
