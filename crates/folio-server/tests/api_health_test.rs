mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{json_body, send, setup, start_session};
use serde_json::json;
use tower::ServiceExt; // for oneshot

#[tokio::test]
async fn root_reports_running() {
    let (app, _state, _script) = setup();

    let response = send(&app, "GET", "/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Voice Assistant API is running", "status": "healthy"})
    );
}

#[tokio::test]
async fn health_check_returns_healthy() {
    let (app, _state, _script) = setup();

    let response = send(&app, "GET", "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"status": "healthy", "service": "voice-assistant-api"})
    );
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let (app, _state, _script) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/session/start")
                .header("origin", "https://portfolio.example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _state, _script) = setup();
    let id = start_session(&app).await;

    let response = send(
        &app,
        "POST",
        &format!("/session/{}/chat", id),
        Some(json!({"message": "x".repeat(128 * 1024)})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json_body(response).await["detail"].is_string());
}
