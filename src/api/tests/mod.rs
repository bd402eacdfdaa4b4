use super::*;
use crate::test_helpers::{FakeConnector, Script, create_test_service};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

mod schedule;

/// Router over a service backed by `fake`; keep the tempdir alive
fn test_app(fake: &FakeConnector) -> (Router, Arc<BackupService>, tempfile::TempDir) {
    let (service, temp_dir) = create_test_service(fake);
    let service = Arc::new(service);
    let config = service.config.clone();
    (create_router(service.clone(), config), service, temp_dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn api_server_spawns() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (service, _temp_dir) = create_test_service(&fake);
    let service = Arc::new(service);

    let mut config = (*service.config).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let service = service.clone();
        let config = config.clone();
        async move { start_api_server(service, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");
    api_handle.abort();
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (app, _service, _temp_dir) = test_app(&fake);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_absent_when_disabled() {
    let fake = FakeConnector::new(Script::Config("x".into()));
    let (service, _temp_dir) = create_test_service(&fake);
    let mut config = (*service.config).clone();
    config.api.cors_enabled = false;
    let app = create_router(Arc::new(service), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn specific_cors_origins_build() {
    let _layer = build_cors_layer(&["http://ops.example".to_string()]);
}
