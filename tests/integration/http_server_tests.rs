/// Health server routes, exercised without binding a port
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use envgate::config::{EnvSnapshot, Profile};
use envgate::http_server::{create_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef-secret";

fn backend_state(pairs: &[(&str, &str)]) -> Arc<AppState> {
    Arc::new(AppState {
        snapshot: EnvSnapshot::from_pairs(pairs.iter().copied()),
        profile: Profile::Backend,
        origin: String::new(),
        production: false,
    })
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_unhealthy_without_required_settings() {
    let (status, body) = get_json(backend_state(&[]), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["configuration"]["status"], "invalid");
    assert_eq!(body["api_base_url"], "http://localhost:8000");
    assert_eq!(body["cors_origins"], serde_json::json!([]));
}

#[tokio::test]
async fn test_health_healthy_with_required_settings() {
    let state = backend_state(&[
        ("SECRET_KEY", SECRET),
        ("CORS_ORIGINS", "https://frontend.example.app"),
        ("RAILWAY_STATIC_URL", "https://backend.example.app"),
    ]);
    let (_, body) = get_json(state, "/health").await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["configuration"]["status"], "warning");
    assert_eq!(body["api_base_url"], "https://backend.example.app");
    assert_eq!(body["cors_origins"][0], "https://frontend.example.app");
}

#[tokio::test]
async fn test_health_for_frontend_resolves_backend() {
    let state = Arc::new(AppState {
        snapshot: EnvSnapshot::new(),
        profile: Profile::Frontend,
        origin: "https://frontend-shop.example.app".to_string(),
        production: true,
    });
    let (_, body) = get_json(state, "/health").await;

    assert_eq!(body["api_base_url"], "https://backend-shop.example.app");
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_config_status_masks_secrets() {
    let state = backend_state(&[("SECRET_KEY", SECRET), ("CORS_ORIGINS", "*")]);
    let (_, body) = get_json(state, "/config/status").await;

    assert_eq!(body["items"][0]["name"], "SECRET_KEY");
    assert_eq!(body["items"][0]["value"], "********");
    assert!(!body.to_string().contains(SECRET));
}

#[tokio::test]
async fn test_config_validate_recommendations() {
    let (_, body) = get_json(backend_state(&[("CORS_ORIGINS", "*")]), "/config/validate").await;

    assert_eq!(body["valid"], false);
    assert_eq!(
        body["recommendations"][0],
        "Set the required environment variable SECRET_KEY"
    );
    assert_eq!(body["report"]["overall_status"], "invalid");
}

#[tokio::test]
async fn test_cors_layer_allows_configured_origin() {
    let state = backend_state(&[
        ("SECRET_KEY", SECRET),
        ("CORS_ORIGINS", "https://frontend.example.app"),
    ]);
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://frontend.example.app")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://frontend.example.app"
    );
}
