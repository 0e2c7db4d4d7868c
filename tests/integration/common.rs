//! Local stand-ins for backend services

use async_trait::async_trait;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use envgate::diagnostics::{ConnectionProbeResult, HttpProber, Prober};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// How a fake backend answers `GET /health`
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Healthy,
    AllowOrigin(&'static str),
    Status(u16),
    Delay(Duration),
    /// 200 with an HTML page, like a proxy in front of a dead service
    Html,
    /// Real CORS handling (preflights included) for one allowed origin
    Cors(&'static str),
}

async fn respond(behavior: Behavior) -> Response {
    let body = Json(json!({ "status": "healthy" }));
    match behavior {
        Behavior::Healthy => body.into_response(),
        Behavior::AllowOrigin(origin) => ([(ACCESS_CONTROL_ALLOW_ORIGIN, origin)], body).into_response(),
        Behavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({ "status": "unhealthy" })),
        )
            .into_response(),
        Behavior::Delay(delay) => {
            tokio::time::sleep(delay).await;
            body.into_response()
        }
        Behavior::Html => Html("<html><body>Application failed to respond</body></html>").into_response(),
        Behavior::Cors(_) => body.into_response(),
    }
}

/// Start a backend on an ephemeral port and return its base URL
pub async fn spawn_backend(behavior: Behavior) -> String {
    let mut app = Router::new().route("/health", get(move || respond(behavior)));
    if let Behavior::Cors(origin) = behavior {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(HeaderValue::from_static(origin))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([CONTENT_TYPE]),
        );
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// A base URL on which nothing listens
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Real HTTP prober that routes public hostnames to local servers.
///
/// Results keep the public URL so recommendations can be checked as-is.
pub struct RoutingProber {
    inner: HttpProber,
    routes: HashMap<String, String>,
    fallback: String,
}

impl RoutingProber {
    pub fn new(routes: &[(&str, String)]) -> Self {
        Self {
            inner: HttpProber::new("/health", None).unwrap(),
            routes: routes
                .iter()
                .map(|(public, local)| (public.to_string(), local.clone()))
                .collect(),
            fallback: closed_port_url(),
        }
    }
}

#[async_trait]
impl Prober for RoutingProber {
    async fn probe(&self, base_url: &str, timeout: Duration) -> ConnectionProbeResult {
        let local = self.routes.get(base_url).unwrap_or(&self.fallback);
        let mut result = self.inner.probe(local, timeout).await;
        result.target_url = base_url.to_string();
        result
    }
}
