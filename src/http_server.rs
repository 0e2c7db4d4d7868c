//! Health-check HTTP server
//!
//! Serves the configuration report to health checks and status pages:
//! - `GET /health`: liveness plus configuration summary
//! - `GET /config/status`: full report (sensitive values masked)
//! - `GET /config/validate`: report with remediation steps

use crate::config::registry::{split_origins, DEVELOPMENT_DEFAULT_URL};
use crate::config::{validate, ConfigReport, EnvSnapshot, Profile};
use crate::resolver::resolve_endpoint;
use anyhow::{Context, Result};
use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Read-only state captured at startup
#[derive(Debug, Clone)]
pub struct AppState {
    pub snapshot: EnvSnapshot,
    pub profile: Profile,
    pub origin: String,
    pub production: bool,
}

impl AppState {
    pub fn report(&self) -> ConfigReport {
        validate(self.profile.registry(), &self.snapshot)
    }

    /// Base URL clients should use to reach the API
    pub fn api_base_url(&self, report: &ConfigReport) -> String {
        match self.profile {
            Profile::Backend => report
                .effective_value("RAILWAY_STATIC_URL")
                .unwrap_or(DEVELOPMENT_DEFAULT_URL)
                .to_string(),
            Profile::Frontend => resolve_endpoint(&self.snapshot, &self.origin, self.production),
        }
    }

    pub fn cors_origins(&self, report: &ConfigReport) -> Vec<String> {
        report
            .effective_value("CORS_ORIGINS")
            .map(split_origins)
            .unwrap_or_default()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_origins(&state.report()));

    Router::new()
        .route("/health", get(health_handler))
        .route("/config/status", get(config_status_handler))
        .route("/config/validate", get(config_validate_handler))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Skipping CORS origin that is not a valid header value: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(values))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.report();
    let healthy = !report.is_invalid();

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "configuration": {
            "status": report.overall_status,
            "summary": report.summary,
        },
        "api_base_url": state.api_base_url(&report),
        "cors_origins": state.cors_origins(&report),
    }))
}

async fn config_status_handler(State(state): State<Arc<AppState>>) -> Json<ConfigReport> {
    Json(state.report())
}

async fn config_validate_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.report();
    let recommendations = report.recommendations();

    Json(json!({
        "valid": !report.is_invalid(),
        "report": report,
        "recommendations": recommendations,
    }))
}

/// Health server bound to a port
pub struct HealthServer {
    state: Arc<AppState>,
    port: u16,
}

impl HealthServer {
    pub fn new(state: AppState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind health server to {}", addr))?;

        info!("Health server listening on http://{}", addr);
        axum::serve(listener, create_router(self.state))
            .await
            .context("Health server failed")
    }
}
