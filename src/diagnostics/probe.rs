//! Health probes
//!
//! A probe issues exactly one bounded request to `{base}{health_path}` and
//! turns whatever happens into a [`ConnectionProbeResult`]. Probes never
//! return errors. A healthy backend answers 2xx with a JSON body.

use super::{ConnectionProbeResult, CorsPreflight, ProbeErrorKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, ACCEPT, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
};
use reqwest::{Method, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;

/// Method announced by [`HttpProber::preflight`]
pub const PREFLIGHT_METHOD: &str = "POST";
/// Request headers announced by [`HttpProber::preflight`]
pub const PREFLIGHT_HEADERS: &str = "Content-Type";

/// Network capability used by diagnostics
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe the service at `base_url`, giving up after `timeout`
    async fn probe(&self, base_url: &str, timeout: Duration) -> ConnectionProbeResult;
}

/// reqwest-backed prober for `GET <base>/health`
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    health_path: String,
    /// Sent as the `Origin` header; enables the CORS check when set
    origin: Option<String>,
}

impl HttpProber {
    pub fn new(health_path: &str, origin: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("envgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let health_path = if health_path.starts_with('/') {
            health_path.to_string()
        } else {
            format!("/{}", health_path)
        };

        Ok(Self {
            client,
            health_path,
            origin,
        })
    }

    pub fn health_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.health_path)
    }

    fn classify_response(
        &self,
        base_url: &str,
        latency_ms: u64,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ConnectionProbeResult {
        let cors_observed = self.origin.as_deref().map(|origin| {
            headers
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|allowed| allowed == "*" || allowed == origin)
        });

        let mut result = if !status.is_success() {
            ConnectionProbeResult::failed(
                base_url,
                latency_ms,
                ProbeErrorKind::HttpError,
                format!("health check returned HTTP {}", status.as_u16()),
            )
        } else if serde_json::from_slice::<serde_json::Value>(body).is_err() {
            // e.g. an HTML error page served by a proxy
            ConnectionProbeResult::failed(
                base_url,
                latency_ms,
                ProbeErrorKind::HttpError,
                format!("health check returned HTTP {} without a JSON body", status.as_u16()),
            )
        } else if cors_observed == Some(false) {
            ConnectionProbeResult::failed(
                base_url,
                latency_ms,
                ProbeErrorKind::Cors,
                format!(
                    "response does not allow origin {}",
                    self.origin.as_deref().unwrap_or_default()
                ),
            )
        } else {
            ConnectionProbeResult::succeeded(base_url, latency_ms)
        };

        result.http_status = Some(status.as_u16());
        result.cors_observed = cors_observed;
        result
    }

    /// Send a CORS preflight (`OPTIONS`) to `url` the way a browser at
    /// `origin` would, and collect the `Access-Control-Allow-*` answer.
    pub async fn preflight(&self, url: &str, origin: &str, timeout: Duration) -> Result<CorsPreflight> {
        let target = url::Url::parse(url).with_context(|| format!("Invalid URL '{}'", url))?;

        debug!("Sending CORS preflight to {} as {}", target, origin);
        let response = self
            .client
            .request(Method::OPTIONS, target)
            .timeout(timeout)
            .header(ORIGIN, origin)
            .header(ACCESS_CONTROL_REQUEST_METHOD, PREFLIGHT_METHOD)
            .header(ACCESS_CONTROL_REQUEST_HEADERS, PREFLIGHT_HEADERS)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(CorsPreflight {
            url: url.to_string(),
            origin: origin.to_string(),
            http_status: response.status().as_u16(),
            allow_origin: header(ACCESS_CONTROL_ALLOW_ORIGIN),
            allow_methods: header(ACCESS_CONTROL_ALLOW_METHODS),
            allow_headers: header(ACCESS_CONTROL_ALLOW_HEADERS),
            allow_credentials: header(ACCESS_CONTROL_ALLOW_CREDENTIALS),
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, base_url: &str, timeout: Duration) -> ConnectionProbeResult {
        let started = Instant::now();
        let target = self.health_url(base_url);

        if let Err(e) = url::Url::parse(&target) {
            return ConnectionProbeResult::failed(
                base_url,
                elapsed_ms(started),
                ProbeErrorKind::Unknown,
                format!("invalid URL: {}", e),
            );
        }

        let mut request = self
            .client
            .get(&target)
            .timeout(timeout)
            .header(ACCEPT, "application/json");
        if let Some(origin) = &self.origin {
            request = request.header(ORIGIN, origin);
        }

        debug!("Probing {}", target);
        // the body counts against the same deadline as the headers
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };
        let outcome = tokio::time::timeout(timeout, exchange).await;
        let latency_ms = elapsed_ms(started);

        match outcome {
            Err(_) => ConnectionProbeResult::failed(
                base_url,
                latency_ms,
                ProbeErrorKind::Timeout,
                format!("no response within {} ms", timeout.as_millis()),
            ),
            Ok(Err(e)) => {
                ConnectionProbeResult::failed(base_url, latency_ms, classify_error(&e), e.to_string())
            }
            Ok(Ok((status, headers, body))) => {
                self.classify_response(base_url, latency_ms, status, &headers, &body)
            }
        }
    }
}

fn classify_error(error: &reqwest::Error) -> ProbeErrorKind {
    if error.is_timeout() {
        ProbeErrorKind::Timeout
    } else if error.is_connect() {
        ProbeErrorKind::Refused
    } else {
        ProbeErrorKind::Unknown
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
