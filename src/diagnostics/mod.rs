//! Connection diagnostics
//!
//! The only network-touching stage. It probes the resolved backend URL and
//! every candidate derived from the current origin, concurrently, waits for
//! all of them, and turns the outcome into recommendations.

pub mod candidates;
#[cfg(feature = "native")]
pub mod probe;
#[cfg(feature = "native")]
pub mod runner;

pub use candidates::discover_candidates;
#[cfg(feature = "native")]
pub use probe::{HttpProber, Prober};
#[cfg(feature = "native")]
pub use runner::{DiagnosticsRunner, ProbeOptions};

use crate::error::EnvgateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a probe failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeErrorKind {
    Timeout,
    Refused,
    Cors,
    HttpError,
    Unknown,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProbeErrorKind::Timeout => "timed out",
            ProbeErrorKind::Refused => "connection refused",
            ProbeErrorKind::Cors => "blocked by CORS",
            ProbeErrorKind::HttpError => "unexpected HTTP status",
            ProbeErrorKind::Unknown => "unknown error",
        };
        f.write_str(text)
    }
}

/// Outcome of a single health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProbeResult {
    pub target_url: String,
    pub success: bool,
    pub latency_ms: u64,
    pub http_status: Option<u16>,
    /// Whether the response allowed the probing origin; `None` when no origin was sent
    pub cors_observed: Option<bool>,
    pub error_kind: Option<ProbeErrorKind>,
    pub error: Option<String>,
}

impl ConnectionProbeResult {
    pub fn succeeded(target_url: &str, latency_ms: u64) -> Self {
        Self {
            target_url: target_url.to_string(),
            success: true,
            latency_ms,
            http_status: None,
            cors_observed: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(target_url: &str, latency_ms: u64, kind: ProbeErrorKind, error: impl Into<String>) -> Self {
        Self {
            target_url: target_url.to_string(),
            success: false,
            latency_ms,
            http_status: None,
            cors_observed: None,
            error_kind: Some(kind),
            error: Some(error.into()),
        }
    }

    /// Map a failed probe onto the error taxonomy
    pub fn to_error(&self, origin: &str) -> Option<EnvgateError> {
        let reason = self.error.clone().unwrap_or_default();
        match self.error_kind? {
            ProbeErrorKind::Timeout | ProbeErrorKind::Refused | ProbeErrorKind::Unknown => {
                Some(EnvgateError::UnreachableEndpoint {
                    url: self.target_url.clone(),
                    reason,
                })
            }
            ProbeErrorKind::Cors => Some(EnvgateError::CrossOriginBlocked {
                url: self.target_url.clone(),
                origin: origin.to_string(),
            }),
            ProbeErrorKind::HttpError => Some(EnvgateError::UnexpectedHttpStatus {
                url: self.target_url.clone(),
                status: self.http_status.unwrap_or_default(),
            }),
        }
    }
}

/// Aggregated outcome of one diagnostics run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsResult {
    pub configured: ConnectionProbeResult,
    /// Candidate probes in generation order
    pub candidates: Vec<ConnectionProbeResult>,
    pub recommendations: Vec<String>,
}

impl DiagnosticsResult {
    /// First successful candidate in generation order
    pub fn working_candidate(&self) -> Option<&ConnectionProbeResult> {
        self.candidates.iter().find(|c| c.success)
    }

    pub fn all_probes(&self) -> impl Iterator<Item = &ConnectionProbeResult> {
        std::iter::once(&self.configured).chain(self.candidates.iter())
    }
}

/// Answer to a CORS preflight request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPreflight {
    pub url: String,
    /// Origin the preflight was sent as
    pub origin: String,
    pub http_status: u16,
    pub allow_origin: Option<String>,
    pub allow_methods: Option<String>,
    pub allow_headers: Option<String>,
    pub allow_credentials: Option<String>,
}

impl CorsPreflight {
    /// Whether a browser at `origin` may call the URL
    pub fn allows_origin(&self) -> bool {
        self.allow_origin
            .as_deref()
            .is_some_and(|allowed| allowed == "*" || allowed == self.origin)
    }

    /// Header names with their values, in the order they are reported
    pub fn headers(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("Access-Control-Allow-Origin", self.allow_origin.as_deref()),
            ("Access-Control-Allow-Methods", self.allow_methods.as_deref()),
            ("Access-Control-Allow-Headers", self.allow_headers.as_deref()),
            ("Access-Control-Allow-Credentials", self.allow_credentials.as_deref()),
        ]
    }
}

pub const CORS_RECOMMENDATION: &str =
    "A request was blocked by CORS: review CORS_ORIGINS on the backend so it includes the frontend origin";

/// Derive remediation steps from settled probes.
///
/// Nothing is recommended when the configured endpoint answered. Otherwise
/// the first working candidate (by generation order, not latency) comes
/// first, then a CORS review if any probe was blocked, then a reachability
/// hint when no candidate worked either.
pub fn recommend(
    configured: &ConnectionProbeResult,
    candidates: &[ConnectionProbeResult],
    peer_url_setting: &str,
) -> Vec<String> {
    if configured.success {
        return Vec::new();
    }

    let mut recommendations = Vec::new();
    let working = candidates.iter().find(|c| c.success);

    if let Some(candidate) = working {
        recommendations.push(format!(
            "Backend reachable at {}: set {}={}",
            candidate.target_url, peer_url_setting, candidate.target_url
        ));
    }

    let cors_blocked = std::iter::once(configured)
        .chain(candidates.iter())
        .any(|p| p.error_kind == Some(ProbeErrorKind::Cors));
    if cors_blocked {
        recommendations.push(CORS_RECOMMENDATION.to_string());
    }

    if working.is_none() {
        let hint = match configured.error_kind {
            Some(ProbeErrorKind::Timeout) => Some(format!(
                "{} did not answer in time: check that the backend service is deployed and running",
                configured.target_url
            )),
            Some(ProbeErrorKind::Refused) => Some(format!(
                "{} refused the connection: check the backend address and that the service is running",
                configured.target_url
            )),
            Some(ProbeErrorKind::HttpError) => Some(format!(
                "{} answered HTTP {}: check the backend logs",
                configured.target_url,
                configured
                    .http_status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "error".to_string())
            )),
            Some(ProbeErrorKind::Unknown) => Some(format!(
                "{} could not be probed: check that {} is a valid URL",
                configured.target_url, peer_url_setting
            )),
            Some(ProbeErrorKind::Cors) | None => None,
        };
        recommendations.extend(hint);
    }

    recommendations
}
