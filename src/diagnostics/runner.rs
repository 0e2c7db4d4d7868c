//! Concurrent diagnostics runs

use super::candidates::discover_candidates_with;
use super::probe::{elapsed_ms, Prober};
use super::{recommend, ConnectionProbeResult, DiagnosticsResult, ProbeErrorKind};
use crate::config::loader::DiagnosticsSettings;
use crate::config::validation::{ConfigReport, ConfigStatus};
use crate::config::EnvSnapshot;
use crate::resolver::EndpointResolver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Per-probe settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub timeout: Duration,
    pub health_path: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self::from_settings(&DiagnosticsSettings::default())
    }
}

impl ProbeOptions {
    pub fn from_settings(settings: &DiagnosticsSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            health_path: settings.health_path.clone(),
        }
    }

    /// Prefer values explicitly set (and valid) in a frontend report,
    /// falling back to the tool settings.
    pub fn from_report(report: &ConfigReport, settings: &DiagnosticsSettings) -> Self {
        let explicit = |name: &str| {
            report
                .item(name)
                .filter(|item| item.status == ConfigStatus::Valid)
                .and_then(|item| item.effective_value.clone())
        };

        let timeout_ms = explicit("VITE_PROBE_TIMEOUT_MS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(settings.timeout_ms);
        let health_path = explicit("VITE_HEALTH_PATH").unwrap_or_else(|| settings.health_path.clone());

        Self {
            timeout: Duration::from_millis(timeout_ms),
            health_path,
        }
    }
}

/// Runs one diagnostics pass for a fixed context
pub struct DiagnosticsRunner {
    prober: Arc<dyn Prober>,
    resolver: EndpointResolver,
    snapshot: EnvSnapshot,
    current_origin: String,
    is_production: bool,
    timeout: Duration,
}

impl DiagnosticsRunner {
    pub fn new(
        prober: Arc<dyn Prober>,
        snapshot: EnvSnapshot,
        current_origin: impl Into<String>,
        is_production: bool,
    ) -> Self {
        Self {
            prober,
            resolver: EndpointResolver::default(),
            snapshot,
            current_origin: current_origin.into(),
            is_production,
            timeout: ProbeOptions::default().timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_resolver(mut self, resolver: EndpointResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// URL the frontend is currently configured (or resolved) to use
    pub fn configured_url(&self) -> String {
        self.resolver
            .resolve(&self.snapshot, &self.current_origin, self.is_production)
            .url
    }

    /// Candidates to probe besides the configured URL, in generation order
    pub fn candidate_urls(&self) -> Vec<String> {
        let configured = self.configured_url();
        discover_candidates_with(
            &self.current_origin,
            &self.resolver.local_role,
            &self.resolver.peer_role,
        )
        .into_iter()
        .filter(|url| url != &configured)
        .collect()
    }

    /// Probe the configured URL and every candidate concurrently.
    ///
    /// Every probe is awaited; a failed, slow or panicking probe never
    /// cancels or hides its siblings. Exactly one attempt per URL.
    pub async fn run(&self) -> DiagnosticsResult {
        let configured_url = self.configured_url();
        let candidate_urls = self.candidate_urls();

        info!(
            "Running diagnostics: configured={}, {} candidate(s), timeout={}ms",
            configured_url,
            candidate_urls.len(),
            self.timeout.as_millis()
        );

        let configured_task = self.spawn_probe(configured_url.clone());
        let candidate_tasks: Vec<(String, JoinHandle<ConnectionProbeResult>)> = candidate_urls
            .into_iter()
            .map(|url| {
                let task = self.spawn_probe(url.clone());
                (url, task)
            })
            .collect();

        let configured = settle(&configured_url, configured_task).await;
        let mut candidates = Vec::with_capacity(candidate_tasks.len());
        for (url, task) in candidate_tasks {
            candidates.push(settle(&url, task).await);
        }

        let recommendations = recommend(&configured, &candidates, &self.resolver.peer_url_setting);

        if configured.success {
            info!("Configured backend {} is reachable", configured.target_url);
        } else {
            warn!(
                "Configured backend {} failed: {}",
                configured.target_url,
                configured.error.as_deref().unwrap_or("unknown error")
            );
        }

        DiagnosticsResult {
            configured,
            candidates,
            recommendations,
        }
    }

    fn spawn_probe(&self, url: String) -> JoinHandle<ConnectionProbeResult> {
        let prober = Arc::clone(&self.prober);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let started = Instant::now();
            match tokio::time::timeout(timeout, prober.probe(&url, timeout)).await {
                Ok(result) => result,
                Err(_) => ConnectionProbeResult::failed(
                    &url,
                    elapsed_ms(started),
                    ProbeErrorKind::Timeout,
                    format!("no response within {} ms", timeout.as_millis()),
                ),
            }
        })
    }
}

async fn settle(url: &str, task: JoinHandle<ConnectionProbeResult>) -> ConnectionProbeResult {
    match task.await {
        Ok(result) => result,
        Err(e) => {
            warn!("Probe task for {} did not complete: {}", url, e);
            ConnectionProbeResult::failed(url, 0, ProbeErrorKind::Unknown, format!("probe task failed: {}", e))
        }
    }
}
