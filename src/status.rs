//! Plain-text status display for reports and diagnostics

use crate::config::validation::{ConfigReport, ConfigStatus};
use crate::diagnostics::{ConnectionProbeResult, CorsPreflight, DiagnosticsResult};
use std::fmt;

const RULE: &str = "==================================================";

/// Order in which item groups are shown: problems first
const GROUP_ORDER: [ConfigStatus; 4] = [
    ConfigStatus::Invalid,
    ConfigStatus::Missing,
    ConfigStatus::Warning,
    ConfigStatus::Valid,
];

/// Text view of a validation report
pub struct ReportView<'a>(pub &'a ConfigReport);

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;

        writeln!(f, "{}", RULE)?;
        writeln!(f, "Environment configuration report")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Overall status: {}", report.overall_status.as_str().to_uppercase())?;
        writeln!(f, "Summary: {}", report.summary)?;

        for status in GROUP_ORDER {
            let mut items = report.items.iter().filter(|i| i.status == status).peekable();
            if items.peek().is_none() {
                continue;
            }

            writeln!(f)?;
            writeln!(f, "{}:", status.as_str().to_uppercase())?;
            for item in items {
                let mark = if item.required { "[required]" } else { "[optional]" };
                writeln!(f, "  {} {}: {}", mark, item.name, item.message)?;
            }
        }

        Ok(())
    }
}

struct ProbeLine<'a> {
    label: &'a str,
    probe: &'a ConnectionProbeResult,
}

impl fmt::Display for ProbeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let probe = self.probe;
        if probe.success {
            return write!(f, "  ok   {} {} ({} ms)", self.label, probe.target_url, probe.latency_ms);
        }

        let kind = probe
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "failed".to_string());
        write!(
            f,
            "  FAIL {} {} ({}, {} ms)",
            self.label, probe.target_url, kind, probe.latency_ms
        )
    }
}

fn write_numbered(f: &mut fmt::Formatter<'_>, title: &str, lines: &[String]) -> fmt::Result {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{}:", title)?;
    for (i, line) in lines.iter().enumerate() {
        writeln!(f, "  {}. {}", i + 1, line)?;
    }
    Ok(())
}

/// Text view of a diagnostics run
pub struct DiagnosticsView<'a>(pub &'a DiagnosticsResult);

impl fmt::Display for DiagnosticsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;

        writeln!(f, "Connection diagnostics")?;
        writeln!(
            f,
            "{}",
            ProbeLine {
                label: "configured",
                probe: &result.configured
            }
        )?;
        for candidate in &result.candidates {
            writeln!(
                f,
                "{}",
                ProbeLine {
                    label: "candidate ",
                    probe: candidate
                }
            )?;
        }

        write_numbered(f, "Recommendations", &result.recommendations)
    }
}

/// Text view of a CORS preflight next to the backend's configured origins
pub struct PreflightView<'a> {
    pub preflight: &'a CorsPreflight,
    /// `CORS_ORIGINS` entries, when known
    pub configured_origins: &'a [String],
}

impl fmt::Display for PreflightView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preflight = self.preflight;

        writeln!(
            f,
            "CORS preflight {} as {} (HTTP {})",
            preflight.url, preflight.origin, preflight.http_status
        )?;
        for (name, value) in preflight.headers() {
            match value {
                Some(v) => writeln!(f, "  ok   {}: {}", name, v)?,
                None => writeln!(f, "  --   {}: not set", name)?,
            }
        }

        if !self.configured_origins.is_empty() {
            writeln!(f)?;
            writeln!(f, "Configured CORS origins: {}", self.configured_origins.join(", "))?;
        }

        writeln!(f)?;
        if preflight.allows_origin() {
            writeln!(f, "Origin {} is allowed", preflight.origin)
        } else {
            writeln!(
                f,
                "Origin {} is NOT allowed: add it to CORS_ORIGINS on the backend",
                preflight.origin
            )
        }
    }
}

pub fn render_report(report: &ConfigReport) -> String {
    ReportView(report).to_string()
}

pub fn render_diagnostics(result: &DiagnosticsResult) -> String {
    DiagnosticsView(result).to_string()
}

pub fn render_preflight(preflight: &CorsPreflight, configured_origins: &[String]) -> String {
    PreflightView {
        preflight,
        configured_origins,
    }
    .to_string()
}
