//! Build-time configuration gate
//!
//! Runs the validator once before an artifact is packaged. Any required
//! setting that is missing or invalid aborts the build; optional problems
//! are logged and fall back to their defaults. Every run writes a JSON
//! audit report next to the build output, overwriting the previous one.

use crate::config::registry::Profile;
use crate::config::snapshot::EnvSnapshot;
use crate::config::validation::{validate, ConfigItem, ConfigReport, ConfigStatus};
use crate::error::EnvgateError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// File name of the audit report inside the output directory
pub const AUDIT_FILE_NAME: &str = "config-report.json";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("{} required setting(s) failed validation:\n{}", .0.len(), FailureList(.0))]
    RequiredSettings(Vec<EnvgateError>),

    #[error("failed to write audit report {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize audit report: {0}")]
    Serialize(#[from] serde_json::Error),
}

struct FailureList<'a>(&'a [EnvgateError]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {}", failure)?;
        }
        Ok(())
    }
}

/// JSON document written by every gate run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport<'a> {
    pub timestamp: String,
    pub profile: Profile,
    pub status: ConfigStatus,
    pub summary: &'a str,
    pub items: &'a [ConfigItem],
}

/// Successful gate run
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub report: ConfigReport,
    pub audit_path: PathBuf,
}

/// Fail-fast validation for one profile
#[derive(Debug, Clone)]
pub struct BuildGate {
    profile: Profile,
    out_dir: PathBuf,
}

impl BuildGate {
    pub fn new(profile: Profile, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile,
            out_dir: out_dir.into(),
        }
    }

    pub fn audit_path(&self) -> PathBuf {
        self.out_dir.join(AUDIT_FILE_NAME)
    }

    /// Validate `snapshot`, write the audit report, and fail if any required setting is bad.
    ///
    /// The report is written before the failure is returned so that
    /// post-build tooling can see why the build stopped. Required-setting
    /// failures take precedence over a failed audit write.
    pub fn run(&self, snapshot: &EnvSnapshot) -> Result<GateOutcome, GateError> {
        let report = validate(self.profile.registry(), snapshot);

        for item in report.warnings() {
            warn!("{} [{}]: {}", item.name, item.status, item.message);
        }

        let failures: Vec<EnvgateError> = report.failures().filter_map(ConfigItem::error).collect();
        for failure in &failures {
            error!("{}", failure);
        }

        let audit_path = self.audit_path();
        match write_audit(&audit_path, self.profile, &report) {
            Ok(()) => info!("Wrote configuration audit to {:?}", audit_path),
            Err(e) if !failures.is_empty() => error!("{}", e),
            Err(e) => return Err(e),
        }

        if !failures.is_empty() {
            return Err(GateError::RequiredSettings(failures));
        }

        info!(
            "Configuration gate passed for {} profile ({})",
            self.profile, report.overall_status
        );
        Ok(GateOutcome { report, audit_path })
    }
}

fn write_audit(path: &Path, profile: Profile, report: &ConfigReport) -> Result<(), GateError> {
    let audit = AuditReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        profile,
        status: report.overall_status,
        summary: &report.summary,
        items: &report.items,
    };
    let json = serde_json::to_string_pretty(&audit)?;

    let io_err = |source| GateError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)
}
