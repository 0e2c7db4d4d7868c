/// Tool settings loader
///
/// Loads envgate's own settings from multiple sources with priority:
/// 1. CLI flags (applied by main.rs on top of the result)
/// 2. Environment variables (ENVGATE_*), read from the snapshot
/// 3. Explicit `--config` file
/// 4. Project config (./envgate.toml)
/// 5. User config (~/.config/envgate/config.toml)
/// 6. Built-in defaults
use super::registry::Profile;
use super::snapshot::EnvSnapshot;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PROJECT_CONFIG_FILE: &str = "envgate.toml";

/// Settings for the diagnostics stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSettings {
    /// Per-probe timeout
    pub timeout_ms: u64,
    pub health_path: String,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            health_path: "/health".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Directory the audit report is written to
    pub out_dir: PathBuf,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Complete tool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub profile: Profile,
    /// Public origin of the service running envgate
    pub origin: Option<String>,
    pub production: bool,
    pub diagnostics: DiagnosticsSettings,
    pub gate: GateSettings,
    pub server: ServerSettings,
}

/// Partial settings as they appear in a single TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    profile: Option<Profile>,
    origin: Option<String>,
    production: Option<bool>,
    diagnostics: Option<PartialDiagnostics>,
    gate: Option<PartialGate>,
    server: Option<PartialServer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialDiagnostics {
    timeout_ms: Option<u64>,
    health_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialGate {
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartialServer {
    port: Option<u16>,
}

impl ToolSettings {
    fn merge_file(&mut self, file: SettingsFile) {
        if let Some(profile) = file.profile {
            self.profile = profile;
        }
        if let Some(origin) = file.origin {
            self.origin = Some(origin);
        }
        if let Some(production) = file.production {
            self.production = production;
        }
        if let Some(diagnostics) = file.diagnostics {
            if let Some(timeout_ms) = diagnostics.timeout_ms {
                self.diagnostics.timeout_ms = timeout_ms;
            }
            if let Some(health_path) = diagnostics.health_path {
                self.diagnostics.health_path = health_path;
            }
        }
        if let Some(out_dir) = file.gate.and_then(|g| g.out_dir) {
            self.gate.out_dir = out_dir;
        }
        if let Some(port) = file.server.and_then(|s| s.port) {
            self.server.port = port;
        }
    }

    fn apply_env_overrides(&mut self, snapshot: &EnvSnapshot) {
        if let Some(profile) = snapshot.get("ENVGATE_PROFILE") {
            match profile.parse() {
                Ok(p) => self.profile = p,
                Err(e) => warn!("Ignoring ENVGATE_PROFILE: {}", e),
            }
        }
        if let Some(origin) = snapshot.get("ENVGATE_ORIGIN") {
            self.origin = Some(origin.to_string());
        }
        if let Some(production) = snapshot.get("ENVGATE_PRODUCTION") {
            self.production = matches!(
                production.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "production"
            );
        }
        if let Some(timeout) = snapshot.get("ENVGATE_TIMEOUT_MS") {
            match timeout.trim().parse() {
                Ok(ms) => self.diagnostics.timeout_ms = ms,
                Err(_) => warn!("Ignoring non-numeric ENVGATE_TIMEOUT_MS '{}'", timeout),
            }
        }
        if let Some(out_dir) = snapshot.get("ENVGATE_OUT_DIR") {
            self.gate.out_dir = PathBuf::from(out_dir);
        }
        if let Some(port) = snapshot.get("ENVGATE_PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring invalid ENVGATE_PORT '{}'", port),
            }
        }
    }
}

/// Layered settings loader
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    user_config: Option<PathBuf>,
    project_config: PathBuf,
    explicit: Option<PathBuf>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            user_config: default_user_config_path(),
            project_config: PathBuf::from(PROJECT_CONFIG_FILE),
            explicit: None,
        }
    }

    /// Loader that only reads the given files (no user or project lookup)
    pub fn isolated() -> Self {
        Self {
            user_config: None,
            project_config: PathBuf::new(),
            explicit: None,
        }
    }

    pub fn with_project_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_config = path.into();
        self
    }

    pub fn with_explicit_config(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Load all layers. Missing optional files are skipped; an explicit file must exist.
    pub fn load(&self, snapshot: &EnvSnapshot) -> Result<ToolSettings> {
        let mut settings = ToolSettings::default();

        for path in [self.user_config.as_deref(), Some(self.project_config.as_path())]
            .into_iter()
            .flatten()
        {
            if path.as_os_str().is_empty() || !path.is_file() {
                continue;
            }
            debug!("Loading settings from {:?}", path);
            settings.merge_file(read_settings_file(path)?);
        }

        if let Some(path) = &self.explicit {
            debug!("Loading settings from {:?}", path);
            settings.merge_file(read_settings_file(path)?);
        }

        settings.apply_env_overrides(snapshot);
        Ok(settings)
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse settings file {:?}", path))
}

/// Platform config location, e.g. ~/.config/envgate/config.toml on Linux
pub fn default_user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "envgate").map(|dirs| dirs.config_dir().join("config.toml"))
}
