/// Setting registries
///
/// Static definitions of every environment setting a deployment profile
/// expects: whether it is required, how it is validated, and what it falls
/// back to. Registries are read-only for the lifetime of the process.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Checks a raw setting value
pub type Validator = fn(&str) -> bool;

/// A single expected setting
#[derive(Clone, Copy)]
pub struct SettingDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub validator: Validator,
    /// Substituted into the effective value when an optional setting is absent or invalid
    pub default: Option<&'static str>,
    /// Message reported when the validator rejects a value
    pub error_message: &'static str,
    /// Values are masked whenever they leave the process (JSON, audit files)
    pub sensitive: bool,
}

impl SettingDefinition {
    pub fn is_valid(&self, value: &str) -> bool {
        (self.validator)(value)
    }
}

impl fmt::Debug for SettingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingDefinition")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("sensitive", &self.sensitive)
            .finish_non_exhaustive()
    }
}

/// Ordered set of setting definitions for one deployment profile
#[derive(Debug)]
pub struct Registry {
    pub profile: Profile,
    definitions: &'static [SettingDefinition],
    peer_url_setting: Option<&'static str>,
}

impl Registry {
    /// Definitions in registry order (this is also report order)
    pub fn definitions(&self) -> &'static [SettingDefinition] {
        self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&'static SettingDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// The setting that names the peer service's base URL, if this profile has one
    pub fn peer_url_setting(&self) -> Option<&'static str> {
        self.peer_url_setting
    }

    pub fn required(&self) -> impl Iterator<Item = &'static SettingDefinition> {
        self.definitions.iter().filter(|d| d.required)
    }

    pub fn optional(&self) -> impl Iterator<Item = &'static SettingDefinition> {
        self.definitions.iter().filter(|d| !d.required)
    }
}

/// Which side of the deployment is being validated
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Backend,
    Frontend,
}

impl Profile {
    pub fn registry(self) -> &'static Registry {
        match self {
            Profile::Backend => &BACKEND,
            Profile::Frontend => &FRONTEND,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Backend => "backend",
            Profile::Frontend => "frontend",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backend" | "api" | "server" => Ok(Profile::Backend),
            "frontend" | "web" | "client" => Ok(Profile::Frontend),
            other => anyhow::bail!(
                "Unknown profile '{}'. Supported profiles: backend, frontend",
                other
            ),
        }
    }
}

/// Frontend setting holding the backend base URL
pub const PEER_URL_SETTING: &str = "VITE_API_URL";

/// Fallback peer address when nothing else applies outside production
pub const DEVELOPMENT_DEFAULT_URL: &str = "http://localhost:8000";

static BACKEND: Registry = Registry {
    profile: Profile::Backend,
    definitions: &[
        SettingDefinition {
            name: "SECRET_KEY",
            description: "JWT signing key",
            required: true,
            validator: is_strong_secret,
            default: None,
            error_message: "SECRET_KEY must be at least 32 characters",
            sensitive: true,
        },
        SettingDefinition {
            name: "CORS_ORIGINS",
            description: "Origins allowed by CORS",
            required: true,
            validator: is_cors_origin_list,
            default: None,
            error_message: "CORS_ORIGINS must be a comma separated list of origins or '*'",
            sensitive: false,
        },
        SettingDefinition {
            name: "DATABASE_URL",
            description: "Database connection URL",
            required: false,
            validator: is_database_url,
            default: Some("sqlite:///./recipes.db"),
            error_message: "DATABASE_URL must start with sqlite://, postgresql:// or mysql://",
            sensitive: true,
        },
        SettingDefinition {
            name: "RAILWAY_STATIC_URL",
            description: "Public URL assigned by the platform",
            required: false,
            validator: is_https_url,
            default: None,
            error_message: "RAILWAY_STATIC_URL must be an HTTPS URL",
            sensitive: false,
        },
    ],
    peer_url_setting: None,
};

static FRONTEND: Registry = Registry {
    profile: Profile::Frontend,
    definitions: &[
        SettingDefinition {
            name: PEER_URL_SETTING,
            description: "Backend API base URL",
            required: true,
            validator: is_http_url,
            default: None,
            error_message: "VITE_API_URL must be an absolute http:// or https:// URL",
            sensitive: false,
        },
        SettingDefinition {
            name: "VITE_HEALTH_PATH",
            description: "Backend health check path",
            required: false,
            validator: is_absolute_path,
            default: Some("/health"),
            error_message: "VITE_HEALTH_PATH must start with '/'",
            sensitive: false,
        },
        SettingDefinition {
            name: "VITE_PROBE_TIMEOUT_MS",
            description: "Connection test timeout in milliseconds",
            required: false,
            validator: is_probe_timeout,
            default: Some("5000"),
            error_message: "VITE_PROBE_TIMEOUT_MS must be an integer between 100 and 60000",
            sensitive: false,
        },
    ],
    peer_url_setting: Some(PEER_URL_SETTING),
};

static CORS_ORIGIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[a-zA-Z0-9.-]+(?::\d+)?$").unwrap());

/// Absolute URL with an http(s) scheme and a non-empty host
pub fn is_http_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

pub fn is_https_url(value: &str) -> bool {
    value.starts_with("https://") && is_http_url(value)
}

pub fn is_strong_secret(value: &str) -> bool {
    value.chars().count() >= 32
}

pub fn is_cors_origin_list(value: &str) -> bool {
    let origins: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    !origins.is_empty()
        && origins
            .iter()
            .all(|o| *o == "*" || CORS_ORIGIN_PATTERN.is_match(o))
}

pub fn is_database_url(value: &str) -> bool {
    ["sqlite://", "postgresql://", "mysql://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

fn is_absolute_path(value: &str) -> bool {
    value.starts_with('/')
}

fn is_probe_timeout(value: &str) -> bool {
    value
        .trim()
        .parse::<u64>()
        .is_ok_and(|ms| (100..=60_000).contains(&ms))
}

/// Split a CORS origin list into its entries
pub fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
