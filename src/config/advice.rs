/// Remediation advice beyond the validation report
///
/// `suggest_fixes` proposes concrete values for the settings that most
/// often block a first deployment, and `platform_hints` adds deployment
/// platform notes when the platform's marker variable is present.
use super::registry::Registry;
use super::snapshot::EnvSnapshot;
use anyhow::{Context, Result};
use base64::Engine;
use serde::Serialize;
use std::fmt;

/// CORS origins suggested for local development
pub const SUGGESTED_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Set by the hosting platform in every deployed service
pub const PLATFORM_ENV_MARKER: &str = "RAILWAY_ENVIRONMENT";

/// Random bytes behind a generated secret (43 URL-safe characters)
const SECRET_BYTES: usize = 32;

/// One proposed fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    /// Set `name` to `value`
    Set { name: String, value: String },
    /// Something only the operator can fix
    Note { message: String },
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suggestion::Set { name, value } => write!(f, "Set {}={}", name, value),
            Suggestion::Note { message } => f.write_str(message),
        }
    }
}

/// Generate a URL-safe secret suitable for `SECRET_KEY`
pub fn generate_secret_key() -> Result<String> {
    let mut bytes = [0u8; SECRET_BYTES];
    getrandom::getrandom(&mut bytes).context("Failed to read system randomness")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Propose values for settings of `registry` that are missing or invalid.
///
/// Only settings with a safe, generic fix are covered; everything else is
/// left to the report's recommendations.
pub fn suggest_fixes(registry: &Registry, snapshot: &EnvSnapshot) -> Result<Vec<Suggestion>> {
    let mut suggestions = Vec::new();

    let needs_fix = |name: &str| {
        registry
            .get(name)
            .is_some_and(|definition| !snapshot.get(name).is_some_and(|v| definition.is_valid(v)))
    };

    if needs_fix("SECRET_KEY") {
        suggestions.push(Suggestion::Set {
            name: "SECRET_KEY".to_string(),
            value: generate_secret_key()?,
        });
    }

    if needs_fix("CORS_ORIGINS") {
        suggestions.push(Suggestion::Set {
            name: "CORS_ORIGINS".to_string(),
            value: SUGGESTED_CORS_ORIGINS.to_string(),
        });
    }

    if snapshot.contains(PLATFORM_ENV_MARKER)
        && registry.get("RAILWAY_STATIC_URL").is_some()
        && !snapshot.contains("RAILWAY_STATIC_URL")
    {
        suggestions.push(Suggestion::Note {
            message: "Platform environment detected but RAILWAY_STATIC_URL is not set: \
                      add it in the project settings"
                .to_string(),
        });
    }

    Ok(suggestions)
}

/// Deployment notes shown when running on the hosting platform
pub fn platform_hints(snapshot: &EnvSnapshot) -> Vec<&'static str> {
    if !snapshot.contains(PLATFORM_ENV_MARKER) {
        return Vec::new();
    }

    vec![
        "Configure environment variables in the platform's project settings",
        "Make sure the frontend and backend services both have the correct URLs",
        "Check that the service domains are configured correctly",
    ]
}
