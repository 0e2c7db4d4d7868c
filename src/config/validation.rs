/// Configuration validation
///
/// Classifies every setting of a registry against an environment snapshot
/// and produces a report. Nothing here performs I/O or reads ambient state:
/// the same snapshot always yields the same report.
use super::registry::{Registry, SettingDefinition};
use super::snapshot::EnvSnapshot;
use crate::error::EnvgateError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Replacement shown for sensitive values
pub const MASK: &str = "********";

/// Status of a single setting or of a whole report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStatus {
    Valid,
    Warning,
    Invalid,
    Missing,
}

impl ConfigStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigStatus::Valid => "valid",
            ConfigStatus::Warning => "warning",
            ConfigStatus::Invalid => "invalid",
            ConfigStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    pub name: String,
    /// Observed value, or the default when an optional setting is absent
    pub value: Option<String>,
    /// Value downstream code may rely on. Never an invalid value.
    pub effective_value: Option<String>,
    pub status: ConfigStatus,
    pub message: String,
    pub required: bool,
    pub sensitive: bool,
}

impl ConfigItem {
    /// Whether this item makes the whole report invalid
    pub fn is_fatal(&self) -> bool {
        self.required && matches!(self.status, ConfigStatus::Missing | ConfigStatus::Invalid)
    }

    /// The value as it may be shown outside the process
    pub fn display_value(&self) -> Option<&str> {
        match &self.value {
            Some(_) if self.sensitive => Some(MASK),
            Some(v) => Some(v.as_str()),
            None => None,
        }
    }

    /// Map a failing item onto the error taxonomy
    pub fn error(&self) -> Option<EnvgateError> {
        match self.status {
            ConfigStatus::Valid | ConfigStatus::Warning => None,
            ConfigStatus::Missing => Some(EnvgateError::MissingRequiredSetting {
                name: self.name.clone(),
                description: self.message.clone(),
            }),
            ConfigStatus::Invalid => Some(EnvgateError::InvalidSettingFormat {
                name: self.name.clone(),
                message: self.message.clone(),
            }),
        }
    }
}

impl Serialize for ConfigItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let effective = match &self.effective_value {
            Some(_) if self.sensitive => Some(MASK),
            Some(v) => Some(v.as_str()),
            None => None,
        };

        let mut state = serializer.serialize_struct("ConfigItem", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value", &self.display_value())?;
        state.serialize_field("effective_value", &effective)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("required", &self.required)?;
        state.end()
    }
}

/// Result of validating a whole registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
    pub items: Vec<ConfigItem>,
    pub overall_status: ConfigStatus,
    pub summary: String,
}

impl ConfigReport {
    pub fn item(&self, name: &str) -> Option<&ConfigItem> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Value downstream code should use for `name`
    pub fn effective_value(&self, name: &str) -> Option<&str> {
        self.item(name).and_then(|i| i.effective_value.as_deref())
    }

    /// Required items that are missing or invalid
    pub fn failures(&self) -> impl Iterator<Item = &ConfigItem> {
        self.items.iter().filter(|i| i.is_fatal())
    }

    /// Optional items that are not valid
    pub fn warnings(&self) -> impl Iterator<Item = &ConfigItem> {
        self.items
            .iter()
            .filter(|i| !i.required && i.status != ConfigStatus::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        self.overall_status == ConfigStatus::Invalid
    }

    /// Remediation steps, one per item that is not valid
    pub fn recommendations(&self) -> Vec<String> {
        let mut recommendations: Vec<String> = self
            .items
            .iter()
            .filter_map(|item| match (item.status, item.required) {
                (ConfigStatus::Missing, _) => {
                    Some(format!("Set the required environment variable {}", item.name))
                }
                (ConfigStatus::Invalid, _) => {
                    Some(format!("Fix the format of environment variable {}", item.name))
                }
                (ConfigStatus::Warning, false) => Some(format!(
                    "Consider setting the optional environment variable {}",
                    item.name
                )),
                (ConfigStatus::Warning, true) | (ConfigStatus::Valid, _) => None,
            })
            .collect();

        if recommendations.is_empty() {
            recommendations.push("Configuration looks good".to_string());
        }

        recommendations
    }
}

/// Validate every setting of `registry` against `snapshot`, in registry order
pub fn validate(registry: &Registry, snapshot: &EnvSnapshot) -> ConfigReport {
    let items: Vec<ConfigItem> = registry
        .definitions()
        .iter()
        .map(|definition| classify(definition, snapshot.get(definition.name)))
        .collect();

    let overall_status = overall_status(&items);
    let summary = match overall_status {
        ConfigStatus::Invalid => {
            "Configuration check failed: required settings are missing or invalid"
        }
        ConfigStatus::Warning => "Configuration is usable but has warnings",
        ConfigStatus::Valid | ConfigStatus::Missing => "All settings are valid",
    }
    .to_string();

    ConfigReport {
        items,
        overall_status,
        summary,
    }
}

fn classify(definition: &SettingDefinition, raw: Option<&str>) -> ConfigItem {
    let default = definition.default.map(str::to_string);

    let (value, effective_value, status, message) = match (definition.required, raw) {
        (true, None) => (
            None,
            None,
            ConfigStatus::Missing,
            format!("Missing required setting: {}", definition.description),
        ),
        (true, Some(v)) if !definition.is_valid(v) => (
            Some(v.to_string()),
            None,
            ConfigStatus::Invalid,
            definition.error_message.to_string(),
        ),
        (true, Some(v)) => (
            Some(v.to_string()),
            Some(v.to_string()),
            ConfigStatus::Valid,
            format!("{} is configured", definition.description),
        ),
        (false, None) => {
            let message = match definition.default {
                Some(d) => format!("Not set, using default: {}", d),
                None => format!("Optional setting not set: {}", definition.description),
            };
            (default.clone(), default, ConfigStatus::Warning, message)
        }
        (false, Some(v)) if !definition.is_valid(v) => {
            let message = match definition.default {
                Some(d) => format!("{} (falling back to default: {})", definition.error_message, d),
                None => definition.error_message.to_string(),
            };
            (Some(v.to_string()), default, ConfigStatus::Invalid, message)
        }
        (false, Some(v)) => (
            Some(v.to_string()),
            Some(v.to_string()),
            ConfigStatus::Valid,
            format!("{} is configured", definition.description),
        ),
    };

    ConfigItem {
        name: definition.name.to_string(),
        value,
        effective_value,
        status,
        message,
        required: definition.required,
        sensitive: definition.sensitive,
    }
}

fn overall_status(items: &[ConfigItem]) -> ConfigStatus {
    if items.iter().any(ConfigItem::is_fatal) {
        ConfigStatus::Invalid
    } else if items
        .iter()
        .any(|i| !i.required && i.status != ConfigStatus::Valid)
    {
        ConfigStatus::Warning
    } else {
        ConfigStatus::Valid
    }
}
