//! Error taxonomy shared by validation, diagnostics and the build gate.

use thiserror::Error;

/// Every way a deployment can be misconfigured or unreachable.
///
/// The validator and the prober never return these directly: failures are
/// reported as values (`ConfigItem`, `ConnectionProbeResult`) and can be
/// lifted into this enum with their `error()` accessors when a caller wants
/// to fail hard, as the build gate does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvgateError {
    #[error("missing required setting {name}: {description}")]
    MissingRequiredSetting { name: String, description: String },

    #[error("invalid format for {name}: {message}")]
    InvalidSettingFormat { name: String, message: String },

    #[error("endpoint {url} is unreachable: {reason}")]
    UnreachableEndpoint { url: String, reason: String },

    #[error("request to {url} was blocked by CORS (origin {origin} not allowed)")]
    CrossOriginBlocked { url: String, origin: String },

    #[error("endpoint {url} answered with unexpected HTTP status {status}")]
    UnexpectedHttpStatus { url: String, status: u16 },
}

impl EnvgateError {
    /// Name of the setting this error is about, if it is a configuration error
    pub fn setting(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredSetting { name, .. } | Self::InvalidSettingFormat { name, .. } => {
                Some(name)
            }
            Self::UnreachableEndpoint { .. }
            | Self::CrossOriginBlocked { .. }
            | Self::UnexpectedHttpStatus { .. } => None,
        }
    }
}
