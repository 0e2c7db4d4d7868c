//! envgate: configuration validation and peer discovery for split deployments
//!
//! A frontend artifact and a backend service are deployed independently and
//! have to find each other. This crate:
//! - validates each side's environment against a static registry
//! - resolves the backend address from settings or hostname conventions,
//!   without touching the network
//! - probes the resolved address and nearby candidates concurrently and
//!   suggests fixes
//! - gates builds on required settings and leaves a JSON audit behind

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gate;
#[cfg(feature = "native")]
pub mod http_server;
pub mod resolver;
pub mod status;

pub use config::{validate, ConfigItem, ConfigReport, ConfigStatus, EnvSnapshot, Profile};
pub use diagnostics::{discover_candidates, ConnectionProbeResult, DiagnosticsResult, ProbeErrorKind};
pub use error::EnvgateError;
pub use gate::{BuildGate, GateError};
pub use resolver::{resolve_endpoint, EndpointResolver, Resolution};
