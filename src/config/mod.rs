/// Configuration for envgate
///
/// This module covers:
/// - Setting registries and the validator that checks a deployment's
///   environment against them
/// - Environment snapshots, the explicit input to every pure check
/// - Fix suggestions and platform hints for failing deployments
/// - The layered loader for envgate's own settings
///
/// Settings priority for the tool itself (highest to lowest):
/// 1. CLI flags (handled in main.rs)
/// 2. Environment variables (ENVGATE_*)
/// 3. `--config` file
/// 4. Project config (envgate.toml)
/// 5. User config (~/.config/envgate/config.toml)
/// 6. Default config (built-in)
pub mod advice;
pub mod loader;
pub mod registry;
pub mod snapshot;
pub mod validation;

pub use advice::{platform_hints, suggest_fixes, Suggestion};
pub use loader::{SettingsLoader, ToolSettings};
pub use registry::{Profile, Registry, SettingDefinition};
pub use snapshot::EnvSnapshot;
pub use validation::{validate, ConfigItem, ConfigReport, ConfigStatus};
