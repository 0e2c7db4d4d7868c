//! Environment snapshots
//!
//! Validation and resolution never read the process environment themselves.
//! Callers capture a snapshot once and pass it in.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable view of environment variables at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_process_env() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Read a dotenv-style file without touching the process environment
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to open env file {:?}", path))?;

        let mut vars = BTreeMap::new();
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("Failed to parse env file {:?}", path))?;
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Return a new snapshot where `other`'s entries take precedence
    pub fn overlay(&self, other: &EnvSnapshot) -> Self {
        let mut vars = self.vars.clone();
        vars.extend(other.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { vars }
    }

    /// Look up a variable. An empty string is a present value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
