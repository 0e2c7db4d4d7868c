//! Peer endpoint resolution
//!
//! Works out where the backend lives from the frontend's point of view,
//! using only the environment snapshot, the current origin and the
//! production flag. Resolution never touches the network: a resolved URL
//! may be wrong, and only the diagnostics stage can find that out.

use crate::config::registry::{is_http_url, DEVELOPMENT_DEFAULT_URL, PEER_URL_SETTING};
use crate::config::snapshot::EnvSnapshot;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Hostname substitution rules, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionRule {
    /// `frontend-app.example.app` -> `backend-app.example.app`
    Hyphen,
    /// `frontend.app.example.app` -> `backend.app.example.app`
    Dot,
    /// `myfrontend.example.app` -> `mybackend.example.app`
    Bare,
}

impl SubstitutionRule {
    pub const ORDER: [SubstitutionRule; 3] = [
        SubstitutionRule::Hyphen,
        SubstitutionRule::Dot,
        SubstitutionRule::Bare,
    ];

    fn pattern(self, token: &str) -> String {
        match self {
            SubstitutionRule::Hyphen => format!("{}-", token),
            SubstitutionRule::Dot => format!("{}.", token),
            SubstitutionRule::Bare => token.to_string(),
        }
    }

    /// Rewrite the first occurrence of the rule's pattern in `host`
    pub fn apply(self, host: &str, from: &str, to: &str) -> Option<String> {
        let pattern = self.pattern(from);
        if from.is_empty() || !host.contains(&pattern) {
            return None;
        }
        Some(host.replacen(&pattern, &self.pattern(to), 1))
    }
}

/// Where a resolved URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rule", rename_all = "snake_case")]
pub enum ResolutionSource {
    Configured,
    Convention(SubstitutionRule),
    SameOrigin,
    DevelopmentDefault,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Configured => write!(f, "configured setting"),
            ResolutionSource::Convention(rule) => write!(f, "platform convention ({:?} rule)", rule),
            ResolutionSource::SameOrigin => write!(f, "same origin"),
            ResolutionSource::DevelopmentDefault => write!(f, "development default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub url: String,
    pub source: ResolutionSource,
}

/// Scheme, host and port of an http(s) origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse an origin. Anything without an http(s) scheme and a host is rejected.
    pub fn parse(origin: &str) -> Option<Self> {
        let parsed = url::Url::parse(origin.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str().filter(|h| !h.is_empty())?.to_string();
        Some(Self {
            scheme: parsed.scheme().to_string(),
            host,
            port: parsed.port(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Same scheme and port, different host
    pub fn with_host(&self, host: &str) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, host, port),
            None => format!("{}://{}", self.scheme, host),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.with_host(&self.host))
    }
}

/// Apply every substitution rule that matches, in rule order.
///
/// Rules that do not match the host are skipped, so the result may be empty.
pub fn convention_candidates(origin: &Origin, from: &str, to: &str) -> Vec<(SubstitutionRule, String)> {
    let from = from.to_lowercase();
    let to = to.to_lowercase();
    SubstitutionRule::ORDER
        .iter()
        .filter_map(|rule| {
            rule.apply(origin.host(), &from, &to)
                .map(|host| (*rule, origin.with_host(&host)))
        })
        .collect()
}

/// Resolver for the peer service's base URL
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    pub peer_url_setting: String,
    /// Role token found in the current service's hostname
    pub local_role: String,
    /// Role token of the peer service
    pub peer_role: String,
    pub development_default: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            peer_url_setting: PEER_URL_SETTING.to_string(),
            local_role: "frontend".to_string(),
            peer_role: "backend".to_string(),
            development_default: DEVELOPMENT_DEFAULT_URL.to_string(),
        }
    }
}

impl EndpointResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, local: impl Into<String>, peer: impl Into<String>) -> Self {
        self.local_role = local.into();
        self.peer_role = peer.into();
        self
    }

    /// Resolve the peer URL. The first applicable step wins:
    /// explicit setting, platform convention, same origin, development default.
    pub fn resolve(&self, snapshot: &EnvSnapshot, current_origin: &str, is_production: bool) -> Resolution {
        if let Some(configured) = snapshot.get(&self.peer_url_setting) {
            if is_http_url(configured) {
                return Resolution {
                    url: configured.to_string(),
                    source: ResolutionSource::Configured,
                };
            }
            debug!(
                "Ignoring malformed {} value, falling back to discovery",
                self.peer_url_setting
            );
        }

        if !is_production {
            return self.development_default();
        }

        let Some(origin) = Origin::parse(current_origin) else {
            warn!(
                "Current origin '{}' is not an http(s) URL, using development default",
                current_origin
            );
            return self.development_default();
        };

        if origin.host().contains(&self.local_role.to_lowercase()) {
            if let Some((rule, url)) =
                convention_candidates(&origin, &self.local_role, &self.peer_role)
                    .into_iter()
                    .next()
            {
                return Resolution {
                    url,
                    source: ResolutionSource::Convention(rule),
                };
            }
        }

        Resolution {
            url: current_origin.trim().trim_end_matches('/').to_string(),
            source: ResolutionSource::SameOrigin,
        }
    }

    fn development_default(&self) -> Resolution {
        Resolution {
            url: self.development_default.clone(),
            source: ResolutionSource::DevelopmentDefault,
        }
    }
}

/// Resolve the backend URL with the default roles and setting name
pub fn resolve_endpoint(snapshot: &EnvSnapshot, current_origin: &str, is_production: bool) -> String {
    EndpointResolver::default()
        .resolve(snapshot, current_origin, is_production)
        .url
}
