//! Candidate backend URLs derived from the current origin

use crate::resolver::{convention_candidates, Origin};
use std::collections::HashSet;
use std::net::IpAddr;

/// Leading-label replacements tried after the role substitutions
pub const LABEL_TOKENS: [&str; 2] = ["backend", "api"];

/// Generate alternate backend URLs for `current_origin` with the default roles.
///
/// Order: the resolver's substitution rules (hyphen, dot, bare), then the
/// leading host label replaced by each of [`LABEL_TOKENS`]. Duplicates and
/// the origin itself are dropped; generation order is kept.
pub fn discover_candidates(current_origin: &str) -> Vec<String> {
    discover_candidates_with(current_origin, "frontend", "backend")
}

pub fn discover_candidates_with(current_origin: &str, local_role: &str, peer_role: &str) -> Vec<String> {
    let Some(origin) = Origin::parse(current_origin) else {
        return Vec::new();
    };

    let mut generated: Vec<String> = convention_candidates(&origin, local_role, peer_role)
        .into_iter()
        .map(|(_, url)| url)
        .collect();

    if let Some(rest) = replaceable_tail(origin.host()) {
        for token in LABEL_TOKENS {
            generated.push(origin.with_host(&format!("{}.{}", token, rest)));
        }
    }

    let normalized_origin = origin.to_string();
    let raw_origin = current_origin.trim().trim_end_matches('/');
    let mut seen = HashSet::new();

    generated
        .into_iter()
        .filter(|url| url != &normalized_origin && url != raw_origin)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Everything after the first label, if the host has one worth replacing
fn replaceable_tail(host: &str) -> Option<&str> {
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }
    host.split_once('.')
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
}
