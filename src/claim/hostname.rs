// src/claim/hostname.rs

//! Worker hostname to controller name.
//!
//! Workers are named by the cluster as `<pipeline>-<controller>-<suffix>`.
//! Deployment pods carry a `<hash>-<id>` suffix, stateful set and daemon set
//! pods a single segment. Both shapes are recognised by one regex; when the
//! result does not name a controller, callers retry with the names from
//! [`claim_groups`].

use std::sync::LazyLock;

use regex::Regex;

/// How many trailing `-segment`s may be trimmed off a group.
pub const MAX_TRIMS: usize = 4;

static WORKER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?P<deployment>.+)-(([0-9a-f]{0,10}-[0-9a-z]{0,5}))|(?P<container>.+)-([0-9a-zA-Z]+))$",
    )
    .expect("static regex is valid")
});

/// Group (controller name) a worker belongs to.
///
/// Strips the pipeline DNS name from `hostname`, then the replica suffix.
/// Returns `None` when no suffix can be recognised.
pub fn worker_group(hostname: &str, dns_name: &str) -> Option<String> {
    let name = strip_pipeline(hostname, dns_name);
    let caps = WORKER_NAME.captures(name)?;
    caps.name("deployment")
        .or_else(|| caps.name("container"))
        .map(|m| m.as_str().to_string())
        .filter(|g| !g.is_empty())
}

/// `hostname` without the pipeline DNS prefix and surrounding dashes.
pub fn strip_pipeline<'a>(hostname: &'a str, dns_name: &str) -> &'a str {
    hostname
        .strip_prefix(dns_name)
        .unwrap_or(hostname)
        .trim_matches('-')
}

/// `group` followed by successively shorter forms with the last
/// `-segment` removed, at most [`MAX_TRIMS`] of them.
pub fn group_candidates(group: &str) -> Vec<String> {
    let mut out = vec![group.to_string()];
    let mut current = group;
    for _ in 0..MAX_TRIMS {
        match current.rsplit_once('-') {
            Some((head, _)) if !head.is_empty() => {
                out.push(head.to_string());
                current = head;
            }
            _ => break,
        }
    }
    out
}

/// Every group a claim should scan for, in order.
///
/// The recognised group and its trimmed forms, plus the stripped hostname
/// without only its last segment. A stateful set pod like `proc-a-0` looks
/// like a deployment pod to the regex, so `proc-a` has to be tried directly.
pub fn claim_groups(hostname: &str, dns_name: &str) -> Vec<String> {
    let stripped = strip_pipeline(hostname, dns_name);
    let group = worker_group(hostname, dns_name).unwrap_or_else(|| stripped.to_string());
    let mut out = group_candidates(&group);
    if let Some((head, _)) = stripped.rsplit_once('-') {
        if !head.is_empty() && !out.iter().any(|g| g == head) {
            out.insert(1, head.to_string());
        }
    }
    out
}
