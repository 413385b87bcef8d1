// src/pipeline/naming.rs

//! Name normalisation shared by pipelines, commands and controllers.

use std::sync::LazyLock;

use regex::Regex;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]+").expect("static regex is valid"));

/// Lowercase `input` and collapse every run of non-alphanumeric characters
/// into `sep`, trimming `sep` from both ends.
///
/// `sanitize("Example Pipeline!", "-") == "example-pipeline"`
pub fn sanitize(input: &str, sep: &str) -> String {
    let replaced = NON_ALPHANUMERIC.replace_all(input, sep).to_lowercase();
    if sep.is_empty() {
        return replaced;
    }
    replaced
        .trim_start_matches(sep)
        .trim_end_matches(sep)
        .to_string()
}

/// DNS-safe form of a pipeline name.
pub fn dns_name(name: &str) -> String {
    sanitize(name, "-")
}

/// Name of the per-pipeline namespace bucket (and on-disk folder).
pub fn bucket_name(name: &str) -> String {
    sanitize(name, "_")
}
