// src/traverse/matcher.rs

use std::fmt;

use regex::Regex;
use tracing::error;

/// Compiled filename pattern of a watched link.
#[derive(Clone)]
pub struct Matcher {
    source: String,
    regex: Option<Regex>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.source).finish()
    }
}

impl Matcher {
    /// Compile `pattern`. An empty pattern matches every name; an invalid
    /// one is logged and also matches every name.
    pub fn compile(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Self::any();
        }
        match Regex::new(pattern) {
            Ok(regex) => Self {
                source: pattern.to_string(),
                regex: Some(regex),
            },
            Err(err) => {
                error!(%pattern, error = %err, "invalid watch pattern; matching every file");
                Self::any()
            }
        }
    }

    pub fn any() -> Self {
        Self {
            source: String::new(),
            regex: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.as_ref().is_none_or(|r| r.is_match(name))
    }

    /// Name to record `name` under in a file key.
    ///
    /// With capture groups, the longest non-empty group replaces the name.
    pub fn key_name<'a>(&self, name: &'a str) -> &'a str {
        let Some(regex) = &self.regex else {
            return name;
        };
        let Some(caps) = regex.captures(name) else {
            return name;
        };
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .max_by_key(|s| s.len())
            .unwrap_or(name)
    }
}
