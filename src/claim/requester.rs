// src/claim/requester.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::SluiceError;

/// Identity a worker polls with: `container:version:hostname`.
///
/// `container` is the name part of the container tag the worker runs, so
/// `container:version` is the tag queue entries are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterKey {
    pub container: String,
    pub version: String,
    pub hostname: String,
}

impl RequesterKey {
    pub fn tag(&self) -> String {
        format!("{}:{}", self.container, self.version)
    }
}

impl FromStr for RequesterKey {
    type Err = SluiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(container), Some(version), Some(hostname))
                if !container.is_empty() && !version.is_empty() && !hostname.is_empty() =>
            {
                Ok(RequesterKey {
                    container: container.to_string(),
                    version: version.to_string(),
                    hostname: hostname.to_string(),
                })
            }
            _ => Err(SluiceError::MalformedKey(s.to_string())),
        }
    }
}

impl fmt::Display for RequesterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.container, self.version, self.hostname)
    }
}
