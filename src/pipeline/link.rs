// src/pipeline/link.rs

//! Edges between commands.
//!
//! A link is either a file dependency ([`PathLink`]) or a network dependency
//! ([`PortLink`]). The declared type picks the variant once, at construction;
//! consumers match on [`LinkKind`] instead of inspecting type strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared transport of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    File,
    Tcp,
    Udp,
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "file" => Ok(LinkType::File),
            "tcp" => Ok(LinkType::Tcp),
            "udp" => Ok(LinkType::Udp),
            other => Err(format!(
                "invalid link type: {other} (expected \"file\", \"tcp\" or \"udp\")"
            )),
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkType::File => "file",
            LinkType::Tcp => "tcp",
            LinkType::Udp => "udp",
        };
        f.write_str(s)
    }
}

/// File-drop dependency: the target consumes files the source writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLink {
    /// Directory the files land in. Empty means "named after the source".
    pub path: String,
    /// Regex applied to file basenames.
    pub pattern: String,
    /// Only watched links are monitored for file events.
    pub watch: bool,
}

/// Network dependency between two commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLink {
    pub source_port: i32,
    pub dest_port: i32,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    Path(PathLink),
    Port(PortLink),
}

/// A directed edge between two commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: String,
    pub source: String,
    pub target: String,
    link_type: LinkType,
    kind: LinkKind,
}

impl Link {
    pub fn path(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        path: PathLink,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            link_type: LinkType::File,
            kind: LinkKind::Path(path),
        }
    }

    /// Build a network link. `link_type` must be `Tcp` or `Udp`; a `File`
    /// type is rejected.
    pub fn port(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        link_type: LinkType,
        port: PortLink,
    ) -> Option<Self> {
        if link_type == LinkType::File {
            return None;
        }
        Some(Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            link_type,
            kind: LinkKind::Port(port),
        })
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn kind(&self) -> &LinkKind {
        &self.kind
    }

    pub fn as_path(&self) -> Option<&PathLink> {
        match &self.kind {
            LinkKind::Path(p) => Some(p),
            LinkKind::Port(_) => None,
        }
    }

    pub fn as_port(&self) -> Option<&PortLink> {
        match &self.kind {
            LinkKind::Port(p) => Some(p),
            LinkKind::Path(_) => None,
        }
    }

    /// Whether this link is a file link monitored for events.
    pub fn is_watched(&self) -> bool {
        match &self.kind {
            LinkKind::Path(p) => p.watch,
            LinkKind::Port(_) => false,
        }
    }

    /// Build a link from the pieces of a `link` cell.
    ///
    /// Returns `Err` with a reason when the cell cannot describe a link.
    pub(crate) fn from_cell(
        id: Option<&str>,
        source: Option<&str>,
        target: Option<&str>,
        attributes: &Map<String, Value>,
    ) -> Result<Self, String> {
        let id = non_empty(id).ok_or("link has no id")?;
        let source = non_empty(source).ok_or_else(|| format!("link {id} has no source"))?;
        let target = non_empty(target).ok_or_else(|| format!("link {id} has no target"))?;

        let link_type = match attributes.get("type") {
            None | Some(Value::Null) => LinkType::File,
            Some(Value::String(s)) => s.parse::<LinkType>()?,
            Some(other) => return Err(format!("link {id} has non-string type {other}")),
        };

        match link_type {
            LinkType::File => Ok(Link::path(
                id,
                source,
                target,
                PathLink {
                    path: str_attr(attributes, "path"),
                    pattern: str_attr(attributes, "pattern"),
                    watch: attributes
                        .get("watch")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                },
            )),
            LinkType::Tcp | LinkType::Udp => Link::port(
                id,
                source,
                target,
                link_type,
                PortLink {
                    source_port: int_attr(attributes, "source"),
                    dest_port: int_attr(attributes, "dest"),
                    address: str_attr(attributes, "address"),
                },
            )
            .ok_or_else(|| format!("link {id} is not a network link")),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn str_attr(attributes: &Map<String, Value>, key: &str) -> String {
    attributes
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int_attr(attributes: &Map<String, Value>, key: &str) -> i32 {
    attributes
        .get(key)
        .and_then(Value::as_f64)
        .map(|n| n as i32)
        .unwrap_or(0)
}
