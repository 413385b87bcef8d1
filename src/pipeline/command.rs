// src/pipeline/command.rs

use serde::{Deserialize, Serialize};

use crate::config::DockerSection;
use crate::pipeline::naming::sanitize;

/// Default execution limit, in minutes, for commands that do not run forever.
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 15;

/// Timeout value meaning "never stop this command".
pub const RUN_FOREVER: i64 = -1;

/// A single executable step in the pipeline and the unit of dispatched work.
///
/// Commands are handed to workers as part of a claimed queue item, so the
/// struct serializes to the same field names the document uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub id: String,
    /// ID of the owning controller, empty when the command is unmanaged.
    pub parent: String,
    pub name: String,
    pub command: String,
    pub args: String,
    pub version: String,
    #[serde(rename = "element")]
    pub language: String,
    pub script: bool,
    /// Base64 encoded inline script.
    #[serde(rename = "scriptcontent")]
    pub script_content: String,
    pub custom: bool,
    #[serde(rename = "existing")]
    pub use_existing: bool,
    #[serde(rename = "autostart")]
    pub auto_start: bool,
    pub scale: i32,
    /// Execution limit in seconds, or [`RUN_FOREVER`].
    pub timeout: i64,
    #[serde(rename = "exposeport")]
    pub expose_port: i32,
    #[serde(rename = "isudp")]
    pub is_udp: bool,
    pub cpu: String,
    pub memory: String,
    pub environment: Vec<String>,
    /// Image the command is built from.
    pub image: String,
    /// Registry reference the built image is pushed as.
    pub tag: String,
    /// Container tag used as this command's key in file status records and
    /// queue entries (`name-suffix:version`).
    #[serde(rename = "statustag")]
    pub status_tag: String,
}

/// Command fields as they appear on a `container.Container` cell.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct RawCommand {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub element: String,
    #[serde(default)]
    pub script: bool,
    #[serde(default)]
    pub scriptcontent: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub existing: bool,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub exposeport: Option<i32>,
    #[serde(default)]
    pub isudp: bool,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub environment: Vec<String>,
}

impl Command {
    /// Build a command from its raw cell form.
    ///
    /// Returns `None` when the cell carries no ID.
    pub(crate) fn from_raw(raw: RawCommand, docker: &DockerSection) -> Option<Self> {
        let id = raw.id.filter(|id| !id.is_empty())?;

        let mut command = Command {
            id,
            parent: raw.parent.unwrap_or_default(),
            name: sanitize(&raw.name, "-"),
            command: raw.command,
            args: raw.arguments,
            version: raw.version,
            language: raw.element,
            script: raw.script,
            script_content: raw.scriptcontent,
            custom: raw.custom,
            use_existing: raw.existing,
            auto_start: raw.autostart,
            scale: raw.scale.unwrap_or(1),
            timeout: timeout_seconds(raw.timeout),
            expose_port: raw.exposeport.unwrap_or(-1),
            is_udp: raw.isudp,
            cpu: raw.cpu.unwrap_or_else(|| "500m".to_string()),
            memory: raw.memory.unwrap_or_else(|| "256Mi".to_string()),
            environment: raw.environment,
            image: String::new(),
            tag: String::new(),
            status_tag: String::new(),
        };
        command.assign_images(docker);
        Some(command)
    }

    /// Container reference for this command.
    ///
    /// Prefabricated (non-custom) commands are named after themselves. Custom
    /// commands map their language onto a base image. With `as_tag`, the
    /// form used for images built and pushed by us is returned.
    pub fn container(&self, as_tag: bool, tag_suffix: &str) -> String {
        if !self.custom {
            return if as_tag {
                format!("{}{}:{}", self.name, tag_suffix, self.version)
            } else {
                format!("{}:{}", self.name, self.version)
            };
        }

        let base = match self.language.as_str() {
            "r" => "r-base".to_string(),
            "javascript" => "node".to_string(),
            "jupyter" if as_tag => "datascience-notebook".to_string(),
            "jupyter" => "jupyter/datascience-notebook".to_string(),
            "dockerfile" => self.name.clone(),
            other => other.to_string(),
        };

        if as_tag {
            format!("{base}{tag_suffix}:{}", self.version)
        } else {
            format!("{base}:{}", self.version)
        }
    }

    /// Whether the command has no execution limit.
    pub fn runs_forever(&self) -> bool {
        self.timeout == RUN_FOREVER
    }

    fn assign_images(&mut self, docker: &DockerSection) {
        let source = self.container(false, &docker.tag_suffix);
        self.image = if self.custom {
            source
        } else {
            join_reference(&docker.upstream, &source)
        };

        self.status_tag = self.container(true, &docker.tag_suffix);
        let pushed = join_reference(&docker.primary, &self.status_tag);
        self.tag = join_reference(&docker.registry, &pushed);
    }
}

/// Convert a cell timeout in minutes into seconds.
///
/// Absent or zero means the default; `-1` means forever.
fn timeout_seconds(minutes: Option<i64>) -> i64 {
    match minutes {
        None | Some(0) => DEFAULT_TIMEOUT_MINUTES * 60,
        Some(RUN_FOREVER) => RUN_FOREVER,
        Some(m) => m * 60,
    }
}

fn join_reference(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), rest)
    }
}
