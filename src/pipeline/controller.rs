// src/pipeline/controller.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::naming::sanitize;

/// Kind of cluster object a controller is deployed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Deployment,
    StatefulSet,
    DaemonSet,
}

/// Lifecycle of a controller as observed by the cluster reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerState {
    #[default]
    Creating,
    Ready,
    Terminating,
    Terminated,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControllerState::Creating => "Creating",
            ControllerState::Ready => "Ready",
            ControllerState::Terminating => "Terminating",
            ControllerState::Terminated => "Terminated",
        };
        f.write_str(s)
    }
}

/// A deployable grouping of commands sharing a scaling and lifecycle policy.
///
/// `state` and `last_count` are written by the reconciler and only read by
/// status reporting; dispatch never looks at them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    pub id: String,
    pub name: String,
    pub source_type: SourceType,
    pub scale: i32,
    /// IDs of the commands embedded in this controller.
    pub children: Vec<String>,
    pub environment: Vec<String>,
    pub state: ControllerState,
    pub last_count: usize,
}

/// Controller fields as they appear on a `container.Kubernetes` cell.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct RawController {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sourcetype: Option<SourceType>,
    #[serde(default)]
    pub scale: Option<i32>,
    #[serde(default)]
    pub embeds: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
}

impl Controller {
    pub(crate) fn from_raw(raw: RawController) -> Option<Self> {
        let id = raw.id.filter(|id| !id.is_empty())?;
        Some(Controller {
            id,
            name: sanitize(&raw.name, "-"),
            source_type: raw.sourcetype.unwrap_or_default(),
            scale: raw.scale.unwrap_or(1),
            children: raw.embeds,
            environment: raw.environment,
            state: ControllerState::default(),
            last_count: 0,
        })
    }
}
