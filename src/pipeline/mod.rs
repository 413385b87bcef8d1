// src/pipeline/mod.rs

//! In-memory pipeline graph.
//!
//! A [`Pipeline`] is rebuilt from its serialized document on every load and
//! is read-only afterwards, apart from controller state written back by the
//! cluster reconciler. Graph queries live in [`crate::traverse`].

pub mod command;
pub mod controller;
pub mod document;
pub mod link;
pub mod naming;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, SluiceError};

pub use command::Command;
pub use controller::{Controller, ControllerState, SourceType};
pub use document::{
    Cell, DirectoryDocuments, DocumentSource, NamespaceDocuments, PipelineDocument,
};
pub use link::{Link, LinkKind, LinkType, PathLink, PortLink};

use command::RawCommand;
use controller::RawController;
use document::{COMMAND_CELL, CONTROLLER_CELL, LINK_CELL};

/// Aggregate root of the graph model.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Name as given by the user.
    pub name: String,
    pub dns_name: String,
    pub fqdn: String,
    /// Namespace prefix for all persisted state of this pipeline.
    pub bucket_name: String,
    pub commands: BTreeMap<String, Command>,
    pub controllers: BTreeMap<String, Controller>,
    pub links: BTreeMap<String, Link>,
    pub environment: Vec<String>,
}

impl Pipeline {
    /// An empty pipeline with derived names filled in.
    pub fn empty(name: &str, cluster_dns: &str) -> Self {
        let dns_name = naming::dns_name(name);
        let fqdn = if cluster_dns.is_empty() {
            dns_name.clone()
        } else {
            format!("{dns_name}.{cluster_dns}")
        };
        Self {
            name: name.to_string(),
            bucket_name: naming::bucket_name(name),
            dns_name,
            fqdn,
            commands: BTreeMap::new(),
            controllers: BTreeMap::new(),
            links: BTreeMap::new(),
            environment: Vec::new(),
        }
    }

    /// Fetch the named document from `source` and build the pipeline.
    pub fn load(source: &dyn DocumentSource, name: &str, cfg: &ConfigFile) -> Result<Self> {
        let bytes = source
            .fetch(name)?
            .ok_or_else(|| SluiceError::PipelineNotFound(name.to_string()))?;
        let document = PipelineDocument::from_slice(&bytes)?;
        Self::from_document(name, &document, cfg)
    }

    /// Parse a JSON document string and build the pipeline.
    pub fn from_json(name: &str, json: &str, cfg: &ConfigFile) -> Result<Self> {
        let document = PipelineDocument::from_slice(json.as_bytes())?;
        Self::from_document(name, &document, cfg)
    }

    /// Build a pipeline from a parsed document.
    ///
    /// Cells of unknown type, or cells that do not deserialize, are skipped.
    /// Structural problems (duplicate IDs, commands naming a controller that
    /// does not exist) fail the whole load.
    pub fn from_document(name: &str, document: &PipelineDocument, cfg: &ConfigFile) -> Result<Self> {
        let mut pipeline = Pipeline::empty(name, &cfg.cluster.dns_name);
        pipeline.environment = document.environment.clone();
        let mut seen: HashSet<String> = HashSet::new();

        for value in &document.cells {
            let cell: Cell = match serde_json::from_value(value.clone()) {
                Ok(cell) => cell,
                Err(err) => {
                    debug!(pipeline = %name, error = %err, "dropping malformed cell");
                    continue;
                }
            };

            match cell.kind.as_str() {
                COMMAND_CELL => {
                    let raw: RawCommand = match serde_json::from_value(cell.field_object()) {
                        Ok(raw) => raw,
                        Err(err) => {
                            warn!(pipeline = %name, cell = ?cell.id, error = %err, "dropping malformed command cell");
                            continue;
                        }
                    };
                    let Some(command) = Command::from_raw(raw, &cfg.docker) else {
                        warn!(pipeline = %name, "command cell without id; not registered");
                        continue;
                    };
                    register_id(&mut seen, &command.id)?;
                    pipeline.commands.insert(command.id.clone(), command);
                }
                CONTROLLER_CELL => {
                    let raw: RawController = match serde_json::from_value(cell.field_object()) {
                        Ok(raw) => raw,
                        Err(err) => {
                            warn!(pipeline = %name, cell = ?cell.id, error = %err, "dropping malformed controller cell");
                            continue;
                        }
                    };
                    let Some(controller) = Controller::from_raw(raw) else {
                        warn!(pipeline = %name, "controller cell without id; not registered");
                        continue;
                    };
                    register_id(&mut seen, &controller.id)?;
                    pipeline.controllers.insert(controller.id.clone(), controller);
                }
                LINK_CELL => {
                    match Link::from_cell(
                        cell.id.as_deref(),
                        cell.source_id(),
                        cell.target_id(),
                        &cell.attributes,
                    ) {
                        Ok(link) => {
                            register_id(&mut seen, &link.id)?;
                            pipeline.links.insert(link.id.clone(), link);
                        }
                        Err(reason) => {
                            warn!(pipeline = %name, %reason, "link not registered");
                        }
                    }
                }
                other => {
                    debug!(pipeline = %name, kind = %other, "ignoring cell of unhandled type");
                }
            }
        }

        pipeline.adopt_embedded_children();
        pipeline.check_references()?;
        if let Some(command) = crate::traverse::topology::find_cycle(&pipeline) {
            warn!(pipeline = %name, %command, "file links form a cycle");
        }
        Ok(pipeline)
    }

    /// Commands listed in a controller's `embeds` but carrying no parent of
    /// their own belong to that controller.
    fn adopt_embedded_children(&mut self) {
        for controller in self.controllers.values() {
            for child in &controller.children {
                if let Some(command) = self.commands.get_mut(child) {
                    if command.parent.is_empty() {
                        command.parent = controller.id.clone();
                    }
                }
            }
        }
    }

    fn check_references(&self) -> Result<()> {
        for command in self.commands.values() {
            if !command.parent.is_empty() && !self.controllers.contains_key(&command.parent) {
                return Err(SluiceError::UnknownController {
                    command: command.id.clone(),
                    controller: command.parent.clone(),
                });
            }
        }

        for link in self.links.values() {
            if !self.commands.contains_key(&link.source) || !self.commands.contains_key(&link.target)
            {
                warn!(
                    pipeline = %self.name,
                    link = %link.id,
                    source = %link.source,
                    target = %link.target,
                    "link is disconnected; it will be skipped during traversal"
                );
            }
        }
        Ok(())
    }

    pub fn get_command(&self, id: &str) -> Option<&Command> {
        self.commands.get(id)
    }

    pub fn get_link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn get_controller(&self, id: &str) -> Option<&Controller> {
        self.controllers.get(id)
    }

    /// The controller owning `command`, if any.
    pub fn controller_of(&self, command: &Command) -> Option<&Controller> {
        self.controllers.get(&command.parent)
    }

    /// Commands owned by `controller`.
    pub fn children(&self, controller: &Controller) -> Vec<&Command> {
        self.commands
            .values()
            .filter(|c| c.parent == controller.id)
            .collect()
    }

    /// Controller whose name ends a cluster service name.
    pub fn controller_for_service(&self, service_name: &str) -> Option<&Controller> {
        self.controllers
            .values()
            .find(|c| !c.name.is_empty() && service_name.ends_with(&c.name))
    }

    /// Command called `image` inside the controller named by `group`.
    pub fn command_for_container(&self, group: &str, image: &str) -> Option<&Command> {
        let controller = self.controller_for_service(group)?;
        self.children(controller)
            .into_iter()
            .find(|c| c.name == image)
    }

    /// Environment a command runs with: pipeline entries first, then its
    /// controller's, then its own, so later entries override earlier ones.
    pub fn command_environment(&self, command: &Command) -> Vec<String> {
        let mut env = self.environment.clone();
        if let Some(controller) = self.controller_of(command) {
            env.extend(controller.environment.iter().cloned());
        }
        env.extend(command.environment.iter().cloned());
        env
    }

    /// Record the state the reconciler last observed for a controller.
    ///
    /// Returns `false` when the controller does not exist.
    pub fn set_controller_state(&mut self, id: &str, state: ControllerState, last_count: usize) -> bool {
        match self.controllers.get_mut(id) {
            Some(controller) => {
                controller.state = state;
                controller.last_count = last_count;
                true
            }
            None => false,
        }
    }
}

fn register_id(seen: &mut HashSet<String>, id: &str) -> Result<()> {
    if !seen.insert(id.to_string()) {
        return Err(SluiceError::DuplicateId(id.to_string()));
    }
    Ok(())
}
