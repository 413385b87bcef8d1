#![allow(dead_code)]

use serde_json::{Map, Value, json};
use sluice::config::{ConfigFile, RawConfigFile};
use sluice::pipeline::Pipeline;

/// Builder for pipeline documents in the cell format the loader reads.
#[derive(Debug, Clone, Default)]
pub struct PipelineDocBuilder {
    cells: Vec<Value>,
    environment: Vec<String>,
}

impl PipelineDocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deployment controller embedding `children`.
    pub fn controller(self, id: &str, name: &str, children: &[&str]) -> Self {
        self.controller_with(id, name, children, json!({}))
    }

    /// A controller with extra fields merged into its cell.
    pub fn controller_with(mut self, id: &str, name: &str, children: &[&str], extra: Value) -> Self {
        let mut cell = json!({
            "id": id,
            "type": "container.Kubernetes",
            "name": name,
            "embeds": children,
        });
        merge(&mut cell, extra);
        self.cells.push(cell);
        self
    }

    /// A prefabricated command owned by `parent`.
    pub fn command(self, id: &str, name: &str, version: &str, parent: &str) -> Self {
        self.command_with(id, name, version, parent, json!({}))
    }

    /// A command with extra fields merged into its cell.
    pub fn command_with(
        mut self,
        id: &str,
        name: &str,
        version: &str,
        parent: &str,
        extra: Value,
    ) -> Self {
        let mut cell = json!({
            "id": id,
            "type": "container.Container",
            "name": name,
            "version": version,
            "parent": parent,
        });
        merge(&mut cell, extra);
        self.cells.push(cell);
        self
    }

    /// A file link from `source` to `target`.
    pub fn file_link(
        mut self,
        id: &str,
        source: &str,
        target: &str,
        path: &str,
        pattern: &str,
        watch: bool,
    ) -> Self {
        self.cells.push(json!({
            "id": id,
            "type": "link",
            "source": {"id": source},
            "target": {"id": target},
            "attributes": {
                "type": "file",
                "path": path,
                "pattern": pattern,
                "watch": watch,
            },
        }));
        self
    }

    /// A network link of `link_type` (`tcp` or `udp`).
    pub fn port_link(
        mut self,
        id: &str,
        source: &str,
        target: &str,
        link_type: &str,
        source_port: i32,
        dest_port: i32,
    ) -> Self {
        self.cells.push(json!({
            "id": id,
            "type": "link",
            "source": {"id": source},
            "target": {"id": target},
            "attributes": {
                "type": link_type,
                "source": source_port,
                "dest": dest_port,
                "address": "",
            },
        }));
        self
    }

    /// Any cell, verbatim.
    pub fn raw_cell(mut self, cell: Value) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn environment(mut self, env: &[&str]) -> Self {
        self.environment = env.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(&self) -> Value {
        json!({
            "cells": self.cells,
            "environment": self.environment,
        })
    }

    pub fn to_json(&self) -> String {
        self.build().to_string()
    }

    /// Load the document as pipeline `name` with default configuration.
    pub fn load(&self, name: &str) -> Pipeline {
        Pipeline::from_json(name, &self.to_json(), &ConfigFile::default())
            .expect("Failed to load pipeline from builder")
    }
}

fn merge(cell: &mut Value, extra: Value) {
    if let (Value::Object(cell), Value::Object(extra)) = (cell, extra) {
        let extra: Map<String, Value> = extra;
        cell.extend(extra);
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_store_timeout_ms(mut self, ms: u64) -> Self {
        self.config.store.timeout_ms = ms;
        self
    }

    pub fn with_store_retries(mut self, retries: u32) -> Self {
        self.config.store.retries = retries;
        self
    }

    pub fn with_backoff_ms(mut self, ms: u64) -> Self {
        self.config.store.backoff_ms = ms;
        self
    }

    pub fn with_dns_name(mut self, dns: &str) -> Self {
        self.config.cluster.dns_name = dns.to_string();
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.config.ingest.base_dir = dir.into();
        self
    }

    pub fn with_senders(mut self, senders: usize) -> Self {
        self.config.ingest.senders = senders;
        self
    }

    pub fn with_ingest_retries(mut self, retries: u32) -> Self {
        self.config.ingest.retries = retries;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.config.dispatch.max_items = max_items;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
