// src/lib.rs

pub mod claim;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod fs;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod traverse;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::claim::ClaimOutcome;
use crate::cli::{CliArgs, CliCommand};
use crate::config::{ConfigFile, load_and_validate};
use crate::fs::{FileSystem, RealFileSystem};
use crate::ingest::{Ingestor, NamespaceSink, StatusSink, StatusWriter, WriterOptions};
use crate::pipeline::{DirectoryDocuments, DocumentSource, NamespaceDocuments, Pipeline};
use crate::service::QueueService;
use crate::store::{Namespace, SledNamespace};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the namespace and the document source
/// - the queue service
/// - (for `watch`) file watchers and the status writer pool
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let sled = SledNamespace::open(&cfg.store.path)
        .with_context(|| format!("opening store {}", cfg.store.path.display()))?;
    let namespace: Arc<dyn Namespace> = Arc::new(sled.clone());
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let documents: Arc<dyn DocumentSource> = match &args.documents {
        Some(dir) => Arc::new(DirectoryDocuments::new(dir.clone(), Arc::clone(&fs))),
        None => Arc::new(NamespaceDocuments::new(Arc::clone(&namespace))),
    };
    let service = QueueService::new(cfg.clone(), Arc::clone(&namespace), documents);

    match args.command {
        CliCommand::Watch { pipeline } => watch(&service, &cfg, &pipeline, fs).await?,
        CliCommand::Fill {
            pipeline,
            max_items,
            every,
        } => match every {
            Some(secs) => {
                let every = Duration::from_secs(secs.max(1));
                service
                    .perpetual(&pipeline, max_items, every, shutdown_signal())
                    .await;
            }
            None => {
                let report = service.fill(&pipeline, max_items).await?;
                println!("{}", serde_json::to_string_pretty(&crate::service::report_json(&report))?);
            }
        },
        CliCommand::Claim { pipeline, key } => match service.claim(&pipeline, &key).await? {
            ClaimOutcome::Claimed(item) => println!("{}", serde_json::to_string_pretty(&item)?),
            ClaimOutcome::NoWorkAvailable => info!(%pipeline, %key, "no work available"),
        },
        CliCommand::Import { pipeline, file } => {
            let document = fs.read_to_string(&file)?;
            NamespaceDocuments::new(Arc::clone(&namespace)).store(&pipeline, document.as_bytes())?;
            info!(%pipeline, file = %file.display(), "pipeline document stored");
        }
        CliCommand::List => {
            for name in service.pipelines().await? {
                println!("{name}");
            }
        }
        CliCommand::Show { pipeline } => {
            let pipeline = service.load_pipeline(&pipeline).await?;
            print_pipeline(&pipeline);
        }
    }

    sled.flush()?;
    Ok(())
}

/// Run event ingestion for one pipeline until Ctrl-C.
async fn watch(
    service: &QueueService,
    cfg: &ConfigFile,
    name: &str,
    fs: Arc<dyn FileSystem>,
) -> Result<()> {
    let pipeline = service.load_pipeline(name).await?;
    let items = pipeline.watch_items();
    if items.is_empty() {
        warn!(pipeline = %name, "pipeline has no watched links; nothing to do");
        return Ok(());
    }

    let sink: Arc<dyn StatusSink> = Arc::new(NamespaceSink::new(service.namespace()));
    let (writer, pool) = StatusWriter::spawn(sink, WriterOptions::from_config(cfg));
    let ingestor = Ingestor::new(
        &cfg.ingest.base_dir,
        &pipeline.bucket_name,
        Arc::clone(&fs),
        writer,
    );
    let handle = ingest::spawn_watchers(items, ingestor, fs)?;
    info!(pipeline = %name, dirs = handle.dirs().len(), "ingestion running; Ctrl-C to stop");

    shutdown_signal().await;

    drop(handle);
    pool.join().await;
    debug!(pipeline = %name, "status writers drained");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }
}

/// Dry-run style output of a loaded pipeline.
fn print_pipeline(pipeline: &Pipeline) {
    println!("pipeline {} (bucket {}, fqdn {})", pipeline.name, pipeline.bucket_name, pipeline.fqdn);
    println!();

    println!("controllers ({}):", pipeline.controllers.len());
    for controller in pipeline.controllers.values() {
        println!(
            "  - {} [{:?}, scale {}, {}]",
            controller.name, controller.source_type, controller.scale, controller.state
        );
        for command in pipeline.children(controller) {
            println!("      {} ({})", command.name, command.status_tag);
        }
    }

    println!("links ({}):", pipeline.links.len());
    for link in pipeline.links.values() {
        let name = |id: &str| {
            pipeline
                .get_command(id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("<missing {id}>"))
        };
        println!(
            "  - {} -> {} [{}{}]",
            name(&link.source),
            name(&link.target),
            link.link_type(),
            if link.is_watched() { ", watched" } else { "" }
        );
    }

    let names = |commands: Vec<&crate::pipeline::Command>| {
        commands.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
    };
    println!("start: {}", names(pipeline.start()));
    println!("end: {}", names(pipeline.end()));
    let convergence: Vec<&crate::pipeline::Command> = pipeline
        .commands
        .values()
        .filter(|c| pipeline.is_convergence(c))
        .collect();
    if !convergence.is_empty() {
        println!("convergence: {}", names(convergence));
    }
    match traverse::topology::file_order(pipeline) {
        Ok(order) => {
            let order: Vec<&str> = order
                .into_iter()
                .filter_map(|id| pipeline.get_command(id).map(|c| c.name.as_str()))
                .collect();
            println!("file order: {}", order.join(" -> "));
        }
        Err(id) => println!("file links form a cycle through {id}"),
    }

    println!("watch items:");
    for item in pipeline.watch_items() {
        let dir = if item.dir.is_empty() { "<root>" } else { item.dir.as_str() };
        println!("  - {dir} ~ /{}/", item.matcher.pattern());
    }
}
