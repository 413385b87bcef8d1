// src/ingest/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notify::event::{AccessKind, AccessMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::ingest::Ingestor;
use crate::ingest::tracker::FsEvent;
use crate::traverse::WatchItem;

/// Keeps the notify watchers and the event loop alive. Dropping it stops
/// watching.
pub struct WatcherHandle {
    _watchers: Vec<RecommendedWatcher>,
    task: JoinHandle<()>,
    dirs: Vec<PathBuf>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Directories being watched, one per watch item.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Map a notify event kind onto the events ingestion tracks.
pub fn fs_event(kind: &EventKind) -> Option<FsEvent> {
    match kind {
        EventKind::Create(_) | EventKind::Access(AccessKind::Open(_)) => Some(FsEvent::Opened),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(FsEvent::ClosedWrite),
        EventKind::Remove(_) => Some(FsEvent::Removed),
        _ => None,
    }
}

/// Start one non-recursive watcher per item. Missing directories are created
/// first.
///
/// All watchers feed a single event loop, so a saturated writer pool holds
/// back events from every directory, not just the busy one.
pub fn spawn_watchers(
    items: Vec<WatchItem>,
    mut ingestor: Ingestor,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<(usize, Event)>();
    let mut watchers = Vec::with_capacity(items.len());
    let mut dirs = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let dir = item.watch_dir(ingestor.bucket_root());
        fs.create_dir_all(&dir)?;

        let tx = event_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = tx.send((index, event)) {
                        eprintln!("sluice: failed to forward notify event: {err}");
                    }
                }
                Err(err) => eprintln!("sluice: file watch error: {err}"),
            },
            Config::default(),
        )?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", dir.display()))?;

        info!(dir = %dir.display(), pattern = item.matcher.pattern(), "watching directory");
        watchers.push(watcher);
        dirs.push(dir);
    }
    drop(event_tx);

    let task = tokio::spawn(async move {
        while let Some((index, event)) = event_rx.recv().await {
            let Some(fs_event) = fs_event(&event.kind) else {
                continue;
            };
            let Some(item) = items.get(index) else {
                continue;
            };
            for path in &event.paths {
                if let Err(err) = ingestor.handle(item, path, fs_event).await {
                    error!(path = %path.display(), error = %err, "failed to handle file event");
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _watchers: watchers,
        task,
        dirs,
    })
}
