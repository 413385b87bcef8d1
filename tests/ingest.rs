// tests/ingest.rs

mod common;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sluice::dispatch::fill;
use sluice::errors::{Result, SluiceError};
use sluice::fs::mock::MockFileSystem;
use sluice::ingest::{
    FileKey, FileState, FileTracker, FsEvent, Ingestor, NamespaceSink, StatusChange, StatusSink,
    StatusWrite, StatusWriter, WriteOutcome, WriterOptions, derive_key,
};
use sluice::store::{BucketPath, FileRecord, FileStatus, MemoryNamespace, Namespace};
use sluice::traverse::{Matcher, WatchItem};
use sluice_test_utils::sink::RecordingSink;
use sluice_test_utils::{init_tracing, with_timeout};

use common::{BUCKET, ab_pipeline, queue_keys, record};

fn options(senders: usize, retries: u32) -> WriterOptions {
    WriterOptions {
        senders,
        retries,
        queue_depth: 8,
        backoff: Duration::from_millis(1),
    }
}

fn write(name: &str, change: StatusChange) -> StatusWrite {
    StatusWrite {
        bucket: BUCKET.to_string(),
        key: FileKey {
            dir: "in".to_string(),
            name: name.to_string(),
        },
        change,
    }
}

fn csv_item() -> WatchItem {
    ab_pipeline().watch_items().remove(0)
}

fn in_path(name: &str) -> PathBuf {
    Path::new("/data").join(BUCKET).join("in").join(name)
}

#[test]
fn tracker_reports_each_transition_once() {
    let mut state = FileState::default();
    assert_eq!(state.apply(FsEvent::Opened), Some(StatusChange::Loading));
    assert_eq!(state.apply(FsEvent::Opened), None);
    assert_eq!(state.apply(FsEvent::ClosedWrite), Some(StatusChange::Ready));
    assert_eq!(state.apply(FsEvent::ClosedWrite), None);
    assert_eq!(state.apply(FsEvent::Removed), Some(StatusChange::Deleted));
    assert_eq!(state.apply(FsEvent::Removed), None);
    // A recreated file starts over.
    assert_eq!(state.apply(FsEvent::Opened), Some(StatusChange::Loading));
}

#[test]
fn tracker_skips_loading_for_files_already_closed() {
    let mut tracker = FileTracker::new();
    let path = Path::new("/data/x.csv");
    assert_eq!(tracker.observe(path, FsEvent::ClosedWrite), Some(StatusChange::Ready));
    assert_eq!(tracker.observe(path, FsEvent::Opened), None);

    let state = tracker.state(path).unwrap();
    assert!(state.opened && state.closed && !state.deleted);
    assert!(tracker.state(Path::new("/data/other.csv")).is_none());
}

#[test]
fn keys_use_the_parent_directory_or_root() {
    let root = Path::new("/data/example_pipeline");
    let any = Matcher::any();

    let key = derive_key(root, &root.join("x.csv"), &any).unwrap();
    assert_eq!(key.to_string(), "root:x.csv");

    let key = derive_key(root, &root.join("stage/in/x.csv"), &any).unwrap();
    assert_eq!(key.to_string(), "in:x.csv");

    let capture = Matcher::compile(r"^(\w+)-(\w+)\.csv$");
    let key = derive_key(root, &root.join("in/ab-batch42.csv"), &capture).unwrap();
    assert_eq!(key.to_string(), "in:batch42");

    assert!(derive_key(root, Path::new("/"), &any).is_none());
}

#[test]
fn status_writes_encode_bucket_records() {
    let record = write("data.csv", StatusChange::Ready).record().unwrap().unwrap();
    assert_eq!(record.bucket, "files");
    assert_eq!(record.child, BUCKET);
    assert_eq!(record.key, "in:data.csv");
    let value = FileRecord::from_slice(&record.decode_value().unwrap()).unwrap();
    assert_eq!(value.status, Some(FileStatus::Ready));

    assert!(write("data.csv", StatusChange::Deleted).record().unwrap().is_none());
}

#[tokio::test]
async fn namespace_sink_puts_and_deletes_records() {
    let ns = Arc::new(MemoryNamespace::new());
    let sink = NamespaceSink::new(ns.clone());
    let files = BucketPath::files(BUCKET);

    sink.send(&write("data.csv", StatusChange::Loading)).await.unwrap();
    let stored = FileRecord::from_slice(&ns.get(&files, "in:data.csv").unwrap().unwrap()).unwrap();
    assert_eq!(stored.status, Some(FileStatus::Loading));

    sink.send(&write("data.csv", StatusChange::Ready)).await.unwrap();
    let stored = FileRecord::from_slice(&ns.get(&files, "in:data.csv").unwrap().unwrap()).unwrap();
    assert_eq!(stored.status, Some(FileStatus::Ready));

    sink.send(&write("data.csv", StatusChange::Deleted)).await.unwrap();
    assert!(ns.get(&files, "in:data.csv").unwrap().is_none());
}

#[tokio::test]
async fn writer_retries_transient_failures() {
    init_tracing();
    let sink = RecordingSink::failing_first(2);
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink.clone()), options(1, 5));

    let ticket = writer.submit(write("data.csv", StatusChange::Ready)).await.unwrap();
    let outcome = with_timeout(ticket.outcome()).await;
    assert_eq!(outcome, WriteOutcome::Delivered { attempts: 3 });
    assert_eq!(sink.writes().len(), 1);

    drop(writer);
    with_timeout(pool.join()).await;
}

#[tokio::test]
async fn writer_drops_writes_after_its_attempts_run_out() {
    let sink = RecordingSink::always_failing();
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink.clone()), options(1, 3));

    let ticket = writer.submit(write("data.csv", StatusChange::Ready)).await.unwrap();
    match with_timeout(ticket.outcome()).await {
        WriteOutcome::Dropped { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("Expected Dropped, got {other:?}"),
    }
    assert_eq!(sink.attempts(), 3);
    assert!(sink.writes().is_empty());

    drop(writer);
    with_timeout(pool.join()).await;
}

/// Fails its first send, then writes through to the namespace.
struct FlakyOnceSink {
    inner: NamespaceSink,
    failed: AtomicBool,
}

impl StatusSink for FlakyOnceSink {
    fn send<'a>(
        &'a self,
        write: &'a StatusWrite,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(SluiceError::StoreTimeout(0));
            }
            self.inner.send(write).await
        })
    }
}

#[tokio::test]
async fn retried_loading_write_never_lands_after_ready() {
    init_tracing();
    let ns = Arc::new(MemoryNamespace::new());
    let sink = FlakyOnceSink {
        inner: NamespaceSink::new(ns.clone()),
        failed: AtomicBool::new(false),
    };
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink), options(2, 3));

    let loading = writer.submit(write("data.csv", StatusChange::Loading)).await.unwrap();
    let ready = writer.submit(write("data.csv", StatusChange::Ready)).await.unwrap();
    assert_eq!(with_timeout(loading.outcome()).await, WriteOutcome::Delivered { attempts: 2 });
    assert_eq!(with_timeout(ready.outcome()).await, WriteOutcome::Delivered { attempts: 1 });

    assert_eq!(record(ns.as_ref(), "in:data.csv").status, Some(FileStatus::Ready));
    let report = fill(ns.as_ref(), &ab_pipeline(), 5).unwrap();
    assert_eq!(report.total(), 1);
    assert_eq!(queue_keys(ns.as_ref()).len(), 1);

    drop(writer);
    with_timeout(pool.join()).await;
}

#[tokio::test]
async fn writer_pool_delivers_everything_with_many_senders() {
    let sink = RecordingSink::new();
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink.clone()), options(4, 1));

    let mut tickets = Vec::new();
    for i in 0..20 {
        tickets.push(
            writer
                .submit(write(&format!("f{i}.csv"), StatusChange::Ready))
                .await
                .unwrap(),
        );
    }
    for ticket in tickets {
        assert!(with_timeout(ticket.outcome()).await.is_delivered());
    }
    assert_eq!(sink.writes().len(), 20);

    drop(writer);
    with_timeout(pool.join()).await;
}

#[tokio::test]
async fn ingestor_writes_one_status_per_transition() {
    init_tracing();
    let sink = RecordingSink::new();
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink.clone()), options(1, 1));
    let fs = Arc::new(MockFileSystem::new());
    let mut ingestor = Ingestor::new(Path::new("/data"), BUCKET, fs, writer);
    let item = csv_item();
    let path = in_path("data.csv");

    assert_eq!(ingestor.bucket_root(), Path::new("/data/example_pipeline"));

    let first = ingestor.handle(&item, &path, FsEvent::Opened).await.unwrap();
    assert!(with_timeout(first.unwrap().outcome()).await.is_delivered());
    assert!(ingestor.handle(&item, &path, FsEvent::Opened).await.unwrap().is_none());

    let ready = ingestor.handle(&item, &path, FsEvent::ClosedWrite).await.unwrap();
    assert!(with_timeout(ready.unwrap().outcome()).await.is_delivered());

    let gone = ingestor.handle(&item, &path, FsEvent::Removed).await.unwrap();
    assert!(with_timeout(gone.unwrap().outcome()).await.is_delivered());

    let changes: Vec<(String, StatusChange)> = sink
        .writes()
        .into_iter()
        .map(|w| (w.key.to_string(), w.change))
        .collect();
    assert_eq!(
        changes,
        vec![
            ("in:data.csv".to_string(), StatusChange::Loading),
            ("in:data.csv".to_string(), StatusChange::Ready),
            ("in:data.csv".to_string(), StatusChange::Deleted),
        ]
    );

    drop(ingestor);
    with_timeout(pool.join()).await;
}

#[tokio::test]
async fn ingestor_ignores_non_matching_files_and_directories() {
    let sink = RecordingSink::new();
    let (writer, pool) = StatusWriter::spawn(Arc::new(sink.clone()), options(1, 1));
    let fs = Arc::new(MockFileSystem::new());
    fs.add_dir(in_path("folder.csv"));
    let mut ingestor = Ingestor::new(Path::new("/data"), BUCKET, fs, writer);
    let item = csv_item();

    let notes = ingestor
        .handle(&item, &in_path("notes.txt"), FsEvent::ClosedWrite)
        .await
        .unwrap();
    assert!(notes.is_none());

    let folder = ingestor
        .handle(&item, &in_path("folder.csv"), FsEvent::ClosedWrite)
        .await
        .unwrap();
    assert!(folder.is_none());

    drop(ingestor);
    with_timeout(pool.join()).await;
    assert!(sink.writes().is_empty());
}
