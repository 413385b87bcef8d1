// tests/dispatch.rs

mod common;

use serde_json::json;
use sluice::dispatch::{QueueKey, fill};
use sluice::errors::SluiceError;
use sluice::store::{BucketPath, FileStatus, MemoryNamespace, Namespace, SledNamespace, TagStatus};
use sluice_test_utils::builders::PipelineDocBuilder;
use sluice_test_utils::init_tracing;

use common::{
    BUCKET, CONSUMER_TAG, PIPELINE, ab_pipeline, converging_pipeline, queue_keys, seed_file,
    seed_raw, tag_status,
};

fn single_ready_file(ns: &dyn Namespace) {
    init_tracing();
    let pipeline = ab_pipeline();
    seed_file(ns, "in:data.csv", FileStatus::Ready);

    let report = fill(ns, &pipeline, 5).unwrap();
    assert_eq!(report.existing, 0);
    assert_eq!(report.queued.len(), 1);
    assert_eq!(report.queued[0].key, "consumer-tiyo:1.0:workers:in:data.csv");
    assert_eq!(report.queued[0].command, "b");

    let queue = BucketPath::queue(BUCKET);
    assert_eq!(ns.count(&queue).unwrap(), 1);
    let value = ns.get(&queue, "consumer-tiyo:1.0:workers:in:data.csv").unwrap();
    assert_eq!(value.as_deref(), Some(&b"b"[..]));
    assert_eq!(tag_status(ns, "in:data.csv", CONSUMER_TAG), Some(TagStatus::Queued));
}

#[test]
fn ready_file_is_queued_for_its_consumer() {
    single_ready_file(&MemoryNamespace::new());
}

#[test]
fn ready_file_is_queued_with_sled() {
    single_ready_file(&SledNamespace::temporary().unwrap());
}

#[test]
fn fill_respects_the_budget_and_existing_entries() {
    let ns = MemoryNamespace::new();
    let pipeline = ab_pipeline();
    for i in 0..5 {
        seed_file(&ns, &format!("in:f{i}.csv"), FileStatus::Ready);
    }

    let first = fill(&ns, &pipeline, 3).unwrap();
    assert_eq!(first.queued.len(), 3);
    assert_eq!(first.total(), 3);

    let full = fill(&ns, &pipeline, 3).unwrap();
    assert_eq!(full.existing, 3);
    assert!(full.queued.is_empty());

    let rest = fill(&ns, &pipeline, 5).unwrap();
    assert_eq!(rest.existing, 3);
    assert_eq!(rest.queued.len(), 2);

    // Everything is queued now; a larger budget finds nothing new.
    let again = fill(&ns, &pipeline, 50).unwrap();
    assert!(again.queued.is_empty());
    assert_eq!(queue_keys(&ns).len(), 5);
}

#[test]
fn zero_budget_queues_nothing() {
    let ns = MemoryNamespace::new();
    seed_file(&ns, "in:data.csv", FileStatus::Ready);
    let report = fill(&ns, &ab_pipeline(), 0).unwrap();
    assert!(report.queued.is_empty());
    assert!(queue_keys(&ns).is_empty());
}

#[test]
fn loading_and_foreign_files_are_not_queued() {
    let ns = MemoryNamespace::new();
    seed_file(&ns, "in:partial.csv", FileStatus::Loading);
    seed_file(&ns, "inbox:other.csv", FileStatus::Ready);
    seed_raw(&ns, "in:broken.csv", json!("not a record"));
    seed_raw(&ns, "in:legacy.csv", json!({}));

    let report = fill(&ns, &ab_pipeline(), 10).unwrap();
    let keys: Vec<&str> = report.queued.iter().map(|e| e.key.as_str()).collect();
    // A record without status is not loading, so it is eligible.
    assert_eq!(keys, vec!["consumer-tiyo:1.0:workers:in:legacy.csv"]);
    assert_eq!(tag_status(&ns, "in:partial.csv", CONSUMER_TAG), None);
}

#[test]
fn files_handed_back_as_ready_are_queued_again() {
    let ns = MemoryNamespace::new();
    seed_raw(&ns, "in:retry.csv", json!({"status": "ready", "consumer-tiyo:1.0": "ready"}));
    seed_raw(&ns, "in:busy.csv", json!({"status": "ready", "consumer-tiyo:1.0": "in_progress"}));

    let report = fill(&ns, &ab_pipeline(), 10).unwrap();
    assert_eq!(report.queued.len(), 1);
    assert!(report.queued[0].key.ends_with(":in:retry.csv"));
}

#[test]
fn converging_command_gets_files_from_every_source() {
    let ns = MemoryNamespace::new();
    seed_file(&ns, "left-out:l.csv", FileStatus::Ready);
    seed_file(&ns, "right-out:r.csv", FileStatus::Ready);

    let report = fill(&ns, &converging_pipeline(), 10).unwrap();
    let mut keys: Vec<&str> = report.queued.iter().map(|e| e.key.as_str()).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "merge-tiyo:2.0:workers:left-out:l.csv",
            "merge-tiyo:2.0:workers:right-out:r.csv",
        ]
    );
    assert!(report.queued.iter().all(|e| e.command == "c"));
}

#[test]
fn upstream_commands_are_served_first() {
    let pipeline = PipelineDocBuilder::new()
        .controller("ctl", "Workers", &["a", "b", "c"])
        .command("a", "Fetch", "1", "ctl")
        .command("b", "Parse", "1", "ctl")
        .command("c", "Store", "1", "ctl")
        .file_link("ab", "a", "b", "fetched", "", true)
        .file_link("bc", "b", "c", "parsed", "", true)
        .load(PIPELINE);

    let ns = MemoryNamespace::new();
    seed_file(&ns, "parsed:p.json", FileStatus::Ready);
    seed_file(&ns, "fetched:f.html", FileStatus::Ready);

    let report = fill(&ns, &pipeline, 1).unwrap();
    assert_eq!(report.queued.len(), 1);
    assert_eq!(report.queued[0].key, "parse-tiyo:1:workers:fetched:f.html");

    let report = fill(&ns, &pipeline, 2).unwrap();
    assert_eq!(report.queued[0].key, "store-tiyo:1:workers:parsed:p.json");
}

#[test]
fn commands_without_controller_are_not_queued() {
    let pipeline = PipelineDocBuilder::new()
        .command("a", "Producer", "1.0", "")
        .command("b", "Consumer", "1.0", "")
        .file_link("l1", "a", "b", "in", "", true)
        .load(PIPELINE);

    let ns = MemoryNamespace::new();
    seed_file(&ns, "in:data.csv", FileStatus::Ready);
    let report = fill(&ns, &pipeline, 5).unwrap();
    assert!(report.queued.is_empty());
    assert_eq!(tag_status(&ns, "in:data.csv", CONSUMER_TAG), None);
}

#[test]
fn root_files_are_queued_under_root() {
    let pipeline = PipelineDocBuilder::new()
        .controller("ctl", "Workers", &["a", "b"])
        .command("a", "Producer", "1.0", "ctl")
        .command("b", "Consumer", "1.0", "ctl")
        .file_link("l1", "a", "b", BUCKET, "", true)
        .load(PIPELINE);

    let ns = MemoryNamespace::new();
    seed_file(&ns, "root:top.csv", FileStatus::Ready);
    let report = fill(&ns, &pipeline, 5).unwrap();
    assert_eq!(report.queued[0].key, "consumer-tiyo:1.0:workers:root:top.csv");
}

#[test]
fn queue_keys_parse_and_print() {
    let key: QueueKey = "consumer-tiyo:1.0:workers:in:odd:name.csv".parse().unwrap();
    assert_eq!(key.container, "consumer-tiyo");
    assert_eq!(key.version, "1.0");
    assert_eq!(key.controller, "workers");
    assert_eq!(key.dir, "in");
    assert_eq!(key.file, "odd:name.csv");
    assert_eq!(key.tag(), "consumer-tiyo:1.0");
    assert_eq!(key.file_key(), "in:odd:name.csv");
    assert_eq!(key.to_string(), "consumer-tiyo:1.0:workers:in:odd:name.csv");

    for bad in ["consumer-tiyo:1.0", "a:b:c:d", ":1.0:workers:in:f", "c:1:w:in:"] {
        match bad.parse::<QueueKey>() {
            Err(SluiceError::MalformedKey(k)) => assert_eq!(k, bad),
            other => panic!("Expected MalformedKey for {bad}, got {other:?}"),
        }
    }
}
