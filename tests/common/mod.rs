#![allow(dead_code)]

use serde_json::json;
use sluice::pipeline::Pipeline;
use sluice::store::{BucketPath, FileRecord, FileStatus, Namespace, TagStatus};
use sluice_test_utils::builders::PipelineDocBuilder;

pub const PIPELINE: &str = "Example Pipeline";
pub const BUCKET: &str = "example_pipeline";
pub const CONSUMER_TAG: &str = "consumer-tiyo:1.0";

/// Producer -> Consumer over a watched file link into `in/`.
pub fn ab_doc() -> PipelineDocBuilder {
    PipelineDocBuilder::new()
        .controller("ctl", "Workers", &["a", "b"])
        .command("a", "Producer", "1.0", "ctl")
        .command("b", "Consumer", "1.0", "ctl")
        .file_link("l1", "a", "b", "in", r".*\.csv", true)
}

pub fn ab_pipeline() -> Pipeline {
    ab_doc().load(PIPELINE)
}

/// Two producers feeding one merger through separate directories.
pub fn converging_pipeline() -> Pipeline {
    PipelineDocBuilder::new()
        .controller("ctl", "Workers", &["a", "b", "c"])
        .command("a", "Left", "1.0", "ctl")
        .command("b", "Right", "1.0", "ctl")
        .command("c", "Merge", "2.0", "ctl")
        .file_link("la", "a", "c", "left-out", "", true)
        .file_link("lb", "b", "c", "right-out", "", true)
        .load(PIPELINE)
}

pub fn seed_file(ns: &dyn Namespace, key: &str, status: FileStatus) {
    let record = FileRecord::with_status(status);
    ns.put(&BucketPath::files(BUCKET), key, &record.to_vec().unwrap())
        .unwrap();
}

pub fn seed_raw(ns: &dyn Namespace, key: &str, value: serde_json::Value) {
    ns.put(&BucketPath::files(BUCKET), key, value.to_string().as_bytes())
        .unwrap();
}

pub fn record(ns: &dyn Namespace, key: &str) -> FileRecord {
    let bytes = ns
        .get(&BucketPath::files(BUCKET), key)
        .unwrap()
        .expect("file record exists");
    FileRecord::from_slice(&bytes).unwrap()
}

pub fn tag_status(ns: &dyn Namespace, key: &str, tag: &str) -> Option<TagStatus> {
    record(ns, key).tag(tag)
}

pub fn queue_keys(ns: &dyn Namespace) -> Vec<String> {
    ns.prefix_scan(&BucketPath::queue(BUCKET), "", None)
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect()
}

pub fn ready_record() -> serde_json::Value {
    json!({"status": "ready"})
}
