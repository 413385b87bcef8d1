// tests/traversal.rs

mod common;

use std::path::Path;

use sluice::traverse::topology::file_order;
use sluice::traverse::{FileSource, Matcher};
use sluice_test_utils::builders::PipelineDocBuilder;

use common::{PIPELINE, ab_pipeline, converging_pipeline};

fn ids<'a>(commands: impl IntoIterator<Item = &'a sluice::pipeline::Command>) -> Vec<&'a str> {
    commands.into_iter().map(|c| c.id.as_str()).collect()
}

#[test]
fn start_and_end_of_a_chain() {
    let pipeline = ab_pipeline();
    let a = pipeline.get_command("a").unwrap();
    let b = pipeline.get_command("b").unwrap();

    assert_eq!(ids(pipeline.start()), vec!["a"]);
    assert_eq!(ids(pipeline.end()), vec!["b"]);
    assert_eq!(ids(pipeline.next(a)), vec!["b"]);
    assert_eq!(ids(pipeline.prev(b)), vec!["a"]);
    assert!(pipeline.next(b).is_empty());
    assert!(pipeline.prev(a).is_empty());
    assert_eq!(pipeline.connection(a, b).unwrap().id, "l1");
    assert!(pipeline.connection(b, a).is_none());
}

#[test]
fn isolated_commands_are_both_start_and_end() {
    let pipeline = PipelineDocBuilder::new()
        .command("solo", "Solo", "1", "")
        .load(PIPELINE);

    assert_eq!(ids(pipeline.start()), vec!["solo"]);
    assert_eq!(ids(pipeline.end()), vec!["solo"]);
}

#[test]
fn convergence_is_more_than_one_incoming_link() {
    let pipeline = converging_pipeline();
    let c = pipeline.get_command("c").unwrap();
    let a = pipeline.get_command("a").unwrap();

    assert!(pipeline.is_convergence(c));
    assert!(!pipeline.is_convergence(a));
    assert_eq!(ids(pipeline.start()), vec!["a", "b"]);
    assert_eq!(ids(pipeline.prev(c)), vec!["a", "b"]);
    assert_eq!(
        pipeline.file_sources(c),
        vec![
            FileSource { dir: "left-out".to_string() },
            FileSource { dir: "right-out".to_string() },
        ]
    );
}

#[test]
fn dangling_links_contribute_nothing() {
    let pipeline = PipelineDocBuilder::new()
        .command("a", "One", "1", "")
        .file_link("l1", "a", "ghost", "out", "", true)
        .load(PIPELINE);
    let a = pipeline.get_command("a").unwrap();

    assert!(pipeline.next(a).is_empty());
    assert_eq!(ids(pipeline.start()), vec!["a"]);
    // Still a source of a link, so not an end.
    assert!(pipeline.end().is_empty());
}

#[test]
fn port_links_are_edges_but_not_file_sources() {
    let pipeline = PipelineDocBuilder::new()
        .command("a", "Db", "1", "")
        .command("b", "App", "1", "")
        .port_link("net", "a", "b", "udp", 53, 53)
        .load(PIPELINE);
    let b = pipeline.get_command("b").unwrap();

    assert_eq!(ids(pipeline.prev(b)), vec!["a"]);
    assert!(pipeline.file_sources(b).is_empty());
    assert!(pipeline.watch_items().is_empty());
}

#[test]
fn link_dirs_default_to_the_source_name_and_map_the_bucket_to_root() {
    let pipeline = PipelineDocBuilder::new()
        .command("a", "Producer", "1", "")
        .command("b", "Consumer", "1", "")
        .command("c", "Sink", "1", "")
        .file_link("unnamed", "a", "b", "", "", true)
        .file_link("bucket", "b", "c", "example_pipeline", "", true)
        .load(PIPELINE);

    let unnamed = pipeline.get_link("unnamed").unwrap();
    assert_eq!(pipeline.link_dir(unnamed).as_deref(), Some("producer"));
    let bucket = pipeline.get_link("bucket").unwrap();
    assert_eq!(pipeline.link_dir(bucket).as_deref(), Some(""));

    let c = pipeline.get_command("c").unwrap();
    let sources = pipeline.file_sources(c);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].key_prefix(), "root:");

    let b = pipeline.get_command("b").unwrap();
    assert_eq!(pipeline.file_sources(b)[0].key_prefix(), "producer:");
}

#[test]
fn nested_link_paths_are_keyed_by_their_last_segment() {
    let source = FileSource { dir: "stage/in".to_string() };
    assert_eq!(source.key_prefix(), "in:");
}

#[test]
fn watch_items_are_unique_per_directory_and_pattern() {
    let pipeline = PipelineDocBuilder::new()
        .command("a", "One", "1", "")
        .command("b", "Two", "1", "")
        .command("c", "Three", "1", "")
        .file_link("l1", "a", "b", "shared", r".*\.csv", true)
        .file_link("l2", "a", "c", "shared", r".*\.csv", true)
        .file_link("l3", "a", "c", "shared", r".*\.json", true)
        .file_link("l4", "b", "c", "quiet", "", false)
        .load(PIPELINE);

    let items = pipeline.watch_items();
    let pairs: Vec<(&str, &str)> = items
        .iter()
        .map(|i| (i.dir.as_str(), i.matcher.pattern()))
        .collect();
    assert_eq!(pairs, vec![("shared", r".*\.csv"), ("shared", r".*\.json")]);

    let root = Path::new("/data/example_pipeline");
    assert_eq!(items[0].watch_dir(root), root.join("shared"));
    assert_eq!(items[0].key_prefix(), "shared:");
}

#[test]
fn matcher_falls_back_to_matching_everything() {
    let empty = Matcher::compile("");
    assert!(empty.is_match("anything.bin"));

    let invalid = Matcher::compile("([unclosed");
    assert!(invalid.is_match("anything.bin"));
    assert_eq!(invalid.pattern(), "");

    let csv = Matcher::compile(r"^.*\.csv$");
    assert!(csv.is_match("data.csv"));
    assert!(!csv.is_match("data.json"));
}

#[test]
fn matcher_key_name_prefers_the_longest_capture() {
    let matcher = Matcher::compile(r"^(\w+)-(\w+)\.csv$");
    assert_eq!(matcher.key_name("ab-longername.csv"), "longername");
    assert_eq!(matcher.key_name("unmatched.txt"), "unmatched.txt");

    let plain = Matcher::compile(r".*\.csv");
    assert_eq!(plain.key_name("data.csv"), "data.csv");
}

#[test]
fn file_order_puts_producers_first() {
    let pipeline = converging_pipeline();
    let order = file_order(&pipeline).unwrap();
    let pos = |id: &str| order.iter().position(|o| *o == id).unwrap();
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("c"));
}
