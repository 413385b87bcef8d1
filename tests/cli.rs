// tests/cli.rs

use std::path::PathBuf;

use clap::Parser;
use sluice::cli::{CliArgs, CliCommand, LogLevel};

#[test]
fn fill_takes_budget_and_interval() {
    let args = CliArgs::try_parse_from([
        "sluice", "fill", "-p", "Example Pipeline", "--max-items", "3", "--every", "30",
    ])
    .unwrap();

    assert_eq!(args.config, "Sluice.toml");
    match args.command {
        CliCommand::Fill {
            pipeline,
            max_items,
            every,
        } => {
            assert_eq!(pipeline, "Example Pipeline");
            assert_eq!(max_items, Some(3));
            assert_eq!(every, Some(30));
        }
        other => panic!("Expected fill, got {other:?}"),
    }
}

#[test]
fn global_flags_follow_the_subcommand() {
    let args = CliArgs::try_parse_from([
        "sluice",
        "claim",
        "--pipeline",
        "p",
        "--key",
        "consumer-tiyo:1.0:host-0",
        "--config",
        "/etc/sluice.toml",
        "--documents",
        "/srv/docs",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.config, "/etc/sluice.toml");
    assert_eq!(args.documents, Some(PathBuf::from("/srv/docs")));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(matches!(args.command, CliCommand::Claim { ref key, .. } if key == "consumer-tiyo:1.0:host-0"));
}

#[test]
fn import_needs_a_file() {
    assert!(CliArgs::try_parse_from(["sluice", "import", "-p", "p"]).is_err());

    let args = CliArgs::try_parse_from(["sluice", "import", "-p", "p", "--file", "doc.json"]).unwrap();
    assert!(matches!(args.command, CliCommand::Import { .. }));
}

#[test]
fn a_subcommand_is_required() {
    assert!(CliArgs::try_parse_from(["sluice"]).is_err());
    assert!(CliArgs::try_parse_from(["sluice", "show"]).is_err());
}
