use std::path::PathBuf;

use catalog_cli::{Cli, RunSummary, SourceKind, SUMMARY_FILE};
use catalog_core::TerminationReason;
use catalog_engine::{CategoryOutcome, CategoryReport, HarvestConfig, HarvestReport, SinkReceipt};
use chrono::{TimeZone, Utc};
use clap::Parser;
use log::LevelFilter;
use pretty_assertions::assert_eq;

fn sample_config() -> HarvestConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/carrefour.ron");
    HarvestConfig::load(&path).unwrap()
}

fn report() -> HarvestReport {
    HarvestReport {
        categories: vec![
            CategoryReport {
                category_id: "frescos".to_string(),
                records: 34,
                pages_visited: 2,
                termination: Some(TerminationReason::LastPage),
                outcome: CategoryOutcome::Persisted(SinkReceipt {
                    location: "out/carrefour_frescos.csv".to_string(),
                    rows: 34,
                }),
            },
            CategoryReport {
                category_id: "bebe".to_string(),
                records: 0,
                pages_visited: 0,
                termination: Some(TerminationReason::EndOfListing),
                outcome: CategoryOutcome::Empty,
            },
            CategoryReport {
                category_id: "congelados".to_string(),
                records: 0,
                pages_visited: 0,
                termination: None,
                outcome: CategoryOutcome::Failed {
                    message: "renderer crashed".to_string(),
                },
            },
        ],
        cancelled: false,
    }
}

#[test]
fn flags_override_config_values() {
    let cli = Cli::try_parse_from([
        "catalog-harvest",
        "--config",
        "config/carrefour.ron",
        "--output-dir",
        "/tmp/harvest",
        "--max-pages",
        "3",
        "--headless",
        "--concurrency",
        "2",
    ])
    .unwrap();
    let mut config = sample_config();

    cli.apply_overrides(&mut config);

    assert_eq!(config.output.directory, PathBuf::from("/tmp/harvest"));
    assert_eq!(config.pagination.max_pages, 3);
    assert!(config.browser.headless);
    assert_eq!(config.concurrency, 2);
    assert_eq!(cli.source, SourceKind::Static);
}

#[test]
fn absent_flags_leave_config_untouched() {
    let cli = Cli::try_parse_from(["catalog-harvest", "-c", "config/carrefour.ron"]).unwrap();
    let mut config = sample_config();
    let before = config.clone();

    cli.apply_overrides(&mut config);

    assert_eq!(config, before);
    assert_eq!(cli.log_level(), LevelFilter::Info);
    assert!(!cli.echo_progress());
}

#[test]
fn verbosity_and_source_flags_parse() {
    let cli = Cli::try_parse_from([
        "catalog-harvest",
        "-c",
        "x.ron",
        "-vv",
        "--source",
        "chromium",
        "--log-file",
        "run.log",
    ])
    .unwrap();

    assert_eq!(cli.log_level(), LevelFilter::Trace);
    assert_eq!(cli.source, SourceKind::Chromium);
    assert!(cli.echo_progress());
}

#[test]
fn headless_and_headed_conflict() {
    let parsed = Cli::try_parse_from(["catalog-harvest", "-c", "x.ron", "--headless", "--headed"]);
    assert!(parsed.is_err());
}

#[test]
fn config_flag_is_required() {
    assert!(Cli::try_parse_from(["catalog-harvest"]).is_err());
}

#[test]
fn summary_counts_outcomes_and_round_trips_through_json() {
    let started = Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap();
    let finished = Utc.with_ymd_and_hms(2025, 3, 7, 9, 42, 0).unwrap();
    let summary = RunSummary::from_report(&report(), started, finished);

    assert_eq!(summary.categories_written, 1);
    assert_eq!(summary.records_total, 34);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.categories[0].status, "written");
    assert_eq!(
        summary.categories[0].file.as_deref(),
        Some("out/carrefour_frescos.csv")
    );
    assert_eq!(summary.categories[1].status, "empty");
    assert_eq!(summary.categories[2].error.as_deref(), Some("renderer crashed"));

    let dir = tempfile::tempdir().unwrap();
    let path = summary.write_to(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(SUMMARY_FILE));
    let restored: RunSummary =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(restored, summary);

    let rendered = summary.render();
    assert!(rendered.contains("1 of 3 categories written, 34 records, 1 failures"));
}
