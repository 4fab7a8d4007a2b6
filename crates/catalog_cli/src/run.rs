use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use catalog_core::CategorySource;
use catalog_engine::{
    ensure_output_dir, ChannelProgressSink, CsvResultSink, FetchSettings, HarvestConfig,
    HarvestEvent, HarvestReport, HarvestSession, StaticPageSource, StaticSourceFactory,
};
use chrono::Utc;
use engine_logging::{engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, SourceKind};
use crate::summary::RunSummary;

/// Loads the configuration, harvests every category and writes the run summary.
///
/// Ctrl-C cancels the run: the category in progress keeps what it has
/// harvested and the remaining ones are skipped.
pub async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let mut config = HarvestConfig::load(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    let categories = config.category_sources()?;
    ensure_output_dir(&config.output.directory)?;
    engine_info!(
        "harvesting {} categories into {} ({:?} source)",
        categories.len(),
        config.output.directory.display(),
        cli.source
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("interrupt received; finishing the current category");
                cancel.cancel();
            }
        })
    };

    let (tx, rx) = mpsc::channel();
    let echo = cli.echo_progress();
    let printer = thread::spawn(move || {
        for event in rx {
            if echo {
                print_event(&event);
            }
        }
    });

    let sink = CsvResultSink::new(config.output.clone(), config.schema.field_names());
    let started = Utc::now();
    let report = {
        let progress = ChannelProgressSink::new(tx);
        let session = HarvestSession::new(&config, &sink, &progress, cancel);
        harvest(&session, &config, cli.source, categories).await
    };
    interrupt.abort();
    if printer.join().is_err() {
        engine_warn!("progress printer panicked");
    }

    let summary = RunSummary::from_report(&report?, started, Utc::now());
    let path = summary.write_to(&config.output.directory)?;
    engine_info!("run summary written to {}", path.display());
    Ok(summary)
}

async fn harvest(
    session: &HarvestSession<'_>,
    config: &HarvestConfig,
    kind: SourceKind,
    categories: Vec<CategorySource>,
) -> anyhow::Result<HarvestReport> {
    match kind {
        SourceKind::Static => {
            if config.concurrency > 1 {
                let factory =
                    StaticSourceFactory::new(config.browser.clone(), FetchSettings::default());
                return Ok(session.run_concurrent(&factory, categories).await);
            }
            let source = StaticPageSource::new(&config.browser, FetchSettings::default())?;
            Ok(session.run(&source, categories).await)
        }
        SourceKind::Chromium => harvest_with_chromium(session, config, categories).await,
    }
}

#[cfg(feature = "chromium")]
async fn harvest_with_chromium(
    session: &HarvestSession<'_>,
    config: &HarvestConfig,
    categories: Vec<CategorySource>,
) -> anyhow::Result<HarvestReport> {
    use catalog_engine::{ChromiumPageSource, ChromiumSourceFactory};

    if config.concurrency > 1 {
        let factory = ChromiumSourceFactory::new(config.browser.clone());
        return Ok(session.run_concurrent(&factory, categories).await);
    }
    let source = ChromiumPageSource::launch(&config.browser)
        .await
        .context("launch chromium")?;
    let report = session.run(&source, categories).await;
    source.close().await;
    Ok(report)
}

#[cfg(not(feature = "chromium"))]
async fn harvest_with_chromium(
    _session: &HarvestSession<'_>,
    _config: &HarvestConfig,
    _categories: Vec<CategorySource>,
) -> anyhow::Result<HarvestReport> {
    anyhow::bail!("this binary was built without the `chromium` feature")
}

fn print_event(event: &HarvestEvent) {
    match event {
        HarvestEvent::CategoryStarted { category_id } => println!("==> {category_id}"),
        HarvestEvent::PageHarvested {
            cursor,
            records,
            excluded,
        } => println!(
            "    page {} (offset {}): {} records, {} excluded",
            cursor.page_index + 1,
            cursor.offset,
            records,
            excluded
        ),
        HarvestEvent::CategoryFinished {
            records,
            termination,
            ..
        } => println!("    done: {records} records ({termination})"),
        HarvestEvent::CategoryPersisted { location, .. } => println!("    saved {location}"),
        HarvestEvent::CategoryFailed { message, .. } => println!("    FAILED: {message}"),
    }
}
