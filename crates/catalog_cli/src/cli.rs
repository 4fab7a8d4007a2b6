use std::path::PathBuf;

use catalog_engine::HarvestConfig;
use clap::{ArgAction, Parser, ValueEnum};
use engine_logging::LogDestination;
use log::LevelFilter;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "catalog-harvest",
    version,
    about = "Harvests paginated product catalogs into one CSV file per category"
)]
pub struct Cli {
    /// RON file describing categories, selectors and pacing.
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_name = "N")]
    pub max_pages: Option<u32>,

    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    #[arg(long)]
    pub headed: bool,

    #[arg(long, value_enum, default_value_t = SourceKind::Static)]
    pub source: SourceKind,

    /// Categories harvested in parallel.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Send logs to this file instead of the terminal.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Copy, Clone, ValueEnum, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain HTTP fetch; server-rendered pages only.
    Static,
    /// Headless Chromium over the DevTools protocol.
    Chromium,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut HarvestConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.pagination.max_pages = max_pages;
        }
        if self.headless {
            config.browser.headless = true;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::File(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    /// Progress lines go to stdout only when logs are not already there.
    pub fn echo_progress(&self) -> bool {
        self.log_file.is_some()
    }
}
