//! Catalog harvester engine: page-source collaborators, the harvesting
//! pipeline and result persistence.
mod config;
mod controller;
mod extract;
mod filename;
mod interstitial;
mod navigator;
mod pacing;
mod page_source;
mod persist;
mod progress;
mod scroller;
mod session;
mod sink;
mod static_source;
mod types;

#[cfg(feature = "chromium")]
mod chromium_source;

pub use config::{
    BrowserSettings, CatalogSchema, CategoryEntry, ConfigError, FieldProbe, HarvestConfig,
    InterstitialSettings, NextControl, OutputSettings, PaginationSettings, ReadinessSettings,
    RetrySettings, StabilizeSettings,
};
pub use controller::PaginationController;
pub use extract::ProbeExtractor;
pub use filename::{category_slug, output_filename};
pub use interstitial::{dismiss_interstitials, DismissReport};
pub use navigator::{NavigationOutcome, RetryingNavigator};
pub use page_source::{PageSource, PageSourceFactory};
pub use persist::{ensure_output_dir, write_atomically, PersistError};
pub use progress::{ChannelProgressSink, HarvestEvent, NoopProgressSink, ProgressSink};
pub use scroller::{stabilize, StabilizeOutcome};
pub use session::{CategoryOutcome, CategoryReport, HarvestReport, HarvestSession};
pub use sink::{CsvResultSink, ResultSink, SinkError, SinkReceipt};
pub use static_source::{FetchSettings, StaticPageSource, StaticSourceFactory};
pub use types::{ProbeMiss, SourceError, SourceErrorKind};

#[cfg(feature = "chromium")]
pub use chromium_source::{ChromiumPageSource, ChromiumSourceFactory};
