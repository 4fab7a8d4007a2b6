//! `catalog-harvest` command-line front end.
mod cli;
mod run;
mod summary;

pub use cli::{Cli, SourceKind};
pub use run::run;
pub use summary::{CategorySummary, RunSummary, SUMMARY_FILE};
