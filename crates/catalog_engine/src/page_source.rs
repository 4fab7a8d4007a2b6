use catalog_core::{CardHandle, PaginationSignal};

use crate::config::NextControl;
use crate::{ProbeMiss, SourceError};

/// A rendering session that can be navigated and queried with CSS selectors.
///
/// One instance is used strictly one operation at a time; callers never
/// overlap navigation, scrolling and extraction on the same source.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SourceError>;

    /// False when the document cannot change after navigation; readiness
    /// polling then settles on the first count.
    fn is_dynamic(&self) -> bool {
        true
    }

    async fn card_count(&self, scope: &str) -> Result<usize, SourceError>;

    async fn find_all(&self, scope: &str) -> Result<Vec<CardHandle>, SourceError>;

    /// Trimmed text of the first match of `selector` inside `card`.
    async fn read_text(&self, card: &CardHandle, selector: &str) -> Result<String, ProbeMiss>;

    /// Trimmed texts of every match of `selector` inside `card`, empty ones dropped.
    async fn read_all_text(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<Vec<String>, ProbeMiss>;

    /// True when an ancestor of `card` matches `selector`.
    async fn in_excluded_section(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<bool, ProbeMiss>;

    async fn trigger_scroll(&self, amount_px: u32) -> Result<(), SourceError>;

    /// Clicks the first element matching `selector`; false when none exists.
    async fn click(&self, selector: &str) -> Result<bool, SourceError>;

    async fn pagination_signal(&self, next: &NextControl) -> Result<PaginationSignal, SourceError>;
}

/// Builds an isolated page source per category for concurrent runs.
#[async_trait::async_trait]
pub trait PageSourceFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn PageSource>, SourceError>;
}
