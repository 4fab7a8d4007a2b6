use url::Url;

use crate::{
    CategoryResult, CategorySource, EmptyRecordPolicy, ExtractedRecord, PageCursor,
    TerminationReason,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Start,
    Dismiss,
    AwaitReady,
    Stabilize,
    Extract,
    DecideContinuation,
    Terminal(TerminationReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub page_size: u64,
    pub max_pages: u32,
    pub start_offset: u64,
    /// Whole-page retries after a render fault; 0 ends the category on the first fault.
    pub page_retries: u32,
    pub empty_records: EmptyRecordPolicy,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            page_size: 24,
            max_pages: 50,
            start_offset: 0,
            page_retries: 0,
            empty_records: EmptyRecordPolicy::Keep,
        }
    }
}

/// Pagination state of one category. Only [`crate::update`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    source: CategorySource,
    limits: PaginationLimits,
    cursor: PageCursor,
    phase: Phase,
    records: Vec<ExtractedRecord>,
    interstitials_done: bool,
    page_faults: u32,
    pages_visited: u32,
}

impl PaginationState {
    pub fn new(source: CategorySource, limits: PaginationLimits) -> Self {
        let cursor = PageCursor::new(source.id.clone(), limits.start_offset);
        Self {
            source,
            limits,
            cursor,
            phase: Phase::Start,
            records: Vec::new(),
            interstitials_done: false,
            page_faults: 0,
            pages_visited: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn source(&self) -> &CategorySource {
        &self.source
    }

    pub fn limits(&self) -> &PaginationLimits {
        &self.limits
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Terminal(_))
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        match &self.phase {
            Phase::Terminal(reason) => Some(reason),
            _ => None,
        }
    }

    /// Finalizes the category. A state abandoned before reaching `Terminal`
    /// is reported as cancelled.
    pub fn into_result(self) -> CategoryResult {
        let termination = match self.phase {
            Phase::Terminal(reason) => reason,
            _ => TerminationReason::Cancelled,
        };
        CategoryResult {
            category_id: self.source.id,
            base_url: self.source.base_url,
            records: self.records,
            termination,
            pages_visited: self.pages_visited,
        }
    }

    pub(crate) fn current_url(&self) -> Url {
        self.cursor.page_url(&self.source.base_url)
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn needs_interstitials(&self) -> bool {
        self.cursor.is_first_page() && !self.interstitials_done
    }

    pub(crate) fn mark_interstitials_done(&mut self) {
        self.interstitials_done = true;
    }

    pub(crate) fn accept_page(&mut self, records: Vec<ExtractedRecord>) -> usize {
        self.pages_visited += 1;
        self.page_faults = 0;
        let before = self.records.len();
        match self.limits.empty_records {
            EmptyRecordPolicy::Keep => self.records.extend(records),
            EmptyRecordPolicy::Drop => self
                .records
                .extend(records.into_iter().filter(|record| !record.is_blank())),
        }
        self.records.len() - before
    }

    /// Returns true while the page retry budget allows another attempt.
    pub(crate) fn register_fault(&mut self) -> bool {
        if self.page_faults < self.limits.page_retries {
            self.page_faults += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the next offset; false once the page limit is reached.
    pub(crate) fn advance(&mut self) -> bool {
        self.cursor.advance(self.limits.page_size);
        self.cursor.page_index < self.limits.max_pages
    }
}
