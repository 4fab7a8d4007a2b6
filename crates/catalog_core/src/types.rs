use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Column added to every persisted row, holding the category's base URL.
pub const CATEGORY_URL_COLUMN: &str = "category_url";

const OFFSET_PARAM: &str = "offset";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySource {
    pub id: String,
    pub base_url: Url,
}

impl CategorySource {
    pub fn new(id: impl Into<String>, base_url: Url) -> Self {
        Self {
            id: id.into(),
            base_url,
        }
    }

    /// Builds a source whose id is derived from the URL path
    /// (`/a/b/c` becomes `a_b_c`), falling back to the host.
    pub fn from_url(base_url: Url) -> Self {
        let id = base_url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("_")
            })
            .filter(|id| !id.is_empty())
            .or_else(|| base_url.host_str().map(ToOwned::to_owned))
            .unwrap_or_else(|| "category".to_string());
        Self { id, base_url }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub category_id: String,
    pub offset: u64,
    pub page_index: u32,
}

impl PageCursor {
    pub fn new(category_id: impl Into<String>, start_offset: u64) -> Self {
        Self {
            category_id: category_id.into(),
            offset: start_offset,
            page_index: 0,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.page_index == 0
    }

    pub(crate) fn advance(&mut self, page_size: u64) {
        self.offset += page_size;
        self.page_index += 1;
    }

    /// `base` with `offset=<offset>` as its last query pair. An existing
    /// `offset` pair is replaced; other pairs are kept in order.
    pub fn page_url(&self, base: &Url) -> Url {
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| key != OFFSET_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = base.clone();
        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(OFFSET_PARAM, &self.offset.to_string());
        }
        url
    }
}

/// Opaque reference to one rendered card, valid for a single page iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardHandle {
    scope: String,
    index: usize,
}

impl CardHandle {
    pub fn new(scope: impl Into<String>, index: usize) -> Self {
        Self {
            scope: scope.into(),
            index,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    category_id: String,
    fields: Vec<(String, String)>,
}

impl ExtractedRecord {
    pub fn new(category_id: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            category_id: category_id.into(),
            fields,
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// True when every field resolved to the empty string.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResult {
    pub category_id: String,
    pub base_url: Url,
    pub records: Vec<ExtractedRecord>,
    pub termination: TerminationReason,
    pub pages_visited: u32,
}

impl CategoryResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationSignal {
    HasNext,
    NoNext,
    NextDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRecordPolicy {
    #[default]
    Keep,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every navigation attempt for a page failed.
    NavigationFailed,
    /// No card appeared before the readiness timeout.
    EndOfListing,
    NoNextControl,
    LastPage,
    PageLimit,
    RenderFailed { message: String },
    Cancelled,
    DeadlineExceeded,
}

impl TerminationReason {
    /// Separates "the site broke" from "the listing ran out".
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            TerminationReason::NavigationFailed
                | TerminationReason::RenderFailed { .. }
                | TerminationReason::DeadlineExceeded
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::NavigationFailed => write!(f, "navigation failed"),
            TerminationReason::EndOfListing => write!(f, "no cards rendered (end of listing)"),
            TerminationReason::NoNextControl => write!(f, "no next-page control"),
            TerminationReason::LastPage => write!(f, "next-page control disabled"),
            TerminationReason::PageLimit => write!(f, "page limit reached"),
            TerminationReason::RenderFailed { message } => write!(f, "render failed: {message}"),
            TerminationReason::Cancelled => write!(f, "cancelled"),
            TerminationReason::DeadlineExceeded => write!(f, "category deadline exceeded"),
        }
    }
}
