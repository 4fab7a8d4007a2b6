use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_core::{CategorySource, EmptyRecordPolicy, PaginationLimits, CATEGORY_URL_COLUMN};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::filename::category_slug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid category url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete description of one harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub categories: Vec<CategoryEntry>,
    pub schema: CatalogSchema,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub readiness: ReadinessSettings,
    #[serde(default)]
    pub stabilize: StabilizeSettings,
    #[serde(default)]
    pub interstitials: InterstitialSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub output: OutputSettings,
    /// Categories harvested in parallel, each with its own page source.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

/// Where things live on the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSchema {
    pub card_selector: String,
    pub fields: Vec<FieldProbe>,
    /// Cards nested (at any depth) inside an element matching this selector are skipped.
    #[serde(default)]
    pub excluded_section: Option<String>,
    pub next_control: NextControl,
    #[serde(default)]
    pub consent_control: Option<String>,
    /// Generic close controls, in priority order.
    #[serde(default)]
    pub close_controls: Vec<String>,
}

impl CatalogSchema {
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProbe {
    pub name: String,
    pub selector: String,
    /// Reads every match and joins them with this separator.
    #[serde(default)]
    pub join: Option<String>,
}

impl FieldProbe {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            join: None,
        }
    }

    pub fn joined(mut self, separator: impl Into<String>) -> Self {
        self.join = Some(separator.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextControl {
    pub selector: String,
    /// Class marking the control as disabled on the last page.
    pub disabled_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub page_size: u64,
    pub max_pages: u32,
    pub start_offset: u64,
    pub page_retries: u32,
    pub between_pages_ms: u64,
    pub category_deadline_secs: Option<u64>,
    pub empty_records: EmptyRecordPolicy,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        let limits = PaginationLimits::default();
        Self {
            page_size: limits.page_size,
            max_pages: limits.max_pages,
            start_offset: limits.start_offset,
            page_retries: limits.page_retries,
            between_pages_ms: 1_000,
            category_deadline_secs: None,
            empty_records: limits.empty_records,
        }
    }
}

impl PaginationSettings {
    pub fn limits(&self) -> PaginationLimits {
        PaginationLimits {
            page_size: self.page_size,
            max_pages: self.max_pages,
            start_offset: self.start_offset,
            page_retries: self.page_retries,
            empty_records: self.empty_records,
        }
    }

    pub fn category_deadline(&self) -> Option<Duration> {
        self.category_deadline_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    pub after_navigation_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            min_wait_ms: 1_000,
            max_wait_ms: 2_500,
            after_navigation_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            poll_interval_ms: 250,
        }
    }
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizeSettings {
    pub scroll_px: u32,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
    pub max_rounds: u32,
}

impl Default for StabilizeSettings {
    fn default() -> Self {
        Self {
            scroll_px: 2_000,
            pause_min_ms: 400,
            pause_max_ms: 400,
            max_rounds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterstitialSettings {
    pub settle_ms: u64,
    pub after_click_ms: u64,
}

impl Default for InterstitialSettings {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            after_click_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub user_agent: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/126.0 Safari/537.36"
                .to_string(),
            headless: true,
            window_width: 1366,
            window_height: 900,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Appends the capture date (`_YYYY-MM-DD`) to every file name.
    pub date_stamp: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            file_prefix: String::new(),
            date_stamp: false,
        }
    }
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: HarvestConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let schema = &self.schema;
        if schema.card_selector.trim().is_empty() {
            return Err(ConfigError::Invalid("card_selector is empty".into()));
        }
        if schema.fields.is_empty() {
            return Err(ConfigError::Invalid("no fields configured".into()));
        }
        let mut seen = HashSet::new();
        for field in &schema.fields {
            if field.name.is_empty() || field.selector.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "field {:?} needs a name and a selector",
                    field.name
                )));
            }
            if field.name == CATEGORY_URL_COLUMN {
                return Err(ConfigError::Invalid(format!(
                    "field name {CATEGORY_URL_COLUMN:?} is reserved"
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate field name {:?}",
                    field.name
                )));
            }
        }
        if schema.next_control.selector.trim().is_empty() {
            return Err(ConfigError::Invalid("next_control.selector is empty".into()));
        }
        if self.pagination.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be positive".into()));
        }
        if self.pagination.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be positive".into()));
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid("retry.attempts must be positive".into()));
        }
        if self.retry.min_wait_ms > self.retry.max_wait_ms {
            return Err(ConfigError::Invalid(
                "retry.min_wait_ms exceeds retry.max_wait_ms".into(),
            ));
        }
        if self.stabilize.pause_min_ms > self.stabilize.pause_max_ms {
            return Err(ConfigError::Invalid(
                "stabilize.pause_min_ms exceeds stabilize.pause_max_ms".into(),
            ));
        }
        if self.stabilize.max_rounds == 0 {
            return Err(ConfigError::Invalid("stabilize.max_rounds must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be positive".into()));
        }
        self.category_sources().map(|_| ())
    }

    /// Resolves the configured categories; ids default to the URL path.
    ///
    /// Ids must stay distinct after slugging, since the slug names the output file.
    pub fn category_sources(&self) -> Result<Vec<CategorySource>, ConfigError> {
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        let mut sources = Vec::with_capacity(self.categories.len());
        for entry in &self.categories {
            let url = Url::parse(&entry.url).map_err(|source| ConfigError::InvalidUrl {
                url: entry.url.clone(),
                source,
            })?;
            let source = match &entry.id {
                Some(id) => CategorySource::new(id.clone(), url),
                None => CategorySource::from_url(url),
            };
            if !ids.insert(source.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate category id {:?}",
                    source.id
                )));
            }
            if !slugs.insert(category_slug(&source.id)) {
                return Err(ConfigError::Invalid(format!(
                    "category id {:?} names the same output file as an earlier category",
                    source.id
                )));
            }
            sources.push(source);
        }
        Ok(sources)
    }
}
