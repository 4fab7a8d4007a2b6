#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, Once};

use catalog_core::{CardHandle, CategoryResult, CategorySource, PaginationSignal};
use catalog_engine::{
    BrowserSettings, CatalogSchema, CategoryEntry, FieldProbe, HarvestConfig, HarvestEvent,
    InterstitialSettings, NextControl, OutputSettings, PageSource, PaginationSettings, ProbeMiss,
    ProgressSink, ReadinessSettings, ResultSink, RetrySettings, SinkError, SinkReceipt,
    SourceError, SourceErrorKind, StabilizeSettings,
};
use url::Url;

pub const CARD: &str = "div.card";
pub const TITLE: &str = ".title";
pub const PRICE: &str = ".price";
pub const UNIT: &str = ".unit";
pub const BADGE: &str = ".badge";
pub const RELATED: &str = ".related";
pub const CONSENT: &str = "#consent-accept";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn schema() -> CatalogSchema {
    CatalogSchema {
        card_selector: CARD.to_string(),
        fields: vec![
            FieldProbe::new("name", TITLE),
            FieldProbe::new("price", PRICE),
            FieldProbe::new("price_unit", UNIT),
            FieldProbe::new("offer", BADGE).joined(", "),
        ],
        excluded_section: Some(RELATED.to_string()),
        next_control: NextControl {
            selector: "span.next".to_string(),
            disabled_class: "next--disabled".to_string(),
        },
        consent_control: Some(CONSENT.to_string()),
        close_controls: vec![".modal-close".to_string(), ".icon-close".to_string()],
    }
}

pub fn config(categories: &[(&str, &str)]) -> HarvestConfig {
    HarvestConfig {
        categories: categories
            .iter()
            .map(|(id, url)| CategoryEntry {
                id: Some(id.to_string()),
                url: url.to_string(),
            })
            .collect(),
        schema: schema(),
        pagination: PaginationSettings::default(),
        retry: RetrySettings::default(),
        readiness: ReadinessSettings::default(),
        stabilize: StabilizeSettings::default(),
        interstitials: InterstitialSettings::default(),
        browser: BrowserSettings::default(),
        output: OutputSettings::default(),
        concurrency: 1,
    }
}

pub fn category(id: &str, url: &str) -> CategorySource {
    CategorySource::new(id, Url::parse(url).unwrap())
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedCard {
    pub texts: HashMap<String, Vec<String>>,
    pub excluded: bool,
}

impl ScriptedCard {
    pub fn named(name: &str) -> Self {
        Self::default().with(TITLE, name)
    }

    pub fn product(name: &str, price: &str) -> Self {
        Self::named(name).with(PRICE, price).with(UNIT, "1 kg")
    }

    pub fn with(mut self, selector: &str, text: &str) -> Self {
        self.texts
            .entry(selector.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub cards: Vec<ScriptedCard>,
    /// Card counts reported by successive polls; the last value repeats.
    pub counts: Option<Vec<usize>>,
    pub signal: PaginationSignal,
}

impl ScriptedPage {
    pub fn new(cards: Vec<ScriptedCard>, signal: PaginationSignal) -> Self {
        Self {
            cards,
            counts: None,
            signal,
        }
    }

    pub fn with_products(count: usize, signal: PaginationSignal) -> Self {
        let cards = (0..count)
            .map(|i| ScriptedCard::product(&format!("product {i}"), &format!("{i},99 €")))
            .collect();
        Self::new(cards, signal)
    }

    pub fn with_counts(mut self, counts: Vec<usize>) -> Self {
        self.counts = Some(counts);
        self
    }
}

#[derive(Default)]
struct Inner {
    current: Option<String>,
    polls: usize,
    navigations: Vec<String>,
    failures: HashMap<String, usize>,
    scrolls: usize,
    count_calls: usize,
    clicks: Vec<String>,
}

/// In-memory page source driven by a script of pages keyed by URL.
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<String, ScriptedPage>,
    clickable: HashSet<String>,
    panic_on: HashSet<String>,
    inner: Mutex<Inner>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// The next `times` navigations to `url` fail.
    pub fn failing(self, url: &str, times: usize) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(url.to_string(), times);
        self
    }

    pub fn clickable(mut self, selector: &str) -> Self {
        self.clickable.insert(selector.to_string());
        self
    }

    pub fn panicking(mut self, url: &str) -> Self {
        self.panic_on.insert(url.to_string());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigations.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.inner.lock().unwrap().scrolls
    }

    pub fn count_calls(&self) -> usize {
        self.inner.lock().unwrap().count_calls
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner.lock().unwrap().clicks.clone()
    }

    fn current_page(&self) -> Option<ScriptedPage> {
        let inner = self.inner.lock().unwrap();
        inner
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
    }

    fn card(&self, card: &CardHandle) -> Result<ScriptedCard, ProbeMiss> {
        self.current_page()
            .and_then(|page| page.cards.get(card.index()).cloned())
            .ok_or(ProbeMiss::Detached)
    }
}

#[async_trait::async_trait]
impl PageSource for ScriptedSource {
    async fn navigate(&self, url: &str) -> Result<(), SourceError> {
        if self.panic_on.contains(url) {
            panic!("renderer crashed on {url}");
        }
        let mut inner = self.inner.lock().unwrap();
        inner.navigations.push(url.to_string());
        inner.current = None;
        inner.polls = 0;
        if let Some(remaining) = inner.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::new(SourceErrorKind::Network, "connection reset"));
            }
        }
        inner.current = Some(url.to_string());
        Ok(())
    }

    async fn card_count(&self, _scope: &str) -> Result<usize, SourceError> {
        let page = self.current_page();
        let mut inner = self.inner.lock().unwrap();
        inner.count_calls += 1;
        let Some(page) = page else {
            return Ok(0);
        };
        Ok(match &page.counts {
            Some(counts) => {
                let count = counts[inner.polls.min(counts.len() - 1)];
                inner.polls += 1;
                count
            }
            None => page.cards.len(),
        })
    }

    async fn find_all(&self, scope: &str) -> Result<Vec<CardHandle>, SourceError> {
        let count = self.current_page().map(|p| p.cards.len()).unwrap_or(0);
        Ok((0..count).map(|i| CardHandle::new(scope, i)).collect())
    }

    async fn read_text(&self, card: &CardHandle, selector: &str) -> Result<String, ProbeMiss> {
        self.card(card)?
            .texts
            .get(selector)
            .and_then(|values| values.first().cloned())
            .ok_or(ProbeMiss::NotFound)
    }

    async fn read_all_text(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<Vec<String>, ProbeMiss> {
        Ok(self
            .card(card)?
            .texts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn in_excluded_section(
        &self,
        card: &CardHandle,
        _selector: &str,
    ) -> Result<bool, ProbeMiss> {
        Ok(self.card(card)?.excluded)
    }

    async fn trigger_scroll(&self, _amount_px: u32) -> Result<(), SourceError> {
        self.inner.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool, SourceError> {
        if self.clickable.contains(selector) {
            self.inner.lock().unwrap().clicks.push(selector.to_string());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn pagination_signal(&self, _next: &NextControl) -> Result<PaginationSignal, SourceError> {
        Ok(self
            .current_page()
            .map(|page| page.signal)
            .unwrap_or(PaginationSignal::NoNext))
    }
}

/// Sink keeping results in memory; ids listed in `failing` are rejected.
#[derive(Default)]
pub struct MemorySink {
    pub written: Mutex<Vec<CategoryResult>>,
    pub failing: HashSet<String>,
}

impl MemorySink {
    pub fn failing_for(id: &str) -> Self {
        Self {
            written: Mutex::new(Vec::new()),
            failing: HashSet::from([id.to_string()]),
        }
    }

    pub fn written_ids(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.category_id.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl ResultSink for MemorySink {
    async fn write(&self, result: &CategoryResult) -> Result<SinkReceipt, SinkError> {
        if self.failing.contains(&result.category_id) {
            return Err(SinkError::Io(std::io::Error::other("disk full")));
        }
        self.written.lock().unwrap().push(result.clone());
        Ok(SinkReceipt {
            location: PathBuf::from("memory")
                .join(&result.category_id)
                .display()
                .to_string(),
            rows: result.records.len(),
        })
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<HarvestEvent>>,
}

impl RecordingProgress {
    pub fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}
