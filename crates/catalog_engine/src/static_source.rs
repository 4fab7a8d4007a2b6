use std::sync::Mutex;
use std::time::Duration;

use catalog_core::{CardHandle, PaginationSignal};
use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};

use crate::config::{BrowserSettings, NextControl};
use crate::page_source::PageSourceFactory;
use crate::{PageSource, ProbeMiss, SourceError, SourceErrorKind};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

/// Page source for server-rendered catalogs: one HTTP GET per navigation,
/// selectors evaluated on the fetched HTML.
///
/// The document is parsed once per navigation. Nothing is lazy-loaded, so
/// scrolling is a no-op and the card count is final after the first poll.
/// Controls cannot be clicked; `click` reports that no control was found.
pub struct StaticPageSource {
    client: reqwest::Client,
    settings: FetchSettings,
    document: Mutex<Option<Html>>,
}

impl StaticPageSource {
    pub fn new(browser: &BrowserSettings, settings: FetchSettings) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(browser.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SourceError::new(SourceErrorKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            settings,
            document: Mutex::new(None),
        })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    fn store(&self, document: Option<Html>) {
        let mut guard = self.document.lock().unwrap_or_else(|p| p.into_inner());
        *guard = document;
    }

    fn with_document<T>(&self, f: impl FnOnce(&Html) -> T) -> Result<T, SourceError> {
        let guard = self.document.lock().unwrap_or_else(|p| p.into_inner());
        let document = guard
            .as_ref()
            .ok_or_else(|| SourceError::new(SourceErrorKind::NoDocument, "navigate first"))?;
        Ok(f(document))
    }

    fn with_card<T>(
        &self,
        card: &CardHandle,
        f: impl FnOnce(ElementRef<'_>) -> Result<T, ProbeMiss>,
    ) -> Result<T, ProbeMiss> {
        let scope = parse_selector(card.scope())?;
        self.with_document(|doc| match doc.select(&scope).nth(card.index()) {
            Some(element) => f(element),
            None => Err(ProbeMiss::Detached),
        })?
    }

    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| SourceError::new(SourceErrorKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::new(
                SourceErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(SourceError::new(
                    SourceErrorKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(SourceError::new(
                    SourceErrorKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(SourceError::new(
                    SourceErrorKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait::async_trait]
impl PageSource for StaticPageSource {
    async fn navigate(&self, url: &str) -> Result<(), SourceError> {
        self.store(None);
        let html = self.fetch(url).await?;
        engine_debug!("fetched {} ({} bytes)", url, html.len());
        self.store(Some(Html::parse_document(&html)));
        Ok(())
    }

    fn is_dynamic(&self) -> bool {
        false
    }

    async fn card_count(&self, scope: &str) -> Result<usize, SourceError> {
        let selector = parse_selector(scope).map_err(invalid_selector)?;
        self.with_document(|doc| doc.select(&selector).count())
    }

    async fn find_all(&self, scope: &str) -> Result<Vec<CardHandle>, SourceError> {
        let count = self.card_count(scope).await?;
        Ok((0..count).map(|index| CardHandle::new(scope, index)).collect())
    }

    async fn read_text(&self, card: &CardHandle, selector: &str) -> Result<String, ProbeMiss> {
        let target = parse_selector(selector)?;
        self.with_card(card, |element| {
            element
                .select(&target)
                .next()
                .map(element_text)
                .ok_or(ProbeMiss::NotFound)
        })
    }

    async fn read_all_text(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<Vec<String>, ProbeMiss> {
        let target = parse_selector(selector)?;
        self.with_card(card, |element| {
            Ok(element
                .select(&target)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect())
        })
    }

    async fn in_excluded_section(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<bool, ProbeMiss> {
        let section = parse_selector(selector)?;
        self.with_card(card, |element| {
            Ok(element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| section.matches(&ancestor)))
        })
    }

    async fn trigger_scroll(&self, _amount_px: u32) -> Result<(), SourceError> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<bool, SourceError> {
        Ok(false)
    }

    async fn pagination_signal(&self, next: &NextControl) -> Result<PaginationSignal, SourceError> {
        let selector = parse_selector(&next.selector).map_err(invalid_selector)?;
        self.with_document(|doc| match doc.select(&selector).next() {
            None => PaginationSignal::NoNext,
            Some(control) => {
                let element = control.value();
                let disabled = element.classes().any(|class| class == next.disabled_class)
                    || element.attr("disabled").is_some()
                    || element.attr("aria-disabled") == Some("true");
                if disabled {
                    PaginationSignal::NextDisabled
                } else {
                    PaginationSignal::HasNext
                }
            }
        })
    }
}

/// Hands out an independent HTTP-backed source per category.
#[derive(Debug, Clone)]
pub struct StaticSourceFactory {
    browser: BrowserSettings,
    settings: FetchSettings,
}

impl StaticSourceFactory {
    pub fn new(browser: BrowserSettings, settings: FetchSettings) -> Self {
        Self { browser, settings }
    }
}

#[async_trait::async_trait]
impl PageSourceFactory for StaticSourceFactory {
    async fn create(&self) -> Result<Box<dyn PageSource>, SourceError> {
        Ok(Box::new(StaticPageSource::new(
            &self.browser,
            self.settings.clone(),
        )?))
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ProbeMiss> {
    Selector::parse(selector).map_err(|err| ProbeMiss::Unavailable(format!("{selector}: {err}")))
}

fn invalid_selector(miss: ProbeMiss) -> SourceError {
    SourceError::new(SourceErrorKind::InvalidSelector, miss.to_string())
}

/// Text content with whitespace runs collapsed, as a browser's `innerText` would show it.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn map_reqwest_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        return SourceError::new(SourceErrorKind::Timeout, err.to_string());
    }
    SourceError::new(SourceErrorKind::Network, err.to_string())
}
